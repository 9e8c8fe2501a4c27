use opentelemetry::{
    global,
    sdk::{export::trace::stdout, trace as sdktrace, Resource},
    trace::TracerProvider as _,
    KeyValue,
};
use opentelemetry_otlp::ExportConfig;
use opentelemetry_semantic_conventions::resource::SERVICE_NAME;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::TelemetryConfig;

pub const SERVICE: &str = "notes";

const GCP_PROJECT_ID: &str = "gcp.project_id";

#[derive(Clone, Debug, Eq, PartialEq)]
enum SpanSink {
    Console,
    Otlp { endpoint: String },
}

/// Installs the global subscriber: console logs plus an OpenTelemetry layer
/// exporting spans to stdout and, when configured, to an OTLP collector.
pub fn init_tracing(config: &TelemetryConfig) -> anyhow::Result<()> {
    let provider = build_tracer_provider(config)?;

    let tracer = provider.tracer(SERVICE);
    global::set_tracer_provider(provider);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    if let Some(cloud) = &config.cloud {
        tracing::info!(
            "exporting spans for project {} to {}",
            cloud.project_id,
            cloud.otlp_endpoint
        );
    }

    Ok(())
}

/// Flushes pending spans. Call once before the process exits.
pub fn shutdown_tracing() {
    global::shutdown_tracer_provider();
}

fn span_sinks(config: &TelemetryConfig) -> Vec<SpanSink> {
    let mut sinks = Vec::new();

    if config.console_tracing_enabled {
        sinks.push(SpanSink::Console);
    }

    if let Some(cloud) = &config.cloud {
        sinks.push(SpanSink::Otlp {
            endpoint: cloud.otlp_endpoint.clone(),
        });
    }

    sinks
}

fn build_tracer_provider(config: &TelemetryConfig) -> anyhow::Result<sdktrace::TracerProvider> {
    let mut provider_builder = sdktrace::TracerProvider::builder();

    for sink in span_sinks(config) {
        provider_builder = match sink {
            SpanSink::Console => provider_builder.with_batch_exporter(
                stdout::Exporter::new(std::io::stdout(), false),
                opentelemetry::runtime::Tokio,
            ),
            SpanSink::Otlp { endpoint } => {
                let export_config = ExportConfig {
                    endpoint,
                    ..ExportConfig::default()
                };
                let exporter = opentelemetry_otlp::SpanExporter::new_tonic(
                    export_config,
                    Default::default(),
                )?;

                provider_builder.with_batch_exporter(exporter, opentelemetry::runtime::Tokio)
            }
        };
    }

    Ok(provider_builder
        .with_config(sdktrace::config().with_resource(Resource::new(resource_attributes(config))))
        .build())
}

fn resource_attributes(config: &TelemetryConfig) -> Vec<KeyValue> {
    let mut attributes = vec![SERVICE_NAME.string(SERVICE)];

    if let Some(cloud) = &config.cloud {
        attributes.push(KeyValue::new(GCP_PROJECT_ID, cloud.project_id.clone()));
    }

    attributes
}


#[cfg(test)]
mod tests {
    use opentelemetry::Value;

    use super::*;
    use crate::config::CloudTracingConfig;

    fn cloud_config() -> CloudTracingConfig {
        CloudTracingConfig {
            project_id: "notes-prod".to_owned(),
            otlp_endpoint: "http://localhost:4317".to_owned(),
        }
    }

    fn attribute<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a Value> {
        attributes
            .iter()
            .find(|attribute| attribute.key.as_str() == key)
            .map(|attribute| &attribute.value)
    }

    #[test]
    fn test_resource_names_service() {
        let attributes = resource_attributes(&TelemetryConfig::default());

        assert_eq!(attributes.len(), 1);
        assert_eq!(
            attribute(&attributes, "service.name").map(|value| value.as_str().into_owned()),
            Some(SERVICE.to_owned())
        );
    }

    #[test]
    fn test_resource_carries_project_when_cloud_enabled() {
        let config = TelemetryConfig {
            console_tracing_enabled: false,
            cloud: Some(cloud_config()),
        };

        let attributes = resource_attributes(&config);

        assert_eq!(
            attribute(&attributes, GCP_PROJECT_ID).map(|value| value.as_str().into_owned()),
            Some("notes-prod".to_owned())
        );
    }

    #[test]
    fn test_span_sinks() {
        let console_only = TelemetryConfig::default();
        assert_eq!(span_sinks(&console_only), vec![SpanSink::Console]);

        let nothing = TelemetryConfig {
            console_tracing_enabled: false,
            cloud: None,
        };
        assert!(span_sinks(&nothing).is_empty());

        let cloud_only = TelemetryConfig {
            console_tracing_enabled: false,
            cloud: Some(cloud_config()),
        };
        assert_eq!(
            span_sinks(&cloud_only),
            vec![SpanSink::Otlp {
                endpoint: "http://localhost:4317".to_owned()
            }]
        );

        let both = TelemetryConfig {
            console_tracing_enabled: true,
            cloud: Some(cloud_config()),
        };
        assert_eq!(span_sinks(&both).len(), 2);
        assert_eq!(span_sinks(&both)[0], SpanSink::Console);
    }

    // the batch processors shut down on drop by blocking on their worker task,
    // which needs a second runtime thread
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_build_tracer_provider() {
        for config in [
            TelemetryConfig::default(),
            TelemetryConfig {
                console_tracing_enabled: false,
                cloud: None,
            },
            TelemetryConfig {
                console_tracing_enabled: true,
                cloud: Some(cloud_config()),
            },
        ] {
            let provider = build_tracer_provider(&config).unwrap();
            let _tracer = provider.tracer(SERVICE);
        }
    }
}
