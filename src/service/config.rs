use anyhow::Context;
use std::net::SocketAddr;

use crate::backends::BackendKind;

pub const DEFAULT_ENDPOINT: &str = "0.0.0.0:8080";
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_GCS_BASE_URL: &str = "https://storage.googleapis.com";
pub const DEFAULT_OTLP_ENDPOINT: &str = "http://localhost:4317";

#[derive(Clone, Debug)]
pub struct Config {
    pub endpoint: SocketAddr,
    pub backend: BackendKind,
    /// Why `backend` fell back to memory, reported once logging is up.
    pub backend_warning: Option<String>,
    pub redis_url: String,
    pub gcs: GcsConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Clone, Debug)]
pub struct GcsConfig {
    pub bucket: Option<String>,
    pub base_url: String,
    pub access_token: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    pub console_tracing_enabled: bool,
    pub cloud: Option<CloudTracingConfig>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CloudTracingConfig {
    pub project_id: String,
    pub otlp_endpoint: String,
}

impl Config {
    /// Reads configuration from the process environment, after loading any
    /// `.env` file in the working directory.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());
        let endpoint: SocketAddr = endpoint
            .parse()
            .with_context(|| format!("ENDPOINT '{}' is not a valid socket address", endpoint))?;

        let backend = lookup("BACKEND").map(|value| value.parse::<BackendKind>());
        let (backend, backend_warning) = match backend {
            Some(Ok(backend)) => (backend, None),
            Some(Err(err)) => (
                BackendKind::Memory,
                Some(format!("{}, falling back to the memory backend", err)),
            ),
            None => (BackendKind::Memory, None),
        };

        let redis_url = lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_owned());

        let gcs = GcsConfig {
            bucket: lookup("GCS_BUCKET"),
            base_url: lookup("GCS_BASE_URL").unwrap_or_else(|| DEFAULT_GCS_BASE_URL.to_owned()),
            access_token: lookup("GCS_ACCESS_TOKEN"),
        };

        let telemetry = TelemetryConfig::from_lookup(&lookup)?;

        Ok(Self {
            endpoint,
            backend,
            backend_warning,
            redis_url,
            gcs,
            telemetry,
        })
    }
}

impl TelemetryConfig {
    fn from_lookup<F>(lookup: &F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let console_tracing_enabled = flag(lookup, "CONSOLE_TRACING_ENABLED")?.unwrap_or(true);

        let cloud = if flag(lookup, "CLOUD_TRACING_ENABLED")?.unwrap_or(false) {
            let project_id = lookup("GOOGLE_CLOUD_PROJECT")
                .filter(|project_id| !project_id.is_empty())
                .ok_or_else(|| {
                    anyhow::anyhow!("GOOGLE_CLOUD_PROJECT must be set when CLOUD_TRACING_ENABLED")
                })?;

            Some(CloudTracingConfig {
                project_id,
                otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_OTLP_ENDPOINT.to_owned()),
            })
        } else {
            None
        };

        Ok(Self {
            console_tracing_enabled,
            cloud,
        })
    }
}

fn flag<F>(lookup: &F, key: &str) -> anyhow::Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(key) {
        Some(value) => value,
        None => return Ok(None),
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" | "" => Ok(Some(false)),
        _ => Err(anyhow::anyhow!("{} must be a boolean, got '{}'", key, value)),
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: SocketAddr::from(([0, 0, 0, 0], 8080)),
            backend: BackendKind::default(),
            backend_warning: None,
            redis_url: DEFAULT_REDIS_URL.to_owned(),
            gcs: GcsConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            base_url: DEFAULT_GCS_BASE_URL.to_owned(),
            access_token: None,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            console_tracing_enabled: true,
            cloud: None,
        }
    }
}
