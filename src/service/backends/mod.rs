use notes_core::Backend;
use std::{fmt, str::FromStr, sync::Arc};

use crate::config::Config;

mod gcs;
mod memory;
mod redis;

pub use self::redis::RedisBackend;
pub use gcs::GcsBackend;
pub use memory::MemoryBackend;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BackendKind {
    #[default]
    Memory,
    Redis,
    Gcs,
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            "gcs" => Ok(Self::Gcs),
            other => Err(anyhow::anyhow!("unknown backend '{}'", other)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::Redis => "redis",
            Self::Gcs => "gcs",
        };

        f.write_str(name)
    }
}

/// Builds the backend selected by `config`. Called once at startup; the
/// result is shared by every request.
pub async fn create_backend(config: &Config) -> anyhow::Result<Arc<dyn Backend>> {
    if let Some(warning) = &config.backend_warning {
        tracing::warn!("{}", warning);
    }

    let backend: Arc<dyn Backend> = match config.backend {
        BackendKind::Memory => Arc::new(MemoryBackend::default()),
        BackendKind::Redis => Arc::new(RedisBackend::connect(&config.redis_url).await?),
        BackendKind::Gcs => Arc::new(GcsBackend::new(&config.gcs)?),
    };

    tracing::info!("using {} backend", config.backend);

    Ok(backend)
}
