use anyhow::Context;
use async_trait::async_trait;
use notes_core::{Backend, CreateNoteRequest, Note};
use redis::{aio::ConnectionManager, AsyncCommands};

/// Stores each note as a JSON string under its id.
pub struct RedisBackend {
    connection: ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)
            .with_context(|| format!("invalid redis url {}", redis_url))?;

        let connection = client
            .get_tokio_connection_manager()
            .await
            .with_context(|| format!("failed to connect to redis at {}", redis_url))?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl Backend for RedisBackend {
    async fn keys(&self) -> anyhow::Result<Vec<String>> {
        let mut connection = self.connection.clone();

        let keys: Vec<String> = connection.keys("*").await.context("redis KEYS failed")?;

        Ok(keys)
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Note>> {
        let mut connection = self.connection.clone();

        let value: Option<String> = connection
            .get(id)
            .await
            .with_context(|| format!("redis GET {} failed", id))?;

        match value {
            Some(value) => Ok(Some(Note::from_slice(value.as_bytes())?)),
            None => Ok(None),
        }
    }

    async fn set(&self, id: &str, request: &CreateNoteRequest) -> anyhow::Result<()> {
        let mut connection = self.connection.clone();
        let value = Note::new(id, request).to_bytes()?;

        connection
            .set::<_, _, ()>(id, value)
            .await
            .with_context(|| format!("redis SET {} failed", id))?;

        Ok(())
    }
}
