use async_trait::async_trait;
use notes_core::{Backend, CreateNoteRequest, Note};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

/// Process-local storage. Notes are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    notes: Arc<Mutex<HashMap<String, Note>>>,
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn keys(&self) -> anyhow::Result<Vec<String>> {
        let locked_notes = self.notes.lock().await;

        Ok(locked_notes.keys().cloned().collect())
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Note>> {
        let locked_notes = self.notes.lock().await;

        Ok(locked_notes.get(id).cloned())
    }

    async fn set(&self, id: &str, request: &CreateNoteRequest) -> anyhow::Result<()> {
        let mut locked_notes = self.notes.lock().await;

        locked_notes.insert(id.to_owned(), Note::new(id, request));

        Ok(())
    }
}
