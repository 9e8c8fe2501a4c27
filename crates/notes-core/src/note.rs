use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// Payload for both creating and replacing a note.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
}

impl Note {
    pub fn new(id: &str, request: &CreateNoteRequest) -> Self {
        Self {
            id: id.to_owned(),
            title: request.title.clone(),
            content: request.content.clone(),
        }
    }

    /// Encoding shared by the backends that store notes outside the process.
    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_slice(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl From<Note> for CreateNoteRequest {
    fn from(note: Note) -> Self {
        Self {
            title: note.title,
            content: note.content,
        }
    }
}
