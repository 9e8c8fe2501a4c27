use async_trait::async_trait;

use crate::{CreateNoteRequest, Note};

/// Storage for notes, keyed by note id.
///
/// Implementations must keep `keys` and `get` consistent: every id returned
/// by `keys` is retrievable through `get`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// All stored note ids, in no particular order.
    async fn keys(&self) -> anyhow::Result<Vec<String>>;

    /// The note stored at `id`, or `None` if there is none.
    async fn get(&self, id: &str) -> anyhow::Result<Option<Note>>;

    /// Creates or replaces the note stored at `id`.
    async fn set(&self, id: &str, request: &CreateNoteRequest) -> anyhow::Result<()>;
}
