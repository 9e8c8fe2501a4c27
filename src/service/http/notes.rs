use axum::{
    extract::Path,
    http::StatusCode,
    response::Redirect,
    Extension, Json,
};
use notes_core::{Backend, CreateNoteRequest, Note};
use std::sync::Arc;
use tracing::Span;
use uuid::Uuid;

use super::ApiError;

#[tracing::instrument(name = "notes::redirect_to_notes")]
pub async fn redirect_to_notes() -> Redirect {
    Redirect::temporary("/notes")
}

#[tracing::instrument(
    name = "notes::list_notes",
    skip_all,
    fields(note.count = tracing::field::Empty)
)]
pub async fn list_notes(
    Extension(backend): Extension<Arc<dyn Backend>>,
) -> Result<Json<Vec<Note>>, ApiError> {
    let keys = backend.keys().await?;

    let mut notes = Vec::with_capacity(keys.len());
    for key in keys {
        match backend.get(&key).await? {
            Some(note) => notes.push(note),
            None => {
                return Err(ApiError::Backend(anyhow::anyhow!(
                    "note {} is listed but cannot be fetched",
                    key
                )))
            }
        }
    }

    Span::current().record("note.count", notes.len() as u64);

    Ok(Json(notes))
}

#[tracing::instrument(
    name = "notes::get_note",
    skip_all,
    fields(note.id = %note_id, note.title = tracing::field::Empty)
)]
pub async fn get_note(
    Path(note_id): Path<String>,
    Extension(backend): Extension<Arc<dyn Backend>>,
) -> Result<Json<Note>, ApiError> {
    let note = match backend.get(&note_id).await? {
        Some(note) => note,
        None => return Err(ApiError::NotFound(note_id)),
    };

    Span::current().record("note.title", note.title.as_str());

    Ok(Json(note))
}

#[tracing::instrument(
    name = "notes::update_note",
    skip_all,
    fields(note.id = %note_id, note.title = %request.title)
)]
pub async fn update_note(
    Path(note_id): Path<String>,
    Extension(backend): Extension<Arc<dyn Backend>>,
    Json(request): Json<CreateNoteRequest>,
) -> Result<StatusCode, ApiError> {
    backend.set(&note_id, &request).await?;

    Ok(StatusCode::OK)
}

#[tracing::instrument(
    name = "notes::create_note",
    skip_all,
    fields(note.id = tracing::field::Empty, note.title = %request.title)
)]
pub async fn create_note(
    Extension(backend): Extension<Arc<dyn Backend>>,
    Json(request): Json<CreateNoteRequest>,
) -> Result<Json<String>, ApiError> {
    let note_id = Uuid::new_v4().to_string();
    Span::current().record("note.id", note_id.as_str());

    backend.set(&note_id, &request).await?;

    Ok(Json(note_id))
}
