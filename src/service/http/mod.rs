use axum::{
    body::{Body, BoxBody},
    extract::MatchedPath,
    http::{Request, Response},
    routing::get,
    Extension, Router,
};
use notes_core::Backend;
use std::{sync::Arc, time::Duration};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Span;

mod error;
pub mod notes;

pub use error::ApiError;

pub fn http_router(backend: Arc<dyn Backend>) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            // name by route template so every note id shares one span name
            let otel_name = match request.extensions().get::<MatchedPath>() {
                Some(matched_path) => {
                    format!("HTTP {} {}", request.method(), matched_path.as_str())
                }
                None => format!("HTTP {}", request.method()),
            };

            tracing::info_span!(
                "HTTP",
                http.method = %request.method(),
                http.url = %request.uri(),
                http.status_code = tracing::field::Empty,
                otel.name = %otel_name,
                otel.kind = "server",
            )
        })
        .on_response(
            |response: &Response<BoxBody>, latency: Duration, span: &Span| {
                span.record("http.status_code", response.status().as_u16());
                tracing::debug!("{} in {:?}", response.status(), latency);
            },
        );

    Router::new()
        .route("/", get(notes::redirect_to_notes))
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route("/notes/:note_id", get(notes::get_note).put(notes::update_note))
        .layer(
            ServiceBuilder::new()
                .layer(tracing_layer)
                .layer(Extension(backend)),
        )
}
