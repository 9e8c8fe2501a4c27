use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use notes::{backends::MemoryBackend, http::http_router};
use notes_core::Note;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();

    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_e2e() {
    let app = http_router(Arc::new(MemoryBackend::default()));

    // create a note
    let (status, body) = send(
        &app,
        Method::POST,
        "/notes",
        Some(json!({ "title": "a", "content": "b" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let note_id: String = serde_json::from_slice(&body).unwrap();

    let (status, body) = send(&app, Method::GET, &format!("/notes/{}", note_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let note: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(note, json!({ "id": note_id, "title": "a", "content": "b" }));

    // replace it
    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/notes/{}", note_id),
        Some(json!({ "title": "c", "content": "d" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, &format!("/notes/{}", note_id), None).await;
    let note: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(note, json!({ "id": note_id, "title": "c", "content": "d" }));

    // unknown ids are not found
    let (status, _) = send(&app, Method::GET, "/notes/unknown-id", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // upsert a note at a caller chosen id
    let (status, _) = send(
        &app,
        Method::PUT,
        "/notes/chosen-id",
        Some(json!({ "title": "e", "content": "f" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // listing returns the latest version of every note
    let (status, body) = send(&app, Method::GET, "/notes", None).await;
    assert_eq!(status, StatusCode::OK);
    let mut notes: Vec<Note> = serde_json::from_slice(&body).unwrap();
    notes.sort_by(|a, b| a.id.cmp(&b.id));

    let mut expected = vec![
        Note {
            id: note_id.clone(),
            title: "c".to_owned(),
            content: "d".to_owned(),
        },
        Note {
            id: "chosen-id".to_owned(),
            title: "e".to_owned(),
            content: "f".to_owned(),
        },
    ];
    expected.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(notes, expected);

    // the root always points at the listing
    let (status, _) = send(&app, Method::GET, "/", None).await;
    assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
}
