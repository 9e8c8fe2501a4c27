use anyhow::Context;
use async_trait::async_trait;
use notes_core::{Backend, CreateNoteRequest, Note};
use reqwest::{RequestBuilder, StatusCode};
use serde::Deserialize;
use std::{
    fmt,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use url::Url;

use crate::config::{GcsConfig, DEFAULT_GCS_BASE_URL};

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

// Tokens are refreshed this long before the metadata server says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone, Eq, PartialEq)]
enum GcsAuth {
    /// No credentials, for storage emulators.
    Anonymous,
    Token(String),
    /// Access tokens come from the GCE metadata server and are cached until
    /// shortly before they expire.
    MetadataServer,
}

impl fmt::Debug for GcsAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Token(_) => f.write_str("Token(<redacted>)"),
            Self::MetadataServer => f.write_str("MetadataServer"),
        }
    }
}

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectResource>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ObjectResource {
    name: String,
}

/// Stores each note as a JSON object named by its id in a Cloud Storage
/// bucket, using the JSON API.
pub struct GcsBackend {
    client: reqwest::Client,
    base_url: Url,
    bucket: String,
    auth: GcsAuth,
    metadata_token_url: String,
    cached_token: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for GcsBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcsBackend")
            .field("base_url", &self.base_url.as_str())
            .field("bucket", &self.bucket)
            .field("auth", &self.auth)
            .finish()
    }
}

impl GcsBackend {
    pub fn new(config: &GcsConfig) -> anyhow::Result<Self> {
        let bucket = match &config.bucket {
            Some(bucket) if !bucket.is_empty() => bucket.clone(),
            _ => return Err(anyhow::anyhow!("GCS_BUCKET must be set when BACKEND=gcs")),
        };

        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("invalid GCS base url {}", config.base_url))?;

        if base_url.cannot_be_a_base() {
            return Err(anyhow::anyhow!("GCS base url {} cannot be a base", base_url));
        }

        let auth = match &config.access_token {
            Some(token) => GcsAuth::Token(token.clone()),
            None if config.base_url.trim_end_matches('/') == DEFAULT_GCS_BASE_URL => {
                GcsAuth::MetadataServer
            }
            None => GcsAuth::Anonymous,
        };

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            bucket,
            auth,
            metadata_token_url: METADATA_TOKEN_URL.to_owned(),
            cached_token: Mutex::new(None),
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();

        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }

        url
    }

    fn object_url(&self, id: &str) -> Url {
        let mut url = self.url(&["storage", "v1", "b", self.bucket.as_str(), "o", id]);
        url.query_pairs_mut().append_pair("alt", "media");

        url
    }

    fn upload_url(&self, id: &str) -> Url {
        let mut url = self.url(&["upload", "storage", "v1", "b", self.bucket.as_str(), "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", id);

        url
    }

    fn list_url(&self, page_token: Option<&str>) -> Url {
        let mut url = self.url(&["storage", "v1", "b", self.bucket.as_str(), "o"]);
        if let Some(page_token) = page_token {
            url.query_pairs_mut().append_pair("pageToken", page_token);
        }

        url
    }

    async fn authorize(&self, request: RequestBuilder) -> anyhow::Result<RequestBuilder> {
        match &self.auth {
            GcsAuth::Anonymous => Ok(request),
            GcsAuth::Token(token) => Ok(request.bearer_auth(token)),
            GcsAuth::MetadataServer => Ok(request.bearer_auth(self.metadata_token().await?)),
        }
    }

    async fn metadata_token(&self) -> anyhow::Result<String> {
        // held across the fetch so concurrent requests share one refresh
        let mut cached_token = self.cached_token.lock().await;

        if let Some(token) = cached_token.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        let token: MetadataToken = self
            .client
            .get(&self.metadata_token_url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .context("failed to reach metadata server for GCS access token")?
            .error_for_status()?
            .json()
            .await?;

        tracing::debug!("fetched GCS access token, expires in {}s", token.expires_in);

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        *cached_token = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl Backend for GcsBackend {
    async fn keys(&self) -> anyhow::Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let request = self.client.get(self.list_url(page_token.as_deref()));
            let page: ObjectList = self
                .authorize(request)
                .await?
                .send()
                .await
                .with_context(|| format!("listing bucket {} failed", self.bucket))?
                .error_for_status()?
                .json()
                .await?;

            keys.extend(page.items.into_iter().map(|object| object.name));

            match page.next_page_token {
                Some(next_page_token) => page_token = Some(next_page_token),
                None => break,
            }
        }

        Ok(keys)
    }

    async fn get(&self, id: &str) -> anyhow::Result<Option<Note>> {
        let request = self.client.get(self.object_url(id));
        let response = self
            .authorize(request)
            .await?
            .send()
            .await
            .with_context(|| format!("fetching object {} failed", id))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.error_for_status()?.bytes().await?;

        Ok(Some(Note::from_slice(&body)?))
    }

    async fn set(&self, id: &str, request: &CreateNoteRequest) -> anyhow::Result<()> {
        let body = Note::new(id, request).to_bytes()?;

        let request = self
            .client
            .post(self.upload_url(id))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        self.authorize(request)
            .await?
            .send()
            .await
            .with_context(|| format!("uploading object {} failed", id))?
            .error_for_status()?;

        Ok(())
    }
}
