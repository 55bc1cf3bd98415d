//! API client for the EduQA Campus REST API.
//!
//! `ApiClient` executes every request: it attaches the session's bearer
//! token, picks the content type from the body kind, classifies failures
//! into `ApiError` and invalidates the session on 401.

use std::time::Duration;

use reqwest::multipart::{self, Part};
use reqwest::{Client, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{SessionPersistence, SessionStore};
use crate::models::Attachment;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5002/api";

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) reads.
pub const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Request body and, through it, the content type.
pub enum RequestBody {
    Empty,
    /// Sent with `Content-Type: application/json`.
    Json(Value),
    /// Sent without an explicit content type so the transport writes the
    /// multipart boundary itself.
    Multipart(multipart::Form),
}

impl RequestBody {
    fn kind(&self) -> &'static str {
        match self {
            RequestBody::Empty => "empty",
            RequestBody::Json(_) => "json",
            RequestBody::Multipart(_) => "multipart",
        }
    }
}

/// API client for EduQA Campus.
/// Clone is cheap - reqwest::Client and the session handles are Arc-backed.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: SessionStore,
    persistence: SessionPersistence,
    backoff_base: Duration,
}

impl ApiClient {
    /// Create a new API client bound to a session.
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: SessionStore,
        persistence: SessionPersistence,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Unknown(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            persistence,
            backoff_base: Duration::from_millis(INITIAL_BACKOFF_MS),
        })
    }

    /// Shorten the rate-limit backoff, for tests against a local server.
    pub fn with_backoff(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn persistence(&self) -> &SessionPersistence {
        &self.persistence
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send one request. Never retries.
    async fn send_once(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: RequestBody,
    ) -> Result<Response, ApiError> {
        let url = self.url(path);
        let token = self.session.token();
        debug!(%method, url = %url, body = body.kind(), authenticated = token.is_some(), "Sending request");

        let mut request = self.client.request(method, &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(ref token) = token {
            request = request.bearer_auth(token);
        }
        request = match body {
            RequestBody::Empty => request,
            RequestBody::Json(value) => request.json(&value),
            RequestBody::Multipart(form) => request.multipart(form),
        };

        let response = request.send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Request failed before a response");
            ApiError::from_transport(&e)
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, &text);

        if err.is_unauthorized() && token.is_some() {
            self.invalidate_session();
        }
        Err(err)
    }

    /// 401 on an authenticated request: the token is dead everywhere.
    fn invalidate_session(&self) {
        warn!("Unauthorized response; clearing session");
        self.persistence.clear_logged();
        self.session.clear_credentials();
    }

    async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        let text = response.text().await.map_err(|e| ApiError::from_transport(&e))?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(path, error = %e, body = %ApiError::truncate_body(&text), "Failed to parse response");
            ApiError::Unknown(format!("Invalid response from server: {}", e))
        })
    }

    /// GET with backoff on 429.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let mut retries = 0;
        let mut backoff = self.backoff_base;

        loop {
            match self.send_once(Method::GET, path, query, RequestBody::Empty).await {
                Ok(response) => return Self::decode(response, path).await,
                Err(ApiError::RateLimited(message)) => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited(message));
                    }
                    warn!(path, retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Mutations are sent exactly once; a failure is for the user to retry.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<T, ApiError> {
        let response = self.send_once(method, path, &[], body).await?;
        Self::decode(response, path).await
    }

    /// Mutation whose response body is irrelevant.
    pub(crate) async fn send_discard(
        &self,
        method: Method,
        path: &str,
        body: RequestBody,
    ) -> Result<(), ApiError> {
        self.send_once(method, path, &[], body).await.map(|_| ())
    }
}

/// Guess a MIME type from a file name for multipart parts.
pub(crate) fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "zip" => "application/zip",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// JSON body from any serializable payload.
pub(crate) fn json_body<T: serde::Serialize>(value: &T) -> Result<RequestBody, ApiError> {
    serde_json::to_value(value)
        .map(RequestBody::Json)
        .map_err(|e| ApiError::Unknown(format!("Failed to encode request: {}", e)))
}

/// A file as one multipart part.
pub(crate) fn file_part(file: Attachment) -> Result<Part, ApiError> {
    let mime = mime_for(&file.file_name);
    Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(mime)
        .map_err(|e| ApiError::Unknown(format!("Invalid attachment: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_for() {
        assert_eq!(mime_for("diagram.PNG"), "image/png");
        assert_eq!(mime_for("notes.pdf"), "application/pdf");
        assert_eq!(mime_for("photo.jpeg"), "image/jpeg");
        assert_eq!(mime_for("Makefile"), "application/octet-stream");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ApiClient::new(
            "http://localhost:5002/api/",
            Duration::from_secs(1),
            SessionStore::new(),
            SessionPersistence::in_memory(),
        )
        .unwrap();
        assert_eq!(client.url("/questions"), "http://localhost:5002/api/questions");
    }
}
