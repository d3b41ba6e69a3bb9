//! HTTP Client Abstraction
//!
//! The core never talks to the network directly. Hosts hand in an
//! [`HttpClient`] that owns connection pooling, TLS and redirects; the core
//! only builds [`HttpRequest`]s and interprets [`HttpResponse`]s.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;

use crate::error::Result;

/// Byte-count update for an in-flight transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Bytes sent (uploads) or received (downloads) so far
    pub bytes_transferred: u64,
    /// Total size when the transport knows it
    pub total_bytes_expected: Option<u64>,
}

impl Progress {
    pub fn new(bytes_transferred: u64, total_bytes_expected: Option<u64>) -> Self {
        Self {
            bytes_transferred,
            total_bytes_expected,
        }
    }
}

/// Callback receiving [`Progress`] updates. May be invoked from any thread.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

/// Request body shapes supported by the transport.
pub enum HttpBody {
    Empty,
    Bytes(Bytes),
    /// Contents of a local file, streamed by the client
    File(PathBuf),
    /// Arbitrary byte source, streamed by the client
    Stream(Box<dyn AsyncRead + Send + Sync + Unpin>),
}

impl HttpBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, HttpBody::Empty)
    }
}

impl fmt::Debug for HttpBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpBody::Empty => write!(f, "Empty"),
            HttpBody::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            HttpBody::File(path) => f.debug_tuple("File").field(path).finish(),
            HttpBody::Stream(_) => write!(f, "Stream(..)"),
        }
    }
}

/// HTTP request builder
///
/// Every endpoint of the API is a POST, so the method is implied.
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: HttpBody,
    pub timeout: Option<Duration>,
    pub progress: Option<ProgressCallback>,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            body: HttpBody::Empty,
            timeout: None,
            progress: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    pub fn body(mut self, body: HttpBody) -> Self {
        self.body = body;
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    pub fn on_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    /// Report progress to the registered callback, if any.
    pub fn report_progress(&self, progress: Progress) {
        if let Some(callback) = &self.progress {
            callback(progress);
        }
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Authorization carries the bearer token
        let headers: HashMap<&str, &str> = self
            .headers
            .iter()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case("authorization") {
                    (k.as_str(), "[REDACTED]")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect();

        f.debug_struct("HttpRequest")
            .field("url", &self.url)
            .field("headers", &headers)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Look up a header by name, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Async HTTP client trait
///
/// Implementations own connection pooling, TLS validation and redirect
/// handling. They must NOT retry on their own: every failure is surfaced to
/// the caller, which decides on retry and backoff policy.
///
/// Progress callbacks attached to a request with a body report bytes sent.
/// On a request without a body they report response bytes received.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpBody, HttpClient, HttpRequest};
///
/// async fn check_user(client: &dyn HttpClient) -> Result<u16> {
///     let request = HttpRequest::post("https://api.dropboxapi.com/2/check/user")
///         .bearer_token("token")
///         .header("Content-Type", "application/json")
///         .body(HttpBody::Bytes(r#"{"query":"ping"}"#.into()));
///
///     let response = client.execute(request).await?;
///     Ok(response.status)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute a request and buffer the whole response body in memory.
    ///
    /// # Errors
    ///
    /// Returns an error only when no HTTP response was obtained (connection,
    /// TLS, timeout). Non-2xx statuses are returned as `Ok`.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Execute a request and stream the response body into `path`.
    ///
    /// The returned response carries status and headers with an empty body.
    /// The file at `path` is created (or truncated) regardless of status so
    /// callers can inspect error payloads.
    async fn execute_to_file(&self, request: HttpRequest, path: &Path) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::post("https://example.com")
            .header("User-Agent", "test")
            .bearer_token("secret")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com");
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert_eq!(
            request.headers.get("Authorization"),
            Some(&"Bearer secret".to_string())
        );
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_http_request_debug_redacts_authorization() {
        let request = HttpRequest::post("https://example.com")
            .bearer_token("super-secret-token");

        let debug = format!("{:?}", request);
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_report_progress_invokes_callback() {
        let seen = Arc::new(AtomicU64::new(0));
        let sink = Arc::clone(&seen);
        let request = HttpRequest::post("https://example.com")
            .on_progress(Arc::new(move |p: Progress| {
                sink.store(p.bytes_transferred, Ordering::SeqCst);
            }));

        request.report_progress(Progress::new(42, Some(100)));
        assert_eq!(seen.load(Ordering::SeqCst), 42);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = HttpResponse::new(200).with_header("x-dropbox-request-id", "abc123");

        assert_eq!(response.header("X-Dropbox-Request-Id"), Some("abc123"));
        assert_eq!(response.header("Dropbox-Api-Result"), None);
    }
}
