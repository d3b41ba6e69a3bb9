//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpBody, HttpClient, HttpRequest, HttpResponse, Progress, ProgressCallback},
};
use bytes::Bytes;
use futures_util::TryStreamExt;
use reqwest::Client;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

const DEFAULT_USER_AGENT: &str = concat!("dbx-core-rust/", env!("CARGO_PKG_VERSION"));

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - TLS support by default (rustls)
/// - Streaming request and response bodies with progress reporting
///
/// The client-wide timeout is an idle timeout: it bounds the wait for each
/// read, so long transfers run as long as bytes keep arriving. A total
/// deadline applies only when the request sets `HttpRequest::timeout`.
///
/// Requests are never retried here; failures go straight back to the caller.
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP client with a custom idle timeout
    ///
    /// Falls back to reqwest's default client when the tuned builder cannot
    /// be constructed (e.g. the TLS backend fails to initialize).
    pub fn with_timeout(idle_timeout: Duration) -> Self {
        match Self::build_client(idle_timeout) {
            Ok(client) => Self { client },
            Err(e) => {
                warn!(error = %e, "Failed to build tuned HTTP client, using defaults");
                Self {
                    client: Client::new(),
                }
            }
        }
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build_client(idle_timeout: Duration) -> std::result::Result<Client, reqwest::Error> {
        Client::builder()
            .read_timeout(idle_timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
    }

    /// Wrap a byte source so every chunk handed to reqwest reports progress.
    fn streaming_body<R>(
        reader: R,
        total: Option<u64>,
        progress: Option<ProgressCallback>,
    ) -> reqwest::Body
    where
        R: AsyncRead + Send + Sync + Unpin + 'static,
    {
        let mut sent = 0u64;
        let stream = ReaderStream::new(reader).inspect_ok(move |chunk: &Bytes| {
            sent += chunk.len() as u64;
            if let Some(callback) = &progress {
                callback(Progress::new(sent, total));
            }
        });
        reqwest::Body::wrap_stream(stream)
    }

    /// Build reqwest request from bridge request
    async fn build_request(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder> {
        let mut req = self.client.post(&request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        // Requests with a body report bytes sent; the rest report bytes received
        let progress = request.progress.filter(|_| !request.body.is_empty());
        req = match request.body {
            HttpBody::Empty => req,
            HttpBody::Bytes(bytes) => {
                if progress.is_some() {
                    let total = Some(bytes.len() as u64);
                    req.header(reqwest::header::CONTENT_LENGTH, bytes.len())
                        .body(Self::streaming_body(Cursor::new(bytes), total, progress))
                } else {
                    req.body(bytes)
                }
            }
            HttpBody::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                let len = file.metadata().await?.len();
                req.header(reqwest::header::CONTENT_LENGTH, len)
                    .body(Self::streaming_body(file, Some(len), progress))
            }
            HttpBody::Stream(reader) => req.body(Self::streaming_body(reader, None, progress)),
        };

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        Ok(req)
    }

    /// Send a request, mapping transport failures to bridge errors.
    async fn send(&self, request: HttpRequest) -> Result<reqwest::Response> {
        let url = request.url.clone();
        let builder = self.build_request(request).await?;

        debug!(url = %url, "Executing HTTP request");

        builder.send().await.map_err(|e| {
            warn!(error = %e, url = %url, "HTTP request failed");
            if e.is_timeout() {
                BridgeError::OperationFailed("Request timed out".to_string())
            } else if e.is_connect() {
                BridgeError::OperationFailed(format!("Connection failed: {}", e))
            } else {
                BridgeError::OperationFailed(e.to_string())
            }
        })
    }

    fn map_body_error(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::OperationFailed("Response body stalled past the idle timeout".to_string())
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }

    fn download_progress(request: &HttpRequest) -> Option<ProgressCallback> {
        request
            .progress
            .clone()
            .filter(|_| request.body.is_empty())
    }

    fn collect_headers(response: &reqwest::Response) -> HashMap<String, String> {
        response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect()
    }
}

impl Default for ReqwestHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let progress = Self::download_progress(&request);
        let mut response = self.send(request).await?;

        let status = response.status().as_u16();
        let headers = Self::collect_headers(&response);
        let total = response.content_length();

        let mut body = Vec::with_capacity(total.unwrap_or(0) as usize);
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(Self::map_body_error)?
        {
            body.extend_from_slice(&chunk);
            if let Some(callback) = &progress {
                callback(Progress::new(body.len() as u64, total));
            }
        }

        debug!(status = status, bytes = body.len(), "HTTP response received");

        Ok(HttpResponse {
            status,
            headers,
            body: Bytes::from(body),
        })
    }

    async fn execute_to_file(&self, request: HttpRequest, path: &Path) -> Result<HttpResponse> {
        let progress = Self::download_progress(&request);
        let mut response = self.send(request).await?;

        let status = response.status().as_u16();
        let headers = Self::collect_headers(&response);
        let total = response.content_length();

        let mut file = tokio::fs::File::create(path).await?;
        let mut received = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(Self::map_body_error)?
        {
            file.write_all(&chunk).await?;
            received += chunk.len() as u64;
            if let Some(callback) = &progress {
                callback(Progress::new(received, total));
            }
        }
        file.flush().await?;

        debug!(status = status, bytes = received, "HTTP response streamed to file");

        Ok(HttpResponse {
            status,
            headers,
            body: Bytes::new(),
        })
    }
}
