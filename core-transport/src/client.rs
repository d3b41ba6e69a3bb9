//! Transport client
//!
//! Builds HTTP requests from route descriptors, hands them to the host's
//! [`HttpClient`] on a spawned task, and turns responses into typed results
//! or [`ClassifiedError`]s.
//!
//! Every call is a `POST` to `<base url of route host>/<namespace>/<name>`
//! carrying:
//!
//! - `User-Agent` always
//! - `Authorization: Bearer <token>` when a credential is set and the route
//!   is not on the notify host
//! - `Dropbox-Api-Select-User` when a team member is selected
//!
//! Nothing is retried here; every failure goes back to the caller.
//!
//! # Example
//!
//! ```ignore
//! use core_transport::{Route, RouteHost, RouteStyle, TransportClient, Void};
//!
//! static LIST_FOLDER: Route<ListFolderArg, ListFolderResult, ListFolderError> =
//!     Route::new("files", "list_folder", RouteHost::Api, RouteStyle::Rpc);
//!
//! let client = TransportClient::from_config(&config, Some(credential));
//! let listing = client
//!     .rpc(&LIST_FOLDER, &ListFolderArg { path: String::new() })
//!     .result()
//!     .await;
//! ```

use crate::classify::classify_response_error;
use crate::error::{ClassifiedError, TransportCause};
use crate::escape::header_json;
use crate::request::{
    CallResult, DownloadToFileRequest, DownloadToMemoryRequest, RequestHandle, RpcRequest,
    UploadRequest,
};
use crate::route::{Route, RouteHost, RouteStyle};
use bridge_traits::http::{HttpBody, HttpClient, HttpRequest, HttpResponse};
use bytes::Bytes;
use core_auth::Credential;
use core_runtime::config::{BaseHosts, SdkConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{debug, error, instrument, warn};

pub const API_ARG_HEADER: &str = "Dropbox-Api-Arg";
pub const API_RESULT_HEADER: &str = "Dropbox-Api-Result";
pub const SELECT_USER_HEADER: &str = "Dropbox-Api-Select-User";

/// Body of an upload.
pub enum UploadSource {
    Bytes(Bytes),
    File(PathBuf),
    Stream(Box<dyn AsyncRead + Send + Sync + Unpin>),
}

impl From<UploadSource> for HttpBody {
    fn from(source: UploadSource) -> Self {
        match source {
            UploadSource::Bytes(bytes) => HttpBody::Bytes(bytes),
            UploadSource::File(path) => HttpBody::File(path),
            UploadSource::Stream(reader) => HttpBody::Stream(reader),
        }
    }
}

impl fmt::Debug for UploadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadSource::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            UploadSource::File(path) => f.debug_tuple("File").field(path).finish(),
            UploadSource::Stream(_) => write!(f, "Stream(..)"),
        }
    }
}

/// Client for authenticated (or app-level) API calls.
#[derive(Clone)]
pub struct TransportClient {
    credential: Option<Credential>,
    select_user: Option<String>,
    base_hosts: BaseHosts,
    user_agent: String,
    http_client: Arc<dyn HttpClient>,
}

impl TransportClient {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_hosts: BaseHosts,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            credential: None,
            select_user: None,
            base_hosts,
            user_agent: user_agent.into(),
            http_client,
        }
    }

    /// Client using the hosts, user agent, team member selection and HTTP
    /// client of `config`.
    pub fn from_config(config: &SdkConfig, credential: Option<Credential>) -> Self {
        let mut client = Self::new(
            Arc::clone(&config.http_client),
            config.base_hosts.clone(),
            config.user_agent.clone(),
        );
        client.credential = credential;
        client.select_user = config.select_user.clone();
        client
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Act as the given team member.
    pub fn with_select_user(mut self, member_id: impl Into<String>) -> Self {
        self.select_user = Some(member_id.into());
        self
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }

    /// Call an RPC route with a JSON body.
    #[instrument(skip(self, route, arg), fields(route = %route.path()))]
    pub fn rpc<A, R, E>(&self, route: &Route<A, R, E>, arg: &A) -> RpcRequest<R, E>
    where
        A: Serialize,
        R: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
    {
        let prepared = check_style(route, RouteStyle::Rpc).and_then(|_| {
            let body = serde_json::to_vec(arg)
                .map_err(|e| TransportCause::Serialization(e.to_string()))?;
            Ok(self
                .request(route)
                .header("Content-Type", "application/json")
                .body(HttpBody::Bytes(Bytes::from(body))))
        });
        let request = match prepared {
            Ok(request) => request,
            Err(cause) => return RequestHandle::failed(ClassifiedError::transport(cause)),
        };

        let http_client = Arc::clone(&self.http_client);
        RequestHandle::launch(move |progress| async move {
            let response = send::<E>(&*http_client, request.on_progress(progress)).await?;
            json_result(response)
        })
    }

    /// Upload `source` to an upload route.
    #[instrument(skip(self, route, arg, source), fields(route = %route.path()))]
    pub fn upload<A, R, E>(
        &self,
        route: &Route<A, R, E>,
        arg: &A,
        source: UploadSource,
    ) -> UploadRequest<R, E>
    where
        A: Serialize,
        R: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
    {
        let prepared = check_style(route, RouteStyle::Upload)
            .and_then(|_| self.with_arg_header(route, arg))
            .map(|request| {
                request
                    .header("Content-Type", "application/octet-stream")
                    .body(source.into())
            });
        let request = match prepared {
            Ok(request) => request,
            Err(cause) => return RequestHandle::failed(ClassifiedError::transport(cause)),
        };

        let http_client = Arc::clone(&self.http_client);
        RequestHandle::launch(move |progress| async move {
            let response = send::<E>(&*http_client, request.on_progress(progress)).await?;
            json_result(response)
        })
    }

    /// Download a payload into memory.
    #[instrument(skip(self, route, arg), fields(route = %route.path()))]
    pub fn download<A, R, E>(&self, route: &Route<A, R, E>, arg: &A) -> DownloadToMemoryRequest<R, E>
    where
        A: Serialize,
        R: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
    {
        let prepared = check_style(route, RouteStyle::Download)
            .and_then(|_| self.with_arg_header(route, arg));
        let request = match prepared {
            Ok(request) => request,
            Err(cause) => return RequestHandle::failed(ClassifiedError::transport(cause)),
        };

        let http_client = Arc::clone(&self.http_client);
        RequestHandle::launch(move |progress| async move {
            let response = send::<E>(&*http_client, request.on_progress(progress)).await?;
            let result = header_result::<R, E>(&response)?;
            Ok((result, response.body))
        })
    }

    /// Download a payload to `destination`.
    ///
    /// The payload is streamed into a staging file next to `destination`
    /// and moved into place on success. An existing file at `destination`
    /// is replaced when `overwrite` is set, otherwise the call fails with
    /// `TransportFailure(DestinationExists)`.
    #[instrument(skip(self, route, arg, destination), fields(route = %route.path()))]
    pub fn download_to_file<A, R, E>(
        &self,
        route: &Route<A, R, E>,
        arg: &A,
        destination: impl Into<PathBuf>,
        overwrite: bool,
    ) -> DownloadToFileRequest<R, E>
    where
        A: Serialize,
        R: DeserializeOwned + Send + 'static,
        E: DeserializeOwned + Send + 'static,
    {
        let prepared = check_style(route, RouteStyle::Download)
            .and_then(|_| self.with_arg_header(route, arg));
        let request = match prepared {
            Ok(request) => request,
            Err(cause) => return RequestHandle::failed(ClassifiedError::transport(cause)),
        };

        let destination = destination.into();
        let http_client = Arc::clone(&self.http_client);
        RequestHandle::launch(move |progress| async move {
            download_and_place(&*http_client, request.on_progress(progress), destination, overwrite)
                .await
        })
    }

    fn base_url(&self, host: RouteHost) -> &str {
        match host {
            RouteHost::Api => &self.base_hosts.api,
            RouteHost::Content => &self.base_hosts.content,
            RouteHost::Notify => &self.base_hosts.notify,
        }
    }

    /// POST request for `route` with the common headers.
    fn request<A, R, E>(&self, route: &Route<A, R, E>) -> HttpRequest {
        let url = format!(
            "{}/{}",
            self.base_url(route.host).trim_end_matches('/'),
            route.path()
        );
        let mut request = HttpRequest::post(url).header("User-Agent", self.user_agent.clone());

        if route.host != RouteHost::Notify {
            if let Some(credential) = &self.credential {
                request = request.bearer_token(credential.token());
            }
        }
        if let Some(member_id) = &self.select_user {
            request = request.header(SELECT_USER_HEADER, member_id.clone());
        }
        request
    }

    fn with_arg_header<A: Serialize, R, E>(
        &self,
        route: &Route<A, R, E>,
        arg: &A,
    ) -> Result<HttpRequest, TransportCause> {
        let json = header_json(arg).map_err(|e| TransportCause::Serialization(e.to_string()))?;
        Ok(self.request(route).header(API_ARG_HEADER, json))
    }
}

impl fmt::Debug for TransportClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportClient")
            .field("credential", &self.credential)
            .field("select_user", &self.select_user)
            .field("base_hosts", &self.base_hosts)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn check_style<A, R, E>(route: &Route<A, R, E>, expected: RouteStyle) -> Result<(), TransportCause> {
    if route.style == expected {
        return Ok(());
    }
    error!(
        route = %route.path(),
        expected = %expected,
        actual = %route.style,
        "Route dispatched with the wrong request style"
    );
    Err(TransportCause::StyleMismatch {
        route: route.path(),
        expected,
        actual: route.style,
    })
}

/// Execute `request`; any non-200 status is classified into an error.
async fn send<E: DeserializeOwned>(
    http_client: &dyn HttpClient,
    request: HttpRequest,
) -> CallResult<HttpResponse, E> {
    let url = request.url.clone();
    debug!(url = %url, "Sending API request");

    let response = http_client.execute(request).await.map_err(|e| {
        warn!(url = %url, error = %e, "API request failed without a response");
        classify_response_error::<E>(None, TransportCause::Bridge(e))
    })?;

    if response.status != 200 {
        warn!(url = %url, status = response.status, "API request returned an error status");
        return Err(classify_response_error(
            Some(&response),
            TransportCause::UnexpectedStatus(response.status),
        ));
    }
    Ok(response)
}

/// Decode a JSON result carried in the body of a 200 response.
fn json_result<R: DeserializeOwned, E: DeserializeOwned>(response: HttpResponse) -> CallResult<R, E> {
    // Routes without a result may answer with an empty body
    let body: &[u8] = if response.body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        &response.body
    };

    serde_json::from_slice(body).map_err(|e| {
        error!(status = response.status, error = %e, "Undecodable result body");
        classify_response_error(
            Some(&response),
            TransportCause::MalformedBody {
                status: response.status,
                reason: format!("undecodable result: {}", e),
            },
        )
    })
}

/// Decode the result carried in `Dropbox-Api-Result`.
fn header_result<R: DeserializeOwned, E: DeserializeOwned>(response: &HttpResponse) -> CallResult<R, E> {
    let malformed = |reason: String| -> ClassifiedError<E> {
        error!(status = response.status, reason = %reason, "Download result header unusable");
        classify_response_error(
            Some(response),
            TransportCause::MalformedBody {
                status: response.status,
                reason,
            },
        )
    };

    let header = response
        .header(API_RESULT_HEADER)
        .ok_or_else(|| malformed(format!("missing {} header", API_RESULT_HEADER)))?;
    serde_json::from_str(header).map_err(|e| malformed(format!("undecodable result header: {}", e)))
}

async fn download_and_place<R, E>(
    http_client: &dyn HttpClient,
    request: HttpRequest,
    destination: PathBuf,
    overwrite: bool,
) -> CallResult<(R, PathBuf), E>
where
    R: DeserializeOwned,
    E: DeserializeOwned,
{
    let placement = |e: std::io::Error| -> ClassifiedError<E> {
        error!(destination = %destination.display(), error = %e, "Download placement failed");
        ClassifiedError::transport(TransportCause::Placement(e))
    };

    let staging = staging_file(&destination).map_err(placement)?;
    let url = request.url.clone();
    debug!(url = %url, staging = %staging.path().display(), "Downloading to staging file");

    let mut response = http_client
        .execute_to_file(request, staging.path())
        .await
        .map_err(|e| {
            warn!(url = %url, error = %e, "Download failed without a response");
            classify_response_error::<E>(None, TransportCause::Bridge(e))
        })?;

    if response.status != 200 {
        // The error body was written to the staging file
        response.body = tokio::fs::read(staging.path())
            .await
            .map(Bytes::from)
            .unwrap_or_default();
        warn!(url = %url, status = response.status, "Download returned an error status");
        return Err(classify_response_error(
            Some(&response),
            TransportCause::UnexpectedStatus(response.status),
        ));
    }

    let result = header_result::<R, E>(&response)?;

    if tokio::fs::try_exists(&destination).await.map_err(placement)? {
        if !overwrite {
            warn!(destination = %destination.display(), "Download destination already exists");
            return Err(ClassifiedError::transport(TransportCause::DestinationExists(
                destination.clone(),
            )));
        }
        tokio::fs::remove_file(&destination).await.map_err(placement)?;
    }

    staging
        .persist(&destination)
        .map_err(|e| placement(e.error))?;
    debug!(destination = %destination.display(), "Download placed");

    Ok((result, destination))
}

/// Staging file in the destination's directory, so placement is a rename.
fn staging_file(destination: &Path) -> std::io::Result<tempfile::NamedTempFile> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tempfile::Builder::new()
        .prefix(".dbx-download-")
        .tempfile_in(dir)
}
