//! Error types for API calls
//!
//! Every failed call resolves to exactly one [`ClassifiedError`] variant,
//! chosen from the HTTP status by [`classify_response_error`](crate::classify::classify_response_error).

use crate::route::RouteStyle;
use bridge_traits::error::BridgeError;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Why a rate limit was applied.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum RateLimitReason {
    TooManyRequests,
    TooManyWriteOperations,
    #[serde(other)]
    Other,
}

fn default_retry_after() -> u64 {
    1
}

/// Payload of a 429 response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RateLimitError {
    pub reason: RateLimitReason,
    /// Seconds the caller should wait before retrying
    #[serde(default = "default_retry_after")]
    pub retry_after: u64,
}

/// Payload of a 401 response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum AuthErrorPayload {
    InvalidAccessToken,
    InvalidSelectUser,
    InvalidSelectAdmin,
    UserSuspended,
    ExpiredAccessToken,
    MissingScope {
        #[serde(default)]
        required_scope: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// Failure below the HTTP status level.
#[derive(Error, Debug)]
pub enum TransportCause {
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    #[error("Request cancelled")]
    Cancelled,

    /// The server answered with a status that is not a success.
    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// The response did not follow the wire contract.
    #[error("Malformed response (status {status}): {reason}")]
    MalformedBody { status: u16, reason: String },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("Failed to place downloaded file: {0}")]
    Placement(#[source] std::io::Error),

    #[error("Route '{route}' is a {actual} route, not {expected}")]
    StyleMismatch {
        route: String,
        expected: RouteStyle,
        actual: RouteStyle,
    },
}

/// Terminal error of an API call, with `E` the route's error payload.
#[derive(Error, Debug)]
pub enum ClassifiedError<E> {
    #[error("Internal server error ({status}): {message}")]
    InternalServerError {
        status: u16,
        message: String,
        request_id: Option<String>,
    },

    #[error("Bad input: {message}")]
    BadInput {
        message: String,
        request_id: Option<String>,
    },

    #[error("Rate limited, retry after {} seconds", .error.retry_after)]
    RateLimited {
        error: RateLimitError,
        request_id: Option<String>,
    },

    #[error("Authentication failed: {error:?}")]
    AuthFailed {
        error: AuthErrorPayload,
        request_id: Option<String>,
    },

    #[error("Route error: {error:?}")]
    RouteError {
        error: E,
        request_id: Option<String>,
    },

    #[error("Transport failure: {cause}")]
    TransportFailure {
        #[source]
        cause: TransportCause,
    },

    #[error("HTTP error ({status}): {message}")]
    HttpError {
        status: u16,
        message: String,
        request_id: Option<String>,
    },
}

impl<E> ClassifiedError<E> {
    pub fn transport(cause: impl Into<TransportCause>) -> Self {
        Self::TransportFailure {
            cause: cause.into(),
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self::transport(TransportCause::Cancelled)
    }

    /// `X-Dropbox-Request-Id` of the failed response, when there was one.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::InternalServerError { request_id, .. }
            | Self::BadInput { request_id, .. }
            | Self::RateLimited { request_id, .. }
            | Self::AuthFailed { request_id, .. }
            | Self::RouteError { request_id, .. }
            | Self::HttpError { request_id, .. } => request_id.as_deref(),
            Self::TransportFailure { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::TransportFailure {
                cause: TransportCause::Cancelled
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::Void;

    #[test]
    fn test_rate_limit_payload() {
        let parsed: RateLimitError =
            serde_json::from_str(r#"{"reason": {".tag": "too_many_write_operations"}, "retry_after": 5}"#)
                .unwrap();
        assert_eq!(parsed.reason, RateLimitReason::TooManyWriteOperations);
        assert_eq!(parsed.retry_after, 5);

        let defaulted: RateLimitError =
            serde_json::from_str(r#"{"reason": {".tag": "something_new"}}"#).unwrap();
        assert_eq!(defaulted.reason, RateLimitReason::Other);
        assert_eq!(defaulted.retry_after, 1);
    }

    #[test]
    fn test_auth_error_payload() {
        let parsed: AuthErrorPayload =
            serde_json::from_str(r#"{".tag": "expired_access_token"}"#).unwrap();
        assert_eq!(parsed, AuthErrorPayload::ExpiredAccessToken);

        let scoped: AuthErrorPayload =
            serde_json::from_str(r#"{".tag": "missing_scope", "required_scope": "files.content.read"}"#)
                .unwrap();
        assert_eq!(
            scoped,
            AuthErrorPayload::MissingScope {
                required_scope: Some("files.content.read".to_string())
            }
        );
    }

    #[test]
    fn test_error_display() {
        let error: ClassifiedError<Void> = ClassifiedError::InternalServerError {
            status: 500,
            message: "boom".to_string(),
            request_id: Some("abc".to_string()),
        };
        assert_eq!(error.to_string(), "Internal server error (500): boom");
        assert_eq!(error.request_id(), Some("abc"));
    }

    #[test]
    fn test_cancelled_helper() {
        let error: ClassifiedError<Void> = ClassifiedError::cancelled();
        assert!(error.is_cancelled());
        assert_eq!(error.request_id(), None);
        assert_eq!(error.to_string(), "Transport failure: Request cancelled");
    }
}
