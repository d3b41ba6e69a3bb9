use serde::{Deserialize, Serialize};
use std::fmt;

/// An access token bound to the account it was issued for.
///
/// Immutable once constructed. `Debug` never prints the token, and the type
/// has no serde impls so the token only leaves through [`Credential::token`].
///
/// # Examples
///
/// ```
/// use core_auth::Credential;
///
/// let credential = Credential::new("sl.token", "dbid:123");
/// assert_eq!(credential.subject_id(), "dbid:123");
/// assert!(!format!("{:?}", credential).contains("sl.token"));
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    token: String,
    subject_id: String,
}

impl Credential {
    pub fn new(token: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            subject_id: subject_id.into(),
        }
    }

    /// The bearer token. Never log this value.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Identifier of the account the token belongs to.
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[REDACTED]")
            .field("subject_id", &self.subject_id)
            .finish()
    }
}

/// OAuth2 error codes the authorization server may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OAuth2ErrorKind {
    UnauthorizedClient,
    AccessDenied,
    UnsupportedResponseType,
    InvalidScope,
    ServerError,
    TemporarilyUnavailable,
    /// Any code outside the table, and failed redirect verification
    Unknown,
}

impl OAuth2ErrorKind {
    /// Map a wire error code. Unrecognized codes become `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "unauthorized_client" => Self::UnauthorizedClient,
            "access_denied" => Self::AccessDenied,
            "unsupported_response_type" => Self::UnsupportedResponseType,
            "invalid_scope" => Self::InvalidScope,
            "server_error" => Self::ServerError,
            "temporarily_unavailable" => Self::TemporarilyUnavailable,
            _ => Self::Unknown,
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Self::UnauthorizedClient => "unauthorized_client",
            Self::AccessDenied => "access_denied",
            Self::UnsupportedResponseType => "unsupported_response_type",
            Self::InvalidScope => "invalid_scope",
            Self::ServerError => "server_error",
            Self::TemporarilyUnavailable => "temporarily_unavailable",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for OAuth2ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Terminal result of one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Success(Credential),
    Failure {
        kind: OAuth2ErrorKind,
        message: String,
    },
    Cancelled,
}

impl AuthorizationOutcome {
    pub(crate) fn failure(kind: OAuth2ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Self::Success(credential) => Some(credential),
            _ => None,
        }
    }
}

/// How `begin_authorization` proceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFlow {
    /// The companion app was launched through `scheme`; the outcome arrives
    /// later through `complete_redirect`.
    AwaitingRedirect { scheme: String },
    /// The browser flow ran to completion.
    Completed(AuthorizationOutcome),
}
