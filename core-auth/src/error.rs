use thiserror::Error;

/// Errors raised by the authorization flow.
///
/// Verification problems with an otherwise well-formed redirect are not
/// errors; they surface as `AuthorizationOutcome::Failure`.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The host application is missing a URL scheme declaration.
    #[error("Invalid host configuration: {0}")]
    Configuration(String),

    #[error("No network connection")]
    NetworkUnavailable,

    #[error("An authorization attempt is already in progress")]
    AuthorizationInProgress,

    #[error("Malformed redirect: {0}")]
    MalformedRedirect(String),

    #[error("Secure storage unavailable: {0}")]
    SecureStorageUnavailable(String),

    /// The application shell refused or failed an operation.
    #[error("Host error: {0}")]
    Host(String),

    /// The browser surface failed to present the authorization page.
    #[error("Presenter error: {0}")]
    Presenter(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;
