use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    /// An authorized client already exists; unlink it before authorizing again.
    #[error("An authorized client already exists")]
    AlreadyAuthorized,
}

pub type Result<T> = std::result::Result<T, CoreError>;
