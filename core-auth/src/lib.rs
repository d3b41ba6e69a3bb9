//! # Authorization Module
//!
//! Links an account and keeps its access token.
//!
//! ## Overview
//!
//! - Dual-path authorization: native handoff to an installed companion app,
//!   or the OAuth2 implicit grant in an embedded browser
//! - Redirect verification with a single-use nonce
//! - Secure credential persistence via the host's `SecureStore`
//! - Auth state event emission on the runtime `EventBus`

pub mod credential_store;
pub mod error;
pub mod manager;
pub mod oauth;
pub mod types;

#[cfg(test)]
mod test_support;

pub use credential_store::CredentialStore;
pub use error::{AuthError, Result};
pub use manager::{AuthConfig, AuthorizationManager};
pub use oauth::{Nonce, OAuthEndpoints, RedirectKind};
pub use types::{AuthFlow, AuthorizationOutcome, Credential, OAuth2ErrorKind};
