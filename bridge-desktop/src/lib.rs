//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, streaming bodies with progress
//! - `SecureStore` using the `keyring` crate
//! - `NetworkMonitor` using a TCP reachability probe
//! - `AppHost` with caller-supplied URL schemes, opening URLs through the `open` crate
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{DesktopAppHost, ReqwestHttpClient};
//!
//! let http_client = ReqwestHttpClient::new();
//! let host = DesktopAppHost::new().declare_scheme("db-abc123");
//! ```

mod host;
mod http;
mod network;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use host::{DesktopAppHost, UrlLauncher};
pub use http::ReqwestHttpClient;
pub use network::DesktopNetworkMonitor;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;
