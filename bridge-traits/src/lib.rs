//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the core library and platform-specific
//! implementations. Each trait represents a capability that the core requires but
//! that must be implemented differently per platform (desktop, iOS, Android).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP transport (pooling, TLS, redirects)
//! - [`NetworkMonitor`](network::NetworkMonitor) - Reachability checks
//!
//! ### Security & Storage
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (Keychain/Keystore)
//!
//! ### Application Shell
//! - [`AppHost`](host::AppHost) - Declared URL schemes, URL probing and opening
//! - [`AuthPresenter`](host::AuthPresenter) - Embedded browser surface for web authorization
//!
//! ### Utilities
//! - [`LoggerSink`](log::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ In Progress |
//! | iOS      | TBD                 | 📋 Planned |
//! | Android  | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should convert platform-specific errors to `BridgeError`
//! with actionable messages.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent usage
//! across async tasks.
//!
//! ## Examples
//!
//! ### Implementing SecureStore
//!
//! ```ignore
//! use bridge_traits::storage::SecureStore;
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyKeychain;
//!
//! #[async_trait]
//! impl SecureStore for MyKeychain {
//!     async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> { todo!() }
//!     async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> { todo!() }
//!     async fn delete_secret(&self, key: &str) -> Result<()> { todo!() }
//!     async fn list_keys(&self) -> Result<Vec<String>> { todo!() }
//!     async fn clear_all(&self) -> Result<()> { todo!() }
//! }
//! ```

pub mod error;
pub mod host;
pub mod http;
pub mod log;
pub mod network;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use host::{AppHost, AuthPresenter, RedirectInterceptor};
pub use http::{
    HttpBody, HttpClient, HttpRequest, HttpResponse, Progress, ProgressCallback,
};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus};
pub use storage::SecureStore;
