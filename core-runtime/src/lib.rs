//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the DBX core:
//! - Logging and tracing infrastructure
//! - SDK configuration with fail-fast validation
//! - Event bus for authorization state changes
//!
//! Every other core crate depends on this one for its logging conventions,
//! its configuration and the shared event channel.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{BaseHosts, SdkConfig, SdkConfigBuilder};
pub use error::{Error, Result};
pub use events::{AuthEvent, AuthPath, CoreEvent, EventBus};
