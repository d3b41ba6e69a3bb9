//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the individual
//! workspace crates (`core-service`, which in turn pulls in `core-auth`,
//! `core-transport` and the desktop bridges). Host applications can depend on
//! `dbx-workspace` and enable the documented features without needing to wire
//! each crate individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::{ClientsManager, CoreError};
