//! # Transport Module
//!
//! Typed HTTP calls against the API hosts.
//!
//! ## Overview
//!
//! - [`Route`] descriptors: host, request style and payload types of an endpoint
//! - [`TransportClient`]: builds and sends RPC, upload and download requests
//! - [`RequestHandle`]: cancellation, progress and single-shot result delivery
//! - [`ClassifiedError`]: status-driven error taxonomy

pub mod classify;
pub mod client;
pub mod error;
pub mod escape;
pub mod request;
pub mod route;

pub use classify::classify_response_error;
pub use client::{TransportClient, UploadSource};
pub use core_runtime::config::BaseHosts;
pub use error::{
    AuthErrorPayload, ClassifiedError, RateLimitError, RateLimitReason, TransportCause,
};
pub use request::{
    CallResult, DownloadToFileRequest, DownloadToMemoryRequest, RequestHandle, RpcRequest,
    UploadRequest,
};
pub use route::{Route, RouteHost, RouteStyle, Void};
