//! # Event Bus System
//!
//! Decoupled notification of authorization state changes using
//! `tokio::sync::broadcast`.
//!
//! ```text
//! ┌───────────────────────┐   emit    ┌───────────┐   subscribe   ┌────────────┐
//! │ AuthorizationManager  ├──────────>│ EventBus  ├──────────────>│ Subscriber │
//! └───────────────────────┘           └───────────┘               └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
//!
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Auth(AuthEvent::SignedIn {
//!         subject_id: "dbid:123".to_string(),
//!     }))
//!     .ok();
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber fell behind and missed `n`
//!   events. Non-fatal.
//! - **`RecvError::Closed`**: every sender was dropped. Treat as shutdown.
//!
//! Emitting with no subscribers returns `Err`; publishers ignore it.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Top-level event enum published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authorization-related events
    Auth(AuthEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthorizationFailed { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::SignedIn { .. }) => EventSeverity::Info,
            CoreEvent::Auth(AuthEvent::Cancelled) => EventSeverity::Warning,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

/// Which route an authorization attempt took.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthPath {
    /// Embedded browser, OAuth2 implicit grant
    Browser,
    /// Handoff to an installed companion application
    NativeApp,
}

/// Events related to authorization and stored credentials.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// An authorization attempt started.
    SigningIn { path: AuthPath },
    /// A credential was obtained and persisted.
    SignedIn { subject_id: String },
    /// The service or the redirect verification rejected the attempt.
    AuthorizationFailed {
        /// Wire error code, or `unknown` when none applies
        code: String,
        message: String,
    },
    /// The user backed out of the flow.
    Cancelled,
    /// Stored credentials were removed. `None` means all of them.
    SignedOut { subject_id: Option<String> },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SigningIn { .. } => "Authorization in progress",
            AuthEvent::SignedIn { .. } => "Account linked",
            AuthEvent::AuthorizationFailed { .. } => "Authorization failed",
            AuthEvent::Cancelled => "Authorization cancelled",
            AuthEvent::SignedOut { .. } => "Account unlinked",
        }
    }
}

/// Central broadcast channel for [`CoreEvent`]s.
///
/// Cheap to clone; clones share the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// A subscriber that falls behind by more than `capacity` events
    /// receives `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signed_in() -> CoreEvent {
        CoreEvent::Auth(AuthEvent::SignedIn {
            subject_id: "dbid:123".to_string(),
        })
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        assert!(bus.emit(signed_in()).is_err());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        assert_eq!(bus.emit(signed_in()).unwrap(), 2);
        assert_eq!(sub1.recv().await.unwrap(), signed_in());
        assert_eq!(sub2.recv().await.unwrap(), signed_in());
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();

        for _ in 0..5 {
            bus.emit(CoreEvent::Auth(AuthEvent::Cancelled)).unwrap();
        }

        assert!(matches!(sub.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_severity() {
        let failed = CoreEvent::Auth(AuthEvent::AuthorizationFailed {
            code: "access_denied".to_string(),
            message: "denied".to_string(),
        });
        assert_eq!(failed.severity(), EventSeverity::Error);
        assert_eq!(signed_in().severity(), EventSeverity::Info);
        assert_eq!(
            CoreEvent::Auth(AuthEvent::SigningIn {
                path: AuthPath::Browser
            })
            .severity(),
            EventSeverity::Debug
        );
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(signed_in()).unwrap();
        assert_eq!(json["type"], "Auth");
        assert_eq!(json["payload"]["event"], "SignedIn");
        assert_eq!(json["payload"]["subject_id"], "dbid:123");

        let back: CoreEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, signed_in());
    }
}
