//! Route descriptors
//!
//! A [`Route`] is static metadata for one API endpoint: where it lives,
//! how its request is shaped, and (at the type level) how its argument,
//! result and error payloads are serialized.

use serde::de::{Deserializer, IgnoredAny};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;

/// Host family an endpoint is served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteHost {
    Api,
    Content,
    /// Long-poll endpoints; requests are sent without credentials
    Notify,
}

/// Transport shape of an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteStyle {
    /// JSON argument in the body, JSON result in the body
    Rpc,
    /// Binary body, argument in `Dropbox-Api-Arg`, JSON result in the body
    Upload,
    /// No body, argument in `Dropbox-Api-Arg`, result in `Dropbox-Api-Result`
    Download,
}

impl fmt::Display for RouteStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteStyle::Rpc => write!(f, "rpc"),
            RouteStyle::Upload => write!(f, "upload"),
            RouteStyle::Download => write!(f, "download"),
        }
    }
}

/// Stand-in for "no argument", "no result" or "no error payload".
///
/// Serializes as JSON `null` and deserializes from any value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Void;

impl Serialize for Void {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_unit()
    }
}

impl<'de> Deserialize<'de> for Void {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer).map(|_| Void)
    }
}

/// Descriptor of one endpoint with argument type `A`, result type `R` and
/// route error type `E`.
///
/// ```
/// use core_transport::route::{Route, RouteHost, RouteStyle, Void};
///
/// static GET_CURRENT_ACCOUNT: Route<Void, serde_json::Value, Void> =
///     Route::new("users", "get_current_account", RouteHost::Api, RouteStyle::Rpc);
///
/// assert_eq!(GET_CURRENT_ACCOUNT.path(), "users/get_current_account");
/// ```
pub struct Route<A, R, E> {
    pub namespace: &'static str,
    pub name: &'static str,
    pub host: RouteHost,
    pub style: RouteStyle,
    _payloads: PhantomData<fn(A) -> (R, E)>,
}

impl<A, R, E> Route<A, R, E> {
    pub const fn new(
        namespace: &'static str,
        name: &'static str,
        host: RouteHost,
        style: RouteStyle,
    ) -> Self {
        Self {
            namespace,
            name,
            host,
            style,
            _payloads: PhantomData,
        }
    }

    /// `<namespace>/<name>`, appended to the host's base URL.
    pub fn path(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

// Manual impls keep A, R and E free of trait bounds
impl<A, R, E> Clone for Route<A, R, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A, R, E> Copy for Route<A, R, E> {}

impl<A, R, E> fmt::Debug for Route<A, R, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("host", &self.host)
            .field("style", &self.style)
            .finish()
    }
}
