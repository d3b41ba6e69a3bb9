//! Host Application Abstractions
//!
//! Capabilities the authorization flow needs from the application shell:
//! which URL schemes the app declares, whether other apps can be invoked,
//! and a UI surface able to show the web authorization page.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;

/// Predicate deciding whether a navigation should be intercepted and handed
/// back to the core instead of being loaded.
pub type RedirectInterceptor = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Application shell capabilities.
///
/// On mobile platforms these map onto the bundle's declared URL types,
/// the queryable-schemes allow list and the system URL opener.
#[async_trait]
pub trait AppHost: Send + Sync {
    /// URL schemes this application registers as a handler for.
    fn declared_url_schemes(&self) -> Vec<String>;

    /// URL schemes this application is allowed to probe with
    /// [`can_open_url`](AppHost::can_open_url).
    fn queryable_url_schemes(&self) -> Vec<String>;

    /// Whether some installed application can handle `url`.
    async fn can_open_url(&self, url: &str) -> bool;

    /// Ask the operating system to open `url`. Returns `false` when the
    /// request was refused.
    async fn open_url(&self, url: &str) -> Result<bool>;
}

/// UI surface the authorization flow presents itself through.
#[async_trait]
pub trait AuthPresenter: Send + Sync {
    /// Present `url` in an embedded browser.
    ///
    /// Every navigation is passed to `interceptor`; the first URL it accepts
    /// must not be loaded. The surface dismisses itself and returns that URL.
    /// Returns `Ok(None)` when the user closed the surface without reaching
    /// a redirect.
    async fn present_web_auth(
        &self,
        url: &str,
        interceptor: RedirectInterceptor,
    ) -> Result<Option<String>>;

    /// Offer a manual retry affordance. Returns `true` when the user asked to
    /// try again.
    async fn offer_retry(&self, title: &str, message: &str) -> bool;
}
