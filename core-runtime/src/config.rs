//! # SDK Configuration
//!
//! Builder-based configuration for the DBX core.
//!
//! The builder enforces fail-fast validation: every bridge the core needs
//! must be available when [`SdkConfigBuilder::build`] returns, and the app
//! key and hosts must be well formed.
//!
//! ## Required
//!
//! - app key (explicit, or the `DBX_APP_KEY` environment variable)
//! - `SecureStore`, `HttpClient`, `NetworkMonitor`, `AppHost`
//!
//! When the `desktop-shims` feature is enabled, desktop implementations of
//! the bridges are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::SdkConfig;
//! use std::sync::Arc;
//!
//! let config = SdkConfig::builder()
//!     .app_key("abc123")
//!     .http_client(Arc::new(MyHttpClient))
//!     .secure_store(Arc::new(MyKeychain))
//!     .network_monitor(Arc::new(MyReachability))
//!     .app_host(Arc::new(MyAppShell))
//!     .build()?;
//!
//! assert_eq!(config.redirect_scheme(), "db-abc123");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{AppHost, HttpClient, NetworkMonitor, SecureStore};
use std::fmt;
use std::sync::Arc;
use url::Url;

/// Environment variable consulted when no app key is set explicitly.
pub const APP_KEY_ENV: &str = "DBX_APP_KEY";

pub const DEFAULT_SCHEME_PREFIX: &str = "db";
pub const DEFAULT_WEB_HOST: &str = "www.dropbox.com";

/// Companion-app schemes probed for native handoff, highest priority first.
pub const NATIVE_HANDOFF_SCHEMES: &[&str] = &["dbapi-2", "dbapi-8-emm"];

pub const DEFAULT_USER_AGENT: &str = concat!("dbx-core-rust/", env!("CARGO_PKG_VERSION"));

/// Base URLs of the three API host families.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseHosts {
    pub api: String,
    pub content: String,
    pub notify: String,
}

impl Default for BaseHosts {
    fn default() -> Self {
        Self {
            api: "https://api.dropboxapi.com/2".to_string(),
            content: "https://content.dropboxapi.com/2".to_string(),
            notify: "https://notify.dropboxapi.com/2".to_string(),
        }
    }
}

impl BaseHosts {
    fn validate(&self) -> Result<()> {
        for (name, base) in [
            ("api", &self.api),
            ("content", &self.content),
            ("notify", &self.notify),
        ] {
            let parsed = Url::parse(base).map_err(|e| {
                Error::Config(format!("Invalid {} base host '{}': {}", name, base, e))
            })?;
            if parsed.scheme() != "https" && parsed.scheme() != "http" {
                return Err(Error::Config(format!(
                    "{} base host must be an http(s) URL, got '{}'",
                    name, base
                )));
            }
        }
        Ok(())
    }
}

/// Core configuration for the DBX SDK.
///
/// Use [`SdkConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct SdkConfig {
    /// Application key issued by the developer console
    pub app_key: String,
    /// Prefix of the redirect URL scheme (`<prefix>-<app key>`)
    pub scheme_prefix: String,
    /// Host serving the web authorization page
    pub web_host: String,
    /// Native handoff schemes in priority order
    pub native_schemes: Vec<String>,
    pub base_hosts: BaseHosts,
    pub user_agent: String,
    /// Team member to act as, sent as `Dropbox-Api-Select-User`
    pub select_user: Option<String>,

    pub secure_store: Arc<dyn SecureStore>,
    pub http_client: Arc<dyn HttpClient>,
    pub network_monitor: Arc<dyn NetworkMonitor>,
    pub app_host: Arc<dyn AppHost>,
}

impl fmt::Debug for SdkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SdkConfig")
            .field("app_key", &"[REDACTED]")
            .field("scheme_prefix", &self.scheme_prefix)
            .field("web_host", &self.web_host)
            .field("native_schemes", &self.native_schemes)
            .field("base_hosts", &self.base_hosts)
            .field("user_agent", &self.user_agent)
            .field("select_user", &self.select_user)
            .field("secure_store", &"SecureStore { ... }")
            .field("http_client", &"HttpClient { ... }")
            .field("network_monitor", &"NetworkMonitor { ... }")
            .field("app_host", &"AppHost { ... }")
            .finish()
    }
}

impl SdkConfig {
    pub fn builder() -> SdkConfigBuilder {
        SdkConfigBuilder::default()
    }

    /// URL scheme the host must declare to receive redirects.
    pub fn redirect_scheme(&self) -> String {
        format!("{}-{}", self.scheme_prefix, self.app_key)
    }

    /// Validates the configuration.
    ///
    /// Checks the app key and scheme prefix are usable inside a URL scheme,
    /// the web host is a bare host name and the base hosts parse as URLs.
    pub fn validate(&self) -> Result<()> {
        if self.app_key.is_empty() {
            return Err(Error::Config("App key cannot be empty".to_string()));
        }
        if !self.app_key.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::Config(
                "App key must be ASCII alphanumeric to form a URL scheme".to_string(),
            ));
        }
        if self.scheme_prefix.is_empty()
            || !self
                .scheme_prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(Error::Config(format!(
                "Invalid scheme prefix '{}'",
                self.scheme_prefix
            )));
        }
        if self.web_host.is_empty() || self.web_host.contains(['/', ':', '?', '#']) {
            return Err(Error::Config(format!(
                "Web host must be a bare host name, got '{}'",
                self.web_host
            )));
        }
        if self.native_schemes.is_empty() {
            return Err(Error::Config(
                "At least one native handoff scheme is required".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(Error::Config("User agent cannot be empty".to_string()));
        }
        self.base_hosts.validate()
    }
}

fn missing_capability(capability: &str, hint: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required. {} \
             Desktop: enable the 'desktop-shims' feature to use the default adapter.",
            capability, hint
        ),
    }
}

#[cfg(feature = "desktop-shims")]
mod desktop_defaults {
    use super::*;
    use bridge_desktop::{DesktopAppHost, DesktopNetworkMonitor, ReqwestHttpClient};

    pub fn secure_store(redirect_scheme: &str) -> Result<Arc<dyn SecureStore>> {
        #[cfg(feature = "secure-store")]
        {
            let store: Arc<dyn SecureStore> = Arc::new(
                bridge_desktop::KeyringSecureStore::with_service_name(redirect_scheme),
            );
            Ok(store)
        }
        #[cfg(not(feature = "secure-store"))]
        {
            let _ = redirect_scheme;
            Err(missing_capability(
                "SecureStore",
                "The desktop keyring adapter is disabled (feature 'secure-store').",
            ))
        }
    }

    pub fn http_client() -> Arc<dyn HttpClient> {
        Arc::new(ReqwestHttpClient::new())
    }

    pub fn network_monitor() -> Arc<dyn NetworkMonitor> {
        Arc::new(DesktopNetworkMonitor::new())
    }

    pub fn app_host(redirect_scheme: &str, native_schemes: &[String]) -> Arc<dyn AppHost> {
        let host = native_schemes.iter().fold(
            DesktopAppHost::new().declare_scheme(redirect_scheme),
            |host, scheme| host.allow_query(scheme.clone()),
        );
        Arc::new(host)
    }
}

#[cfg(not(feature = "desktop-shims"))]
mod desktop_defaults {
    use super::*;

    pub fn secure_store(_redirect_scheme: &str) -> Result<Arc<dyn SecureStore>> {
        Err(missing_capability(
            "SecureStore",
            "Mobile: inject Keychain/Keystore backed storage.",
        ))
    }
}

/// Resolve the app key, preferring an explicit value over the environment.
fn resolve_app_key(explicit: Option<String>, from_env: Option<String>) -> Result<String> {
    explicit
        .or(from_env)
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            Error::Config(format!(
                "App key is required. Use .app_key() or set {}.",
                APP_KEY_ENV
            ))
        })
}

/// Builder for [`SdkConfig`].
#[derive(Default)]
pub struct SdkConfigBuilder {
    app_key: Option<String>,
    scheme_prefix: Option<String>,
    web_host: Option<String>,
    native_schemes: Option<Vec<String>>,
    base_hosts: Option<BaseHosts>,
    user_agent: Option<String>,
    select_user: Option<String>,
    secure_store: Option<Arc<dyn SecureStore>>,
    http_client: Option<Arc<dyn HttpClient>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    app_host: Option<Arc<dyn AppHost>>,
}

impl SdkConfigBuilder {
    pub fn app_key(mut self, key: impl Into<String>) -> Self {
        self.app_key = Some(key.into());
        self
    }

    pub fn scheme_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.scheme_prefix = Some(prefix.into());
        self
    }

    pub fn web_host(mut self, host: impl Into<String>) -> Self {
        self.web_host = Some(host.into());
        self
    }

    pub fn native_schemes<I, S>(mut self, schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.native_schemes = Some(schemes.into_iter().map(Into::into).collect());
        self
    }

    pub fn base_hosts(mut self, hosts: BaseHosts) -> Self {
        self.base_hosts = Some(hosts);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn select_user(mut self, member_id: impl Into<String>) -> Self {
        self.select_user = Some(member_id.into());
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn network_monitor(mut self, monitor: Arc<dyn NetworkMonitor>) -> Self {
        self.network_monitor = Some(monitor);
        self
    }

    pub fn app_host(mut self, host: Arc<dyn AppHost>) -> Self {
        self.app_host = Some(host);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when the app key is missing or a value is malformed
    /// - [`Error::CapabilityMissing`] when a bridge is absent and no desktop
    ///   default is available
    pub fn build(self) -> Result<SdkConfig> {
        let app_key = resolve_app_key(self.app_key, std::env::var(APP_KEY_ENV).ok())?;
        let scheme_prefix = self
            .scheme_prefix
            .unwrap_or_else(|| DEFAULT_SCHEME_PREFIX.to_string());
        let native_schemes = self.native_schemes.unwrap_or_else(|| {
            NATIVE_HANDOFF_SCHEMES
                .iter()
                .map(|s| s.to_string())
                .collect()
        });
        let redirect_scheme = format!("{}-{}", scheme_prefix, app_key);

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => desktop_defaults::secure_store(&redirect_scheme)?,
        };

        #[cfg(feature = "desktop-shims")]
        let (http_client, network_monitor, app_host) = (
            self.http_client
                .unwrap_or_else(desktop_defaults::http_client),
            self.network_monitor
                .unwrap_or_else(desktop_defaults::network_monitor),
            self.app_host.unwrap_or_else(|| {
                desktop_defaults::app_host(&redirect_scheme, &native_schemes)
            }),
        );

        #[cfg(not(feature = "desktop-shims"))]
        let (http_client, network_monitor, app_host) = (
            self.http_client.ok_or_else(|| {
                missing_capability("HttpClient", "Inject the platform HTTP stack.")
            })?,
            self.network_monitor.ok_or_else(|| {
                missing_capability("NetworkMonitor", "Inject platform reachability.")
            })?,
            self.app_host.ok_or_else(|| {
                missing_capability("AppHost", "Inject the application shell bridge.")
            })?,
        );

        let config = SdkConfig {
            app_key,
            scheme_prefix,
            web_host: self
                .web_host
                .unwrap_or_else(|| DEFAULT_WEB_HOST.to_string()),
            native_schemes,
            base_hosts: self.base_hosts.unwrap_or_default(),
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            select_user: self.select_user,
            secure_store,
            http_client,
            network_monitor,
            app_host,
        };

        config.validate()?;
        Ok(config)
    }
}
