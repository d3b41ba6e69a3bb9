//! Application Shell Implementation

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    host::AppHost,
};
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// Hands a URL to the operating system's handler for its scheme.
pub type UrlLauncher = Arc<dyn Fn(&str) -> io::Result<()> + Send + Sync>;

/// Desktop application host
///
/// Desktop operating systems have no bundle manifest, so the declared and
/// queryable schemes are supplied by the embedding application. Schemes
/// listed as installed are the ones `can_open_url` reports as openable.
///
/// URLs are opened with the `open` crate, which passes the URL to the
/// platform launcher as a single argument.
#[derive(Clone)]
pub struct DesktopAppHost {
    declared: Vec<String>,
    queryable: Vec<String>,
    installed: HashSet<String>,
    launcher: UrlLauncher,
}

impl Default for DesktopAppHost {
    fn default() -> Self {
        Self {
            declared: Vec::new(),
            queryable: Vec::new(),
            installed: HashSet::new(),
            launcher: Arc::new(|url: &str| open::that(url)),
        }
    }
}

impl fmt::Debug for DesktopAppHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DesktopAppHost")
            .field("declared", &self.declared)
            .field("queryable", &self.queryable)
            .field("installed", &self.installed)
            .finish_non_exhaustive()
    }
}

impl DesktopAppHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the launcher used by `open_url`
    pub fn with_launcher(mut self, launcher: UrlLauncher) -> Self {
        self.launcher = launcher;
        self
    }

    /// Register a scheme this application handles (e.g. `db-<app key>`)
    pub fn declare_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.declared.push(scheme.into());
        self
    }

    /// Allow probing a scheme through `can_open_url`
    pub fn allow_query(mut self, scheme: impl Into<String>) -> Self {
        self.queryable.push(scheme.into());
        self
    }

    /// Mark a scheme as having an installed handler
    pub fn with_installed_handler(mut self, scheme: impl Into<String>) -> Self {
        self.installed.insert(scheme.into().to_ascii_lowercase());
        self
    }

    fn scheme_of(url: &str) -> Option<String> {
        url.split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .filter(|scheme| !scheme.is_empty())
    }
}

#[async_trait]
impl AppHost for DesktopAppHost {
    fn declared_url_schemes(&self) -> Vec<String> {
        self.declared.clone()
    }

    fn queryable_url_schemes(&self) -> Vec<String> {
        self.queryable.clone()
    }

    async fn can_open_url(&self, url: &str) -> bool {
        let Some(scheme) = Self::scheme_of(url) else {
            return false;
        };
        if !self
            .queryable
            .iter()
            .any(|q| q.eq_ignore_ascii_case(&scheme))
        {
            debug!(scheme = %scheme, "Scheme is not queryable");
            return false;
        }
        self.installed.contains(&scheme)
    }

    async fn open_url(&self, url: &str) -> Result<bool> {
        let launcher = Arc::clone(&self.launcher);
        let target = url.to_string();
        let launched = tokio::task::spawn_blocking(move || launcher(&target))
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("URL launcher task failed: {}", e)))?;

        match launched {
            Ok(()) => {
                debug!("URL handed to the system launcher");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(error = %e, "No URL launcher on this system");
                Err(BridgeError::NotAvailable(format!("URL opener unavailable: {}", e)))
            }
            Err(e) => {
                warn!(error = %e, "System launcher refused URL");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_can_open_requires_queryable_and_installed() {
        let host = DesktopAppHost::new()
            .allow_query("dbapi-2")
            .allow_query("dbapi-8-emm")
            .with_installed_handler("dbapi-2");

        assert!(host.can_open_url("dbapi-2://1/connect").await);
        assert!(!host.can_open_url("dbapi-8-emm://1/connect").await);
    }

    #[tokio::test]
    async fn test_installed_but_not_queryable_is_hidden() {
        let host = DesktopAppHost::new().with_installed_handler("dbapi-2");
        assert!(!host.can_open_url("dbapi-2://1/connect").await);
    }

    #[test]
    fn test_declared_schemes() {
        let host = DesktopAppHost::new().declare_scheme("db-abc123");
        assert_eq!(host.declared_url_schemes(), vec!["db-abc123".to_string()]);
        assert!(host.queryable_url_schemes().is_empty());
    }

    #[test]
    fn test_scheme_parsing() {
        assert_eq!(
            DesktopAppHost::scheme_of("DBAPI-2://1/connect"),
            Some("dbapi-2".to_string())
        );
        assert_eq!(DesktopAppHost::scheme_of("no-scheme-here"), None);
        assert_eq!(DesktopAppHost::scheme_of("://x"), None);
    }

    #[tokio::test]
    async fn test_open_url_passes_query_intact() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let host = DesktopAppHost::new().with_launcher(Arc::new(move |url: &str| -> io::Result<()> {
            sink.lock().unwrap().push(url.to_string());
            Ok(())
        }));

        let url = "dbapi-2://1/connect?k=abc123&s=&state=oauth2%3Anonce";
        assert!(host.open_url(url).await.unwrap());
        assert_eq!(*seen.lock().unwrap(), vec![url.to_string()]);
    }

    #[tokio::test]
    async fn test_open_url_launcher_failures() {
        let refused = DesktopAppHost::new().with_launcher(Arc::new(|_: &str| -> io::Result<()> {
            Err(io::Error::other("exit status 4"))
        }));
        assert!(!refused.open_url("dbapi-2://1/connect").await.unwrap());

        let missing = DesktopAppHost::new().with_launcher(Arc::new(|_: &str| -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::NotFound, "xdg-open"))
        }));
        assert!(matches!(
            missing.open_url("dbapi-2://1/connect").await,
            Err(BridgeError::NotAvailable(_))
        ));
    }
}
