//! # Authorization Manager
//!
//! Orchestrates linking an account, choosing between the native handoff to
//! an installed companion app and the browser-based implicit grant.
//!
//! ## Flow
//!
//! 1. The host must declare the redirect scheme `<prefix>-<app key>` and
//!    allow querying every native handoff scheme. Anything missing is a
//!    fatal configuration error.
//! 2. While the device is offline the presenter offers a manual retry.
//! 3. Native schemes are probed in priority order. The first available one
//!    is opened with a fresh nonce; otherwise the authorize page is shown in
//!    the presenter's embedded browser.
//! 4. Redirects come back through [`AuthorizationManager::complete_redirect`],
//!    which verifies them and persists the resulting credential.
//!
//! ## Usage
//!
//! ```ignore
//! use core_auth::{AuthConfig, AuthFlow, AuthorizationManager};
//!
//! let manager = AuthorizationManager::new(
//!     AuthConfig::from_sdk(&sdk_config),
//!     credential_store,
//!     sdk_config.app_host.clone(),
//!     sdk_config.network_monitor.clone(),
//!     event_bus,
//! );
//!
//! match manager.begin_authorization(&presenter).await? {
//!     AuthFlow::Completed(outcome) => handle(outcome),
//!     AuthFlow::AwaitingRedirect { .. } => { /* wait for the deep link */ }
//! }
//!
//! // From the application's URL handler:
//! if let Some(outcome) = manager.complete_redirect(&url).await? {
//!     handle(outcome);
//! }
//! ```

use crate::credential_store::CredentialStore;
use crate::error::{AuthError, Result};
use crate::oauth::{self, Nonce, OAuthEndpoints, RedirectKind, UNVERIFIED_LINK_MESSAGE};
use crate::types::{AuthFlow, AuthorizationOutcome, Credential, OAuth2ErrorKind};
use bridge_traits::host::{AppHost, AuthPresenter, RedirectInterceptor};
use bridge_traits::network::NetworkMonitor;
use core_runtime::config::{SdkConfig, DEFAULT_SCHEME_PREFIX, DEFAULT_WEB_HOST, NATIVE_HANDOFF_SCHEMES};
use core_runtime::events::{AuthEvent, AuthPath, CoreEvent, EventBus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

const OFFLINE_TITLE: &str = "No internet connection";
const OFFLINE_MESSAGE: &str =
    "Linking your account requires an internet connection. Check your connection and try again.";

/// Settings the authorization flow needs.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub app_key: String,
    pub scheme_prefix: String,
    pub web_host: String,
    /// Companion-app schemes, highest priority first
    pub native_schemes: Vec<String>,
}

impl AuthConfig {
    pub fn new(app_key: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            scheme_prefix: DEFAULT_SCHEME_PREFIX.to_string(),
            web_host: DEFAULT_WEB_HOST.to_string(),
            native_schemes: NATIVE_HANDOFF_SCHEMES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    pub fn from_sdk(config: &SdkConfig) -> Self {
        Self {
            app_key: config.app_key.clone(),
            scheme_prefix: config.scheme_prefix.clone(),
            web_host: config.web_host.clone(),
            native_schemes: config.native_schemes.clone(),
        }
    }
}

/// Releases the single-attempt flag when an attempt ends, however it ends.
struct AttemptGuard<'a>(&'a AtomicBool);

impl<'a> AttemptGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives authorization attempts and owns the stored credentials.
pub struct AuthorizationManager {
    config: AuthConfig,
    endpoints: OAuthEndpoints,
    credentials: CredentialStore,
    app_host: Arc<dyn AppHost>,
    network: Arc<dyn NetworkMonitor>,
    event_bus: EventBus,
    /// Nonce of the handoff launched last; replaced by every launch
    pending_nonce: Mutex<Option<Nonce>>,
    attempt_active: AtomicBool,
}

impl AuthorizationManager {
    pub fn new(
        config: AuthConfig,
        credentials: CredentialStore,
        app_host: Arc<dyn AppHost>,
        network: Arc<dyn NetworkMonitor>,
        event_bus: EventBus,
    ) -> Self {
        let endpoints =
            OAuthEndpoints::new(config.app_key.clone(), &config.scheme_prefix, &config.web_host);
        Self {
            config,
            endpoints,
            credentials,
            app_host,
            network,
            event_bus,
            pending_nonce: Mutex::new(None),
            attempt_active: AtomicBool::new(false),
        }
    }

    /// Start linking an account.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Configuration`] when the host misses a scheme declaration
    /// - [`AuthError::NetworkUnavailable`] when offline and the user declines to retry
    /// - [`AuthError::AuthorizationInProgress`] when another attempt is running
    /// - [`AuthError::Host`] / [`AuthError::Presenter`] when a bridge call fails
    #[instrument(skip(self, presenter))]
    pub async fn begin_authorization(&self, presenter: &dyn AuthPresenter) -> Result<AuthFlow> {
        let _attempt = AttemptGuard::acquire(&self.attempt_active).ok_or_else(|| {
            warn!("Authorization requested while another attempt is running");
            AuthError::AuthorizationInProgress
        })?;

        self.check_host_configuration()?;
        self.wait_for_network(presenter).await?;

        match self.probe_native_scheme().await {
            Some(scheme) => self.launch_native_handoff(scheme).await,
            None => self.run_browser_flow(presenter).await,
        }
    }

    fn check_host_configuration(&self) -> Result<()> {
        let declared = self.app_host.declared_url_schemes();
        let redirect_scheme = self.endpoints.redirect_scheme();
        if !declared
            .iter()
            .any(|s| s.eq_ignore_ascii_case(redirect_scheme))
        {
            error!(
                scheme = %redirect_scheme,
                "Host does not declare the redirect URL scheme"
            );
            return Err(AuthError::Configuration(format!(
                "The application must register the URL scheme '{}' to receive \
                 authorization redirects",
                redirect_scheme
            )));
        }

        let queryable = self.app_host.queryable_url_schemes();
        let missing: Vec<&str> = self
            .config
            .native_schemes
            .iter()
            .filter(|scheme| !queryable.iter().any(|q| q.eq_ignore_ascii_case(scheme)))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            error!(missing = ?missing, "Host does not allow querying native handoff schemes");
            return Err(AuthError::Configuration(format!(
                "The application must allow querying the URL schemes {:?}",
                missing
            )));
        }

        Ok(())
    }

    async fn wait_for_network(&self, presenter: &dyn AuthPresenter) -> Result<()> {
        while !self.network.is_connected().await {
            info!("Network unreachable, offering retry");
            if !presenter.offer_retry(OFFLINE_TITLE, OFFLINE_MESSAGE).await {
                warn!("User declined to retry without network");
                return Err(AuthError::NetworkUnavailable);
            }
        }
        Ok(())
    }

    async fn probe_native_scheme(&self) -> Option<String> {
        for scheme in &self.config.native_schemes {
            if self
                .app_host
                .can_open_url(&format!("{}://1/connect", scheme))
                .await
            {
                debug!(scheme = %scheme, "Companion app available");
                return Some(scheme.clone());
            }
        }
        debug!("No companion app installed, using browser flow");
        None
    }

    async fn launch_native_handoff(&self, scheme: String) -> Result<AuthFlow> {
        self.emit(AuthEvent::SigningIn {
            path: AuthPath::NativeApp,
        });

        let nonce = Nonce::generate();
        let url = self.endpoints.handoff_url(&scheme, &nonce)?;
        // Replaces any earlier pending nonce
        *self.pending_nonce.lock().await = Some(nonce);

        let opened = match self.app_host.open_url(&url).await {
            Ok(opened) => opened,
            Err(e) => {
                self.pending_nonce.lock().await.take();
                error!(scheme = %scheme, error = %e, "Failed to open companion app");
                return Err(AuthError::Host(e.to_string()));
            }
        };
        if !opened {
            self.pending_nonce.lock().await.take();
            warn!(scheme = %scheme, "Host refused to open companion app");
            return Err(AuthError::Host(format!(
                "The system refused to open '{}'",
                scheme
            )));
        }

        info!(scheme = %scheme, "Native handoff launched");
        Ok(AuthFlow::AwaitingRedirect { scheme })
    }

    async fn run_browser_flow(&self, presenter: &dyn AuthPresenter) -> Result<AuthFlow> {
        self.emit(AuthEvent::SigningIn {
            path: AuthPath::Browser,
        });

        let url = self.endpoints.authorize_url()?;
        let endpoints = self.endpoints.clone();
        let interceptor: RedirectInterceptor =
            Arc::new(move |candidate: &str| endpoints.is_intercepted(candidate));

        let redirect = presenter
            .present_web_auth(&url, interceptor)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to present authorization page");
                AuthError::Presenter(e.to_string())
            })?;

        let Some(redirect) = redirect else {
            info!("Authorization page closed by the user");
            self.emit(AuthEvent::Cancelled);
            return Ok(AuthFlow::Completed(AuthorizationOutcome::Cancelled));
        };

        match self.complete_redirect(&redirect).await? {
            Some(outcome) => Ok(AuthFlow::Completed(outcome)),
            None => Err(AuthError::MalformedRedirect(
                "presenter returned a URL that is not an authorization redirect".to_string(),
            )),
        }
    }

    /// Whether `url` is an authorization redirect for this application.
    pub fn can_handle_url(&self, url: &str) -> bool {
        self.endpoints.match_redirect(url).is_some()
    }

    /// Interpret a redirect delivered to the application.
    ///
    /// Returns `Ok(None)` for URLs that are not authorization redirects for
    /// this app. A successful outcome is persisted before it is returned.
    #[instrument(skip(self, url))]
    pub async fn complete_redirect(&self, url: &str) -> Result<Option<AuthorizationOutcome>> {
        let Some((kind, parsed)) = self.endpoints.match_redirect(url) else {
            debug!("URL is not an authorization redirect");
            return Ok(None);
        };

        let outcome = match kind {
            RedirectKind::Cancel => AuthorizationOutcome::Cancelled,
            RedirectKind::BrowserToken => oauth::browser_outcome(parsed.fragment().unwrap_or(""))?,
            RedirectKind::NativeConnect => {
                let params = oauth::parse_params(parsed.query().unwrap_or(""))?;
                let mut pending = self.pending_nonce.lock().await;
                if oauth::state_matches(&params, pending.as_ref()) {
                    pending.take();
                    AuthorizationOutcome::Success(oauth::native_credential(&params)?)
                } else {
                    warn!("Handoff redirect does not match the pending attempt");
                    AuthorizationOutcome::Failure {
                        kind: OAuth2ErrorKind::Unknown,
                        message: UNVERIFIED_LINK_MESSAGE.to_string(),
                    }
                }
            }
        };

        match &outcome {
            AuthorizationOutcome::Success(credential) => {
                if !self
                    .credentials
                    .set(credential.subject_id(), credential.token())
                    .await
                {
                    return Err(AuthError::SecureStorageUnavailable(
                        "the credential could not be persisted".to_string(),
                    ));
                }
                info!(subject_id = %credential.subject_id(), "Account linked");
                self.emit(AuthEvent::SignedIn {
                    subject_id: credential.subject_id().to_string(),
                });
            }
            AuthorizationOutcome::Failure { kind, message } => {
                warn!(code = %kind, "Authorization failed");
                self.emit(AuthEvent::AuthorizationFailed {
                    code: kind.as_code().to_string(),
                    message: message.clone(),
                });
            }
            AuthorizationOutcome::Cancelled => {
                info!("Authorization cancelled");
                self.emit(AuthEvent::Cancelled);
            }
        }

        Ok(Some(outcome))
    }

    /// Forget the pending native handoff, if any. A redirect arriving later
    /// fails verification.
    pub async fn cancel_authorization(&self) -> bool {
        let had_pending = self.pending_nonce.lock().await.take().is_some();
        if had_pending {
            info!("Pending native handoff abandoned");
            self.emit(AuthEvent::Cancelled);
        }
        had_pending
    }

    /// All stored credentials, ordered by subject id.
    pub async fn list_credentials(&self) -> Vec<Credential> {
        let mut credentials = Vec::new();
        for id in self.credentials.list_ids().await {
            if let Some(token) = self.credentials.get(&id).await {
                credentials.push(Credential::new(token, id));
            }
        }
        credentials
    }

    pub async fn credential(&self, subject_id: &str) -> Option<Credential> {
        self.credentials
            .get(subject_id)
            .await
            .map(|token| Credential::new(token, subject_id))
    }

    /// The first stored credential, if any.
    pub async fn any_credential(&self) -> Option<Credential> {
        for id in self.credentials.list_ids().await {
            if let Some(credential) = self.credential(&id).await {
                return Some(credential);
            }
        }
        None
    }

    pub async fn has_credentials(&self) -> bool {
        !self.credentials.list_ids().await.is_empty()
    }

    pub async fn clear_credential(&self, subject_id: &str) -> bool {
        let removed = self.credentials.delete(subject_id).await;
        if removed {
            self.emit(AuthEvent::SignedOut {
                subject_id: Some(subject_id.to_string()),
            });
        }
        removed
    }

    pub async fn clear_all_credentials(&self) -> bool {
        let removed = self.credentials.delete_all().await;
        if removed {
            self.emit(AuthEvent::SignedOut { subject_id: None });
        }
        removed
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine
        let _ = self.event_bus.emit(CoreEvent::Auth(event));
    }
}
