//! Core service façade.
//!
//! [`ClientsManager`] wires a validated [`SdkConfig`] into the authorization
//! manager and keeps at most one authorized [`TransportClient`]. Desktop
//! apps typically enable the `desktop-shims` feature so the config builder
//! falls back to the `bridge-desktop` adapters; mobile hosts inject their
//! own bridge implementations.
//!
//! ```ignore
//! use core_service::ClientsManager;
//! use core_runtime::SdkConfig;
//!
//! let config = SdkConfig::builder().app_key("abc123").build()?;
//! let clients = ClientsManager::setup(config).await?;
//!
//! if clients.authorized_client().await.is_none() {
//!     clients.authorize(&presenter).await?;
//! }
//! ```

pub mod error;

pub use error::{CoreError, Result};

use core_auth::{
    AuthConfig, AuthFlow, AuthorizationManager, AuthorizationOutcome, Credential, CredentialStore,
};
use core_runtime::config::SdkConfig;
use core_runtime::events::{CoreEvent, EventBus};
use core_transport::TransportClient;
use bridge_traits::host::AuthPresenter;
use std::sync::Arc;
use tokio::sync::broadcast::Receiver;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Owns the authorization flow and the authorized client built from it.
pub struct ClientsManager {
    config: Arc<SdkConfig>,
    auth: AuthorizationManager,
    event_bus: EventBus,
    authorized: RwLock<Option<TransportClient>>,
}

impl ClientsManager {
    /// Build the manager. When a credential is already stored, an authorized
    /// client is created from it right away.
    pub async fn setup(config: SdkConfig) -> Result<Self> {
        Self::setup_with_event_bus(config, EventBus::default()).await
    }

    #[instrument(skip_all)]
    pub async fn setup_with_event_bus(config: SdkConfig, event_bus: EventBus) -> Result<Self> {
        config.validate()?;

        let auth = AuthorizationManager::new(
            AuthConfig::from_sdk(&config),
            CredentialStore::new(Arc::clone(&config.secure_store)),
            Arc::clone(&config.app_host),
            Arc::clone(&config.network_monitor),
            event_bus.clone(),
        );

        let config = Arc::new(config);
        let restored = auth.any_credential().await;
        if let Some(credential) = &restored {
            info!(subject_id = %credential.subject_id(), "Restored stored credential");
        }

        let manager = Self {
            authorized: RwLock::new(restored.map(|c| TransportClient::from_config(&config, Some(c)))),
            config,
            auth,
            event_bus,
        };
        Ok(manager)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    pub fn authorization(&self) -> &AuthorizationManager {
        &self.auth
    }

    /// Start linking an account.
    ///
    /// Fails with [`CoreError::AlreadyAuthorized`] while an authorized client
    /// exists. A browser flow that succeeds installs the client immediately;
    /// a native handoff installs it once the redirect arrives through
    /// [`handle_redirect_url`](Self::handle_redirect_url).
    #[instrument(skip(self, presenter))]
    pub async fn authorize(&self, presenter: &dyn AuthPresenter) -> Result<AuthFlow> {
        if self.authorized.read().await.is_some() {
            warn!("Authorization requested while already authorized");
            return Err(CoreError::AlreadyAuthorized);
        }

        let flow = self.auth.begin_authorization(presenter).await?;
        if let AuthFlow::Completed(AuthorizationOutcome::Success(credential)) = &flow {
            self.install(credential.clone()).await;
        }
        Ok(flow)
    }

    /// Complete a flow from a URL delivered to the application.
    ///
    /// Returns `Ok(None)` when the URL is not an authorization redirect.
    #[instrument(skip(self, url))]
    pub async fn handle_redirect_url(&self, url: &str) -> Result<Option<AuthorizationOutcome>> {
        let outcome = self.auth.complete_redirect(url).await?;
        if let Some(AuthorizationOutcome::Success(credential)) = &outcome {
            self.install(credential.clone()).await;
        }
        Ok(outcome)
    }

    pub async fn authorized_client(&self) -> Option<TransportClient> {
        self.authorized.read().await.clone()
    }

    /// Switch the authorized client to the stored credential of `subject_id`.
    pub async fn reauthorize(&self, subject_id: &str) -> bool {
        match self.auth.credential(subject_id).await {
            Some(credential) => {
                self.install(credential).await;
                true
            }
            None => {
                warn!(subject_id = %subject_id, "No stored credential to reauthorize with");
                false
            }
        }
    }

    /// Forget every stored credential and drop the authorized client.
    #[instrument(skip(self))]
    pub async fn unlink_clients(&self) {
        if !self.auth.clear_all_credentials().await {
            warn!("Stored credentials could not all be removed");
        }
        self.auth.cancel_authorization().await;
        self.authorized.write().await.take();
        info!("All clients unlinked");
    }

    async fn install(&self, credential: Credential) {
        info!(subject_id = %credential.subject_id(), "Authorized client installed");
        let client = TransportClient::from_config(&self.config, Some(credential));
        *self.authorized.write().await = Some(client);
    }
}
