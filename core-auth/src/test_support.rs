//! In-memory bridge fakes shared by the unit tests.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::host::{AppHost, AuthPresenter, RedirectInterceptor};
use bridge_traits::storage::SecureStore;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemorySecureStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    failing: AtomicBool,
}

impl MemorySecureStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail.
    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn check(&self) -> BridgeResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(BridgeError::OperationFailed("keychain locked".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SecureStore for MemorySecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
        self.check()?;
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
        self.check()?;
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
        self.check()?;
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        self.check()?;
        Ok(self.entries.lock().unwrap().keys().cloned().collect())
    }

    async fn clear_all(&self) -> BridgeResult<()> {
        self.check()?;
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

pub struct FakeAppHost {
    pub declared: Vec<String>,
    pub queryable: Vec<String>,
    pub installed: Vec<String>,
    pub open_result: bool,
    pub opened: Mutex<Vec<String>>,
}

impl FakeAppHost {
    /// Host correctly configured for app key `abc123` with no companion app.
    pub fn configured() -> Self {
        Self {
            declared: vec!["db-abc123".to_string()],
            queryable: vec!["dbapi-2".to_string(), "dbapi-8-emm".to_string()],
            installed: Vec::new(),
            open_result: true,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn with_installed(mut self, scheme: &str) -> Self {
        self.installed.push(scheme.to_string());
        self
    }

    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppHost for FakeAppHost {
    fn declared_url_schemes(&self) -> Vec<String> {
        self.declared.clone()
    }

    fn queryable_url_schemes(&self) -> Vec<String> {
        self.queryable.clone()
    }

    async fn can_open_url(&self, url: &str) -> bool {
        self.installed
            .iter()
            .any(|scheme| url.starts_with(&format!("{}://", scheme)))
    }

    async fn open_url(&self, url: &str) -> BridgeResult<bool> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(self.open_result)
    }
}

/// Presenter that "navigates" through a scripted list of URLs and returns
/// the first one the interceptor accepts.
pub struct ScriptedPresenter {
    pub navigations: Vec<String>,
    pub retry_answers: Mutex<VecDeque<bool>>,
    pub presented: Mutex<Vec<String>>,
    pub retry_prompts: Mutex<usize>,
}

impl ScriptedPresenter {
    pub fn navigating(navigations: &[&str]) -> Self {
        Self {
            navigations: navigations.iter().map(|s| s.to_string()).collect(),
            retry_answers: Mutex::new(VecDeque::new()),
            presented: Mutex::new(Vec::new()),
            retry_prompts: Mutex::new(0),
        }
    }

    pub fn with_retry_answers(self, answers: &[bool]) -> Self {
        *self.retry_answers.lock().unwrap() = answers.iter().copied().collect();
        self
    }

    pub fn presented(&self) -> Vec<String> {
        self.presented.lock().unwrap().clone()
    }

    pub fn retry_prompts(&self) -> usize {
        *self.retry_prompts.lock().unwrap()
    }
}

#[async_trait]
impl AuthPresenter for ScriptedPresenter {
    async fn present_web_auth(
        &self,
        url: &str,
        interceptor: RedirectInterceptor,
    ) -> BridgeResult<Option<String>> {
        self.presented.lock().unwrap().push(url.to_string());
        Ok(self
            .navigations
            .iter()
            .find(|candidate| interceptor(candidate.as_str()))
            .cloned())
    }

    async fn offer_retry(&self, _title: &str, _message: &str) -> bool {
        *self.retry_prompts.lock().unwrap() += 1;
        self.retry_answers.lock().unwrap().pop_front().unwrap_or(false)
    }
}
