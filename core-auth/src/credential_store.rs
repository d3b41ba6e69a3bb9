//! Credential Store
//!
//! Persists one access token per account identifier in the host's
//! [`SecureStore`]. The backing store is expected to be scoped to the host
//! application (keychain access group, keyring service name).
//!
//! Failures of the backing store never propagate as errors: they are logged
//! without the secret and reported as `false`, `None` or an empty list, so
//! callers can treat "not stored" and "storage unavailable" uniformly.
//!
//! ```no_run
//! use core_auth::CredentialStore;
//! # use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) {
//! let store = CredentialStore::new(secure_store);
//!
//! assert!(store.set("dbid:123", "sl.token").await);
//! assert_eq!(store.get("dbid:123").await.as_deref(), Some("sl.token"));
//! assert!(store.delete("dbid:123").await);
//! # }
//! ```

use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Secure persistence of access tokens keyed by subject id.
///
/// Mutations are serialized by an internal write lock, so the store can be
/// shared between tasks without external synchronization.
#[derive(Clone)]
pub struct CredentialStore {
    secure_store: Arc<dyn SecureStore>,
    write_lock: Arc<Mutex<()>>,
}

impl CredentialStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        debug!("Initializing CredentialStore");
        Self {
            secure_store,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Store `secret` for `id`, replacing any previous value.
    ///
    /// The existing entry is deleted before the new one is inserted.
    pub async fn set(&self, id: &str, secret: &str) -> bool {
        let _guard = self.write_lock.lock().await;

        if let Err(e) = self.secure_store.delete_secret(id).await {
            warn!(subject_id = %id, error = %e, "Failed to remove previous credential");
            return false;
        }

        match self.secure_store.set_secret(id, secret.as_bytes()).await {
            Ok(()) => {
                info!(subject_id = %id, "Credential stored securely");
                true
            }
            Err(e) => {
                warn!(subject_id = %id, error = %e, "Failed to store credential");
                false
            }
        }
    }

    /// Retrieve the secret stored for `id`.
    pub async fn get(&self, id: &str) -> Option<String> {
        let data = match self.secure_store.get_secret(id).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                debug!(subject_id = %id, "No credential stored");
                return None;
            }
            Err(e) => {
                warn!(subject_id = %id, error = %e, "Failed to read credential");
                return None;
            }
        };

        match String::from_utf8(data) {
            Ok(secret) => Some(secret),
            Err(_) => {
                warn!(subject_id = %id, "Stored credential is not valid UTF-8");
                None
            }
        }
    }

    /// Delete the secret stored for `id`. Deleting a missing entry succeeds.
    pub async fn delete(&self, id: &str) -> bool {
        let _guard = self.write_lock.lock().await;

        match self.secure_store.delete_secret(id).await {
            Ok(()) => {
                info!(subject_id = %id, "Credential deleted");
                true
            }
            Err(e) => {
                warn!(subject_id = %id, error = %e, "Failed to delete credential");
                false
            }
        }
    }

    /// Delete every stored secret.
    pub async fn delete_all(&self) -> bool {
        let _guard = self.write_lock.lock().await;

        match self.secure_store.clear_all().await {
            Ok(()) => {
                info!("All credentials deleted");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to delete credentials");
                false
            }
        }
    }

    /// Identifiers with a stored secret, sorted.
    pub async fn list_ids(&self) -> Vec<String> {
        match self.secure_store.list_keys().await {
            Ok(mut ids) => {
                ids.sort();
                debug!(count = ids.len(), "Listed stored credentials");
                ids
            }
            Err(e) => {
                warn!(error = %e, "Failed to list credentials");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemorySecureStore;

    fn store() -> (Arc<MemorySecureStore>, CredentialStore) {
        let backing = Arc::new(MemorySecureStore::new());
        (backing.clone(), CredentialStore::new(backing))
    }

    #[tokio::test]
    async fn test_set_get_delete_round_trip() {
        let (_, store) = store();

        assert!(store.set("dbid:1", "token-one").await);
        assert_eq!(store.get("dbid:1").await.as_deref(), Some("token-one"));

        assert!(store.delete("dbid:1").await);
        assert_eq!(store.get("dbid:1").await, None);
    }

    #[tokio::test]
    async fn test_set_overwrites_previous_value() {
        let (backing, store) = store();

        assert!(store.set("dbid:1", "old").await);
        assert!(store.set("dbid:1", "new").await);

        assert_eq!(store.get("dbid:1").await.as_deref(), Some("new"));
        assert_eq!(backing.raw("dbid:1"), Some(b"new".to_vec()));
        assert_eq!(store.list_ids().await, vec!["dbid:1".to_string()]);
    }

    #[tokio::test]
    async fn test_delete_missing_entry_succeeds() {
        let (_, store) = store();
        assert!(store.delete("dbid:missing").await);
    }

    #[tokio::test]
    async fn test_list_ids_and_delete_all() {
        let (_, store) = store();

        assert!(store.set("dbid:b", "2").await);
        assert!(store.set("dbid:a", "1").await);
        assert_eq!(
            store.list_ids().await,
            vec!["dbid:a".to_string(), "dbid:b".to_string()]
        );

        assert!(store.delete_all().await);
        assert!(store.list_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_backing_failures_are_reported_not_raised() {
        let (backing, store) = store();
        assert!(store.set("dbid:1", "token").await);

        backing.fail();

        assert!(!store.set("dbid:2", "token").await);
        assert_eq!(store.get("dbid:1").await, None);
        assert!(!store.delete("dbid:1").await);
        assert!(!store.delete_all().await);
        assert!(store.list_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writers_leave_one_value() {
        let (_, store) = store();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.set("dbid:shared", &format!("token-{}", i)).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }

        let value = store.get("dbid:shared").await.unwrap();
        assert!(value.starts_with("token-"));
        assert_eq!(store.list_ids().await.len(), 1);
    }
}
