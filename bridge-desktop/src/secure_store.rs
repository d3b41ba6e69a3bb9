//! Secure Credential Storage using OS Keychain

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use keyring::Entry;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Entry holding the JSON list of keys written through this store.
const INDEX_KEY: &str = "__dbx_key_index__";

/// Keyring-based secure storage implementation
///
/// Uses platform-specific secure storage:
/// - macOS: Keychain
/// - Windows: Credential Manager
/// - Linux: kernel keyutils
///
/// Keyring backends cannot enumerate entries, so the store keeps its own
/// index entry next to the secrets. All entries live under one service name,
/// which scopes them to the host application.
pub struct KeyringSecureStore {
    service_name: String,
    index_lock: Mutex<()>,
}

impl KeyringSecureStore {
    /// Create a new secure store with default service name
    pub fn new() -> Self {
        Self::with_service_name("dbx-core")
    }

    /// Create a new secure store with custom service name
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            index_lock: Mutex::new(()),
        }
    }

    fn get_entry(&self, key: &str) -> std::result::Result<Entry, keyring::Error> {
        Entry::new(&self.service_name, key)
    }

    fn map_keyring_error(e: keyring::Error) -> BridgeError {
        match e {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                BridgeError::NotAvailable(format!("Keyring backend unavailable: {}", e))
            }
            other => BridgeError::OperationFailed(format!("Keyring error: {}", other)),
        }
    }

    fn read_index(&self) -> Result<Vec<String>> {
        let entry = self.get_entry(INDEX_KEY).map_err(Self::map_keyring_error)?;
        match entry.get_password() {
            Ok(json) => serde_json::from_str(&json).map_err(|e| {
                error!(error = %e, "Keyring index is corrupted");
                BridgeError::OperationFailed(format!("Corrupted keyring index: {}", e))
            }),
            Err(keyring::Error::NoEntry) => Ok(Vec::new()),
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    fn write_index(&self, keys: &[String]) -> Result<()> {
        let entry = self.get_entry(INDEX_KEY).map_err(Self::map_keyring_error)?;
        if keys.is_empty() {
            return match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(Self::map_keyring_error(e)),
            };
        }
        let json = serde_json::to_string(keys)
            .map_err(|e| BridgeError::OperationFailed(format!("Index encoding failed: {}", e)))?;
        entry.set_password(&json).map_err(Self::map_keyring_error)
    }

    fn delete_entry(&self, key: &str) -> Result<()> {
        let entry = self.get_entry(key).map_err(Self::map_keyring_error)?;
        match entry.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => {
                debug!(key = key, "Secret not found (already deleted)");
                Ok(())
            }
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }
}

impl Default for KeyringSecureStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        if key == INDEX_KEY {
            return Err(BridgeError::OperationFailed(format!(
                "Key '{}' is reserved",
                INDEX_KEY
            )));
        }

        // Keyring only supports strings, so binary data is base64 encoded
        let encoded = STANDARD.encode(value);

        let _guard = self.index_lock.lock().await;
        let entry = self.get_entry(key).map_err(Self::map_keyring_error)?;
        entry
            .set_password(&encoded)
            .map_err(Self::map_keyring_error)?;

        let mut index = self.read_index()?;
        if !index.iter().any(|k| k == key) {
            index.push(key.to_string());
            self.write_index(&index)?;
        }

        debug!(key = key, "Stored secret in keyring");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entry = self.get_entry(key).map_err(Self::map_keyring_error)?;

        match entry.get_password() {
            Ok(encoded) => {
                let decoded = STANDARD.decode(encoded.as_bytes()).map_err(|e| {
                    error!(key = key, error = %e, "Failed to decode secret");
                    BridgeError::OperationFailed(format!("Failed to decode secret: {}", e))
                })?;
                Ok(Some(decoded))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        let _guard = self.index_lock.lock().await;
        self.delete_entry(key)?;

        let mut index = self.read_index()?;
        let before = index.len();
        index.retain(|k| k != key);
        if index.len() != before {
            self.write_index(&index)?;
        }

        debug!(key = key, "Deleted secret from keyring");
        Ok(())
    }

    async fn has_secret(&self, key: &str) -> Result<bool> {
        let entry = self.get_entry(key).map_err(Self::map_keyring_error)?;

        match entry.get_password() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(Self::map_keyring_error(e)),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let _guard = self.index_lock.lock().await;
        self.read_index()
    }

    async fn clear_all(&self) -> Result<()> {
        let _guard = self.index_lock.lock().await;
        let index = self.read_index()?;

        let mut remaining = Vec::new();
        for key in index {
            if let Err(e) = self.delete_entry(&key) {
                warn!(key = %key, error = %e, "Failed to delete secret during clear");
                remaining.push(key);
            }
        }
        self.write_index(&remaining)?;

        if remaining.is_empty() {
            Ok(())
        } else {
            Err(BridgeError::OperationFailed(format!(
                "{} secrets could not be deleted",
                remaining.len()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_store_creation() {
        let store = KeyringSecureStore::new();
        assert_eq!(store.service_name, "dbx-core");
    }

    #[test]
    fn test_custom_service_name() {
        let store = KeyringSecureStore::with_service_name("db-app-key");
        assert_eq!(store.service_name, "db-app-key");
    }

    #[tokio::test]
    async fn test_reserved_key_rejected() {
        let store = KeyringSecureStore::with_service_name("test-dbx-core");
        let result = store.set_secret(INDEX_KEY, b"value").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_set_list_and_delete_secret() {
        let store = KeyringSecureStore::with_service_name("test-dbx-core-index");
        let key = "dbid:test-subject-123";

        match store.set_secret(key, b"token-value").await {
            Ok(()) => {}
            Err(BridgeError::NotAvailable(reason)) => {
                // Headless CI machines may have no keyring at all
                println!("Keyring not available ({}), skipping test", reason);
                return;
            }
            Err(e) => panic!("set_secret failed: {}", e),
        }

        // A fresh store instance must see what the first one wrote
        let reader = KeyringSecureStore::with_service_name("test-dbx-core-index");
        assert_eq!(
            reader.get_secret(key).await.unwrap(),
            Some(b"token-value".to_vec())
        );
        assert!(reader.has_secret(key).await.unwrap());
        assert!(reader.list_keys().await.unwrap().contains(&key.to_string()));

        store.delete_secret(key).await.unwrap();
        assert_eq!(reader.get_secret(key).await.unwrap(), None);
        assert!(!reader.list_keys().await.unwrap().contains(&key.to_string()));
    }

    #[test]
    fn test_unavailable_backend_maps_to_not_available() {
        let err = KeyringSecureStore::map_keyring_error(keyring::Error::NoStorageAccess(
            "locked".into(),
        ));
        assert!(matches!(err, BridgeError::NotAvailable(_)));

        let err = KeyringSecureStore::map_keyring_error(keyring::Error::NoEntry);
        assert!(matches!(err, BridgeError::OperationFailed(_)));
    }
}
