//! In-memory credential store for testing.
//!
//! Stores credentials in memory, suitable for testing without file system
//! access.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::traits::{CredentialKey, CredentialStore, StoreError};

/// In-memory credential store for testing.
///
/// Clones share the same storage, so a test can keep a handle and inspect
/// what the code under test wrote.
///
/// # Example
///
/// ```ignore
/// use geoarchive::adapters::mock::InMemoryCredentialStore;
/// use geoarchive::traits::{CredentialKey, CredentialStore};
///
/// let store = InMemoryCredentialStore::new();
/// store.set(CredentialKey::AccessToken, "a1").await?;
/// assert_eq!(store.value(CredentialKey::AccessToken).as_deref(), Some("a1"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    /// Stored values
    values: Arc<Mutex<HashMap<CredentialKey, String>>>,
    /// Whether reads should fail
    read_should_fail: Arc<Mutex<bool>>,
    /// Whether set/delete should fail
    write_should_fail: Arc<Mutex<bool>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding an access/refresh pair.
    pub fn with_tokens(access_token: &str, refresh_token: &str) -> Self {
        let store = Self::new();
        store.insert(CredentialKey::AccessToken, access_token);
        store.insert(CredentialKey::RefreshToken, refresh_token);
        store
    }

    /// Configure whether reads should fail.
    pub fn set_read_should_fail(&self, should_fail: bool) {
        *self.read_should_fail.lock().unwrap() = should_fail;
    }

    /// Configure whether writes should fail.
    pub fn set_write_should_fail(&self, should_fail: bool) {
        *self.write_should_fail.lock().unwrap() = should_fail;
    }

    /// Set a value synchronously (for testing).
    pub fn insert(&self, key: CredentialKey, value: &str) {
        self.values.lock().unwrap().insert(key, value.to_string());
    }

    /// Read a value synchronously (for testing).
    pub fn value(&self, key: CredentialKey) -> Option<String> {
        self.values.lock().unwrap().get(&key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError> {
        if *self.read_should_fail.lock().unwrap() {
            return Err(StoreError::ReadFailed("Mock read failure".to_string()));
        }
        Ok(self.value(key))
    }

    async fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        if *self.write_should_fail.lock().unwrap() {
            return Err(StoreError::WriteFailed("Mock write failure".to_string()));
        }
        self.insert(key, value);
        Ok(())
    }

    async fn delete(&self, key: CredentialKey) -> Result<(), StoreError> {
        if *self.write_should_fail.lock().unwrap() {
            return Err(StoreError::WriteFailed("Mock write failure".to_string()));
        }
        self.values.lock().unwrap().remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = InMemoryCredentialStore::new();
        assert_eq!(store.get(CredentialKey::AccessToken).await.unwrap(), None);

        store.set(CredentialKey::AccessToken, "a1").await.unwrap();
        assert_eq!(
            store.get(CredentialKey::AccessToken).await.unwrap().as_deref(),
            Some("a1")
        );

        store.delete(CredentialKey::AccessToken).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failures() {
        let store = InMemoryCredentialStore::with_tokens("a1", "r1");
        store.set_read_should_fail(true);
        store.set_write_should_fail(true);

        assert!(matches!(
            store.get(CredentialKey::AccessToken).await,
            Err(StoreError::ReadFailed(_))
        ));
        assert!(matches!(
            store.delete(CredentialKey::AccessToken).await,
            Err(StoreError::WriteFailed(_))
        ));
        assert_eq!(store.value(CredentialKey::RefreshToken).as_deref(), Some("r1"));
    }

    #[test]
    fn test_clones_share_storage() {
        let store = InMemoryCredentialStore::new();
        let cloned = store.clone();
        store.insert(CredentialKey::User, "{}");
        assert_eq!(cloned.value(CredentialKey::User).as_deref(), Some("{}"));
    }
}
