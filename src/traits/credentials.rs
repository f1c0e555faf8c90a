//! Credential store trait abstraction.
//!
//! Durable key/value storage for the session's credential material. The
//! store must survive process restarts; the coordinator mirrors every
//! credential pair change into it.

use async_trait::async_trait;
use thiserror::Error;

/// Keys held by a [`CredentialStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    /// Short-lived bearer token.
    AccessToken,
    /// Longer-lived token used only to obtain a new pair.
    RefreshToken,
    /// JSON-encoded profile of the signed-in user.
    User,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 3] = [
        CredentialKey::AccessToken,
        CredentialKey::RefreshToken,
        CredentialKey::User,
    ];

    /// Stable storage name of the key.
    pub fn as_str(&self) -> &'static str {
        match self {
            CredentialKey::AccessToken => "access_token",
            CredentialKey::RefreshToken => "refresh_token",
            CredentialKey::User => "user",
        }
    }
}

/// Credential store errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Failed to read credentials: {0}")]
    ReadFailed(String),

    #[error("Failed to write credentials: {0}")]
    WriteFailed(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Trait for durable credential storage.
///
/// Implementations include the JSON file store used in production and an
/// in-memory store for tests.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Read a value. `Ok(None)` if the key is not set.
    async fn get(&self, key: CredentialKey) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError>;

    /// Remove a value. Removing an absent key is not an error.
    async fn delete(&self, key: CredentialKey) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        assert_eq!(
            StoreError::ReadFailed("permission denied".to_string()).to_string(),
            "Failed to read credentials: permission denied"
        );
        assert_eq!(
            StoreError::WriteFailed("disk full".to_string()).to_string(),
            "Failed to write credentials: disk full"
        );
        assert_eq!(
            StoreError::Serialization("invalid json".to_string()).to_string(),
            "Serialization error: invalid json"
        );
    }

    #[test]
    fn test_key_names_are_distinct() {
        let names: std::collections::HashSet<_> =
            CredentialKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), CredentialKey::ALL.len());
    }
}
