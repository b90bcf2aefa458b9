//! Persisted Session Storage
//!
//! Keeps the bearer token and the cached user record in the platform
//! [`SecureStore`] under two keys, `token` (UTF-8) and `user` (JSON). Both
//! are written and cleared together.
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{Role, SessionStore, User};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let store = SessionStore::new(secure_store);
//!
//! let user = User::new("1", "ana", "ana@example.com", Role::Listener);
//! store.save("opaque-token", &user).await?;
//!
//! if let Some(persisted) = store.load().await? {
//!     assert_eq!(persisted.token, "opaque-token");
//! }
//!
//! store.clear().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::User;
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Secure store key of the bearer token.
pub const TOKEN_KEY: &str = "token";

/// Secure store key of the serialized user record.
pub const USER_KEY: &str = "user";

/// What survived from a previous run.
#[derive(Clone, PartialEq, Eq)]
pub struct PersistedSession {
    pub token: String,
    /// `None` when the user record was missing or unreadable.
    pub user: Option<User>,
}

impl std::fmt::Debug for PersistedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedSession")
            .field("token", &"[REDACTED]")
            .field("user", &self.user)
            .finish()
    }
}

/// Token and user persistence on top of a [`SecureStore`].
///
/// Values are never logged. Corrupt entries are removed on read instead of
/// being reported as errors.
#[derive(Clone)]
pub struct SessionStore {
    secure_store: Arc<dyn SecureStore>,
}

impl SessionStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        debug!("Initializing SessionStore");
        Self { secure_store }
    }

    /// Persist a token and its user record.
    ///
    /// The user is serialized before anything is written, so a serialization
    /// failure leaves the store untouched. If the second write fails the
    /// token is removed again.
    pub async fn save(&self, token: &str, user: &User) -> Result<()> {
        let encoded = encode_user(user)?;

        self.secure_store
            .set_secret(TOKEN_KEY, token.as_bytes())
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store token in secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        if let Err(e) = self.secure_store.set_secret(USER_KEY, &encoded).await {
            warn!(error = %e, "Failed to store user record, rolling back token");
            let _ = self.secure_store.delete_secret(TOKEN_KEY).await;
            return Err(AuthError::SecureStorageUnavailable(e.to_string()));
        }

        info!(username = %user.username, "Session stored securely");
        Ok(())
    }

    /// Overwrite the user record of the persisted session.
    pub async fn save_user(&self, user: &User) -> Result<()> {
        let encoded = encode_user(user)?;

        self.secure_store
            .set_secret(USER_KEY, &encoded)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store user record in secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        debug!(username = %user.username, "User record updated");
        Ok(())
    }

    /// Read the persisted session.
    ///
    /// Returns `Ok(None)` when no token is stored. A user record without a
    /// token is stale and gets deleted. An unreadable user record is deleted
    /// and reported as `user: None`.
    pub async fn load(&self) -> Result<Option<PersistedSession>> {
        let token = self.read(TOKEN_KEY).await?;

        let token = match token {
            Some(raw) => match String::from_utf8(raw) {
                Ok(token) if !token.is_empty() => token,
                _ => {
                    warn!("Stored token is unreadable, clearing session");
                    self.clear().await?;
                    return Ok(None);
                }
            },
            None => {
                if self.read(USER_KEY).await?.is_some() {
                    warn!("Found user record without token, deleting it");
                    self.delete(USER_KEY).await?;
                }
                return Ok(None);
            }
        };

        let user = match self.read(USER_KEY).await? {
            Some(raw) => match serde_json::from_slice::<User>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Stored user record is corrupt, deleting it");
                    self.delete(USER_KEY).await?;
                    None
                }
            },
            None => None,
        };

        debug!(has_user = user.is_some(), "Loaded persisted session");
        Ok(Some(PersistedSession { token, user }))
    }

    /// Remove token and user. Both deletes are attempted; the first failure
    /// is returned.
    pub async fn clear(&self) -> Result<()> {
        let token = self.delete(TOKEN_KEY).await;
        let user = self.delete(USER_KEY).await;
        token.and(user)?;

        info!("Persisted session cleared");
        Ok(())
    }

    pub async fn has_session(&self) -> Result<bool> {
        self.secure_store
            .has_secret(TOKEN_KEY)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.secure_store.get_secret(key).await.map_err(|e| {
            warn!(key = key, error = %e, "Failed to read from secure storage");
            AuthError::SecureStorageUnavailable(e.to_string())
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.secure_store.delete_secret(key).await.map_err(|e| {
            warn!(key = key, error = %e, "Failed to delete from secure storage");
            AuthError::SecureStorageUnavailable(e.to_string())
        })
    }
}

fn encode_user(user: &User) -> Result<Vec<u8>> {
    serde_json::to_vec(user).map_err(|e| AuthError::Serialization(e.to_string()))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Role;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use std::collections::HashMap;
    use tokio::sync::Mutex as TokioMutex;

    /// In-memory secure store shared by the crate's tests.
    #[derive(Default)]
    pub(crate) struct MockSecureStore {
        pub(crate) storage: Arc<TokioMutex<HashMap<String, Vec<u8>>>>,
        pub(crate) fail_writes: bool,
    }

    impl MockSecureStore {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn failing_writes() -> Self {
            Self {
                fail_writes: true,
                ..Self::default()
            }
        }

        pub(crate) async fn insert(&self, key: &str, value: &[u8]) {
            self.storage
                .lock()
                .await
                .insert(key.to_string(), value.to_vec());
        }

        pub(crate) async fn contains(&self, key: &str) -> bool {
            self.storage.lock().await.contains_key(key)
        }
    }

    #[async_trait::async_trait]
    impl SecureStore for MockSecureStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            if self.fail_writes {
                return Err(BridgeError::OperationFailed("keychain locked".to_string()));
            }
            let mut storage = self.storage.lock().await;
            storage.insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            let storage = self.storage.lock().await;
            Ok(storage.get(key).cloned())
        }

        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            let mut storage = self.storage.lock().await;
            storage.remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            let storage = self.storage.lock().await;
            Ok(storage.keys().cloned().collect())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            let mut storage = self.storage.lock().await;
            storage.clear();
            Ok(())
        }
    }

    fn ana() -> User {
        User::new("1", "ana", "ana@example.com", Role::Artist)
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let secure = Arc::new(MockSecureStore::new());
        let store = SessionStore::new(secure.clone());

        store.save("tok-1", &ana()).await.unwrap();
        assert!(store.has_session().await.unwrap());

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.token, "tok-1");
        assert_eq!(loaded.user, Some(ana()));
        assert_eq!(
            secure.storage.lock().await.get(TOKEN_KEY).cloned(),
            Some(b"tok-1".to_vec())
        );
    }

    #[tokio::test]
    async fn test_load_empty() {
        let store = SessionStore::new(Arc::new(MockSecureStore::new()));
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_user_is_deleted() {
        let secure = Arc::new(MockSecureStore::new());
        secure.insert(TOKEN_KEY, b"tok-1").await;
        secure.insert(USER_KEY, b"{not json").await;

        let store = SessionStore::new(secure.clone());
        let loaded = store.load().await.unwrap().unwrap();

        assert_eq!(loaded.token, "tok-1");
        assert!(loaded.user.is_none());
        assert!(!secure.contains(USER_KEY).await);
        assert!(secure.contains(TOKEN_KEY).await);
    }

    #[tokio::test]
    async fn test_user_without_token_is_deleted() {
        let secure = Arc::new(MockSecureStore::new());
        secure
            .insert(USER_KEY, &serde_json::to_vec(&ana()).unwrap())
            .await;

        let store = SessionStore::new(secure.clone());
        assert!(store.load().await.unwrap().is_none());
        assert!(!secure.contains(USER_KEY).await);
    }

    #[tokio::test]
    async fn test_clear_removes_both_keys() {
        let secure = Arc::new(MockSecureStore::new());
        let store = SessionStore::new(secure.clone());

        store.save("tok-1", &ana()).await.unwrap();
        store.clear().await.unwrap();

        assert!(secure.storage.lock().await.is_empty());
        // Idempotent
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_save_failure_is_reported() {
        let store = SessionStore::new(Arc::new(MockSecureStore::failing_writes()));
        let err = store.save("tok-1", &ana()).await.unwrap_err();
        assert!(matches!(err, AuthError::SecureStorageUnavailable(_)));
    }
}
