//! Shared session state
//!
//! [`SessionHandle`] is the single owner of the in-memory session. It is
//! cloned into the [`ApiClient`](crate::api::ApiClient), which needs the token
//! for every request and tears the session down on 401, and into the
//! [`SessionManager`](crate::manager::SessionManager), which drives login and
//! logout. Only session operations write through it.

use crate::error::Result;
use crate::session_store::SessionStore;
use crate::types::{AuthStatus, Session, User};
use bridge_traits::storage::SecureStore;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, SignOutReason};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<RwLock<Option<Session>>>,
    store: SessionStore,
    event_bus: EventBus,
    login_path: Arc<str>,
}

impl SessionHandle {
    pub fn new(
        secure_store: Arc<dyn SecureStore>,
        event_bus: EventBus,
        login_path: impl Into<String>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(None)),
            store: SessionStore::new(secure_store),
            event_bus,
            login_path: Arc::from(login_path.into()),
        }
    }

    pub async fn snapshot(&self) -> Option<Session> {
        self.state.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.state.read().await.as_ref().map(|s| s.token.clone())
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state
            .read()
            .await
            .as_ref()
            .and_then(|s| s.user.clone())
    }

    pub async fn status(&self) -> AuthStatus {
        self.state
            .read()
            .await
            .as_ref()
            .map_or(AuthStatus::LoggedOut, Session::status)
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    /// Persist `token` and `user`, then publish them as a confirmed session.
    /// Memory is only touched once storage succeeded.
    pub(crate) async fn establish(&self, token: String, user: User) -> Result<()> {
        self.store.save(&token, &user).await?;

        *self.state.write().await = Some(Session {
            token,
            user: Some(user),
            confirmed: true,
        });
        Ok(())
    }

    /// Load a restored session without server confirmation.
    pub(crate) async fn adopt_unconfirmed(&self, token: String, user: Option<User>) {
        *self.state.write().await = Some(Session {
            token,
            user,
            confirmed: false,
        });
    }

    /// Replace the user record wholesale. `confirm` marks the token as
    /// accepted by the server.
    ///
    /// Returns `false` if the session vanished meanwhile (e.g. a concurrent
    /// 401); nothing is written in that case.
    pub(crate) async fn replace_user(&self, user: User, confirm: bool) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(session) = state.as_mut() else {
            return Ok(false);
        };

        self.store.save_user(&user).await?;
        session.user = Some(user);
        session.confirmed |= confirm;
        Ok(true)
    }

    /// Tear the session down.
    ///
    /// Clears the persisted token and user, resets memory, then emits
    /// `SignedOut { reason }` followed by `RedirectToLogin`. Storage failures
    /// are logged, never returned. Safe to call without a session.
    #[instrument(skip(self))]
    pub async fn force_logout(&self, reason: SignOutReason) {
        let previous = self.state.write().await.take();

        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "Failed to clear persisted session");
        }

        info!(
            had_session = previous.is_some(),
            reason = %reason,
            "Session cleared"
        );

        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::SignedOut { reason }));
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::RedirectToLogin {
                path: self.login_path.to_string(),
            }));
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("login_path", &self.login_path)
            .finish_non_exhaustive()
    }
}
