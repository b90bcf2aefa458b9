//! # Session Manager
//!
//! Drives the session lifecycle against the Audtream REST API.
//!
//! ## Overview
//!
//! - `login` / `register` exchange credentials for a bearer token, fetch
//!   `/users/me` with it and persist both together
//! - `refresh_current_user` re-validates the token; any failure logs out
//! - `logout` clears everything and asks the host to show the login screen
//! - `restore` loads a persisted session at startup and confirms it
//!
//! Nothing is persisted until the user record has been fetched, so a failed
//! login never leaves a dangling token behind.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{ApiClient, SessionHandle, SessionManager};
//! use core_runtime::events::EventBus;
//! use std::sync::Arc;
//! # use bridge_traits::{http::HttpClient, SecureStore};
//! # async fn example(
//! #     http_client: Arc<dyn HttpClient>,
//! #     secure_store: Arc<dyn SecureStore>,
//! # ) -> core_auth::Result<()> {
//! let event_bus = EventBus::new(100);
//! let session = SessionHandle::new(secure_store, event_bus.clone(), "/login");
//! let api = ApiClient::new(http_client, "http://localhost:8080/api", session);
//! let manager = SessionManager::new(api);
//!
//! let user = manager.login("ana", "correct horse").await?;
//! println!("Signed in as {} ({})", user.username, user.role);
//!
//! manager.logout().await;
//! # Ok(())
//! # }
//! ```

use crate::api::ApiClient;
use crate::error::{ApiError, AuthError, Result};
use crate::profile::ProfileDraft;
use crate::session::SessionHandle;
use crate::types::{AuthStatus, LoginRequest, RegisterRequest, Role, TokenResponse, User};
use crate::validation::{validate_login, validate_registration, RegistrationForm};
use bridge_traits::http::HttpMethod;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, SignOutReason};
use core_runtime::logging::redact_if_sensitive;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

const LOGIN_FALLBACK: &str = "Login failed";
const REGISTER_FALLBACK: &str = "Registration failed";

/// Owns the session lifecycle.
///
/// Cheap to clone; all clones share one [`SessionHandle`].
#[derive(Clone, Debug)]
pub struct SessionManager {
    api: ApiClient,
    session: SessionHandle,
    event_bus: EventBus,
}

impl SessionManager {
    /// Creates a manager that shares the API client's session.
    pub fn new(api: ApiClient) -> Self {
        let session = api.session().clone();
        let event_bus = session.event_bus().clone();
        Self {
            api,
            session,
            event_bus,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.current_user().await
    }

    pub async fn token(&self) -> Option<String> {
        self.session.token().await
    }

    pub async fn status(&self) -> AuthStatus {
        self.session.status().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.status().await.is_authenticated()
    }

    /// Sign in with username and password.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if a field is empty (no request is sent)
    /// - `Rejected` with the server's message, or `"Login failed"`
    /// - `SecureStorageUnavailable` if the session could not be persisted
    #[instrument(skip(self, password), fields(username = %username))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        validate_login(username, password)?;

        let request = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        self.authenticate("/auth/login", &request, LOGIN_FALLBACK)
            .await
    }

    /// Create an account and sign in with it.
    ///
    /// Same contract as [`login`](Self::login), with the fallback message
    /// `"Registration failed"`.
    #[instrument(
        skip(self, email, password),
        fields(username = %username, email = %redact_if_sensitive("email", email), role = %role)
    )]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User> {
        validate_registration(username, email, password)?;

        let request = RegisterRequest {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
            role,
        };
        self.authenticate("/auth/register", &request, REGISTER_FALLBACK)
            .await
    }

    /// [`register`](Self::register) from a sign-up form, checking the
    /// password confirmation first.
    pub async fn register_form(&self, form: &RegistrationForm) -> Result<User> {
        form.validate()?;
        self.register(&form.username, &form.email, &form.password, form.role)
            .await
    }

    /// Re-fetch `/users/me` with the stored token.
    ///
    /// On success the user record is replaced wholesale and the session is
    /// confirmed. Any failure ends the session.
    #[instrument(skip(self))]
    pub async fn refresh_current_user(&self) -> Result<User> {
        let Some(token) = self.session.token().await else {
            debug!("No token held, nothing to refresh");
            self.logout().await;
            return Err(AuthError::NotAuthenticated);
        };

        let user = match self.fetch_me(&token).await {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Failed to refresh current user");
                // A 401 has already torn the session down.
                if !e.is_unauthorized() {
                    self.session
                        .force_logout(SignOutReason::SessionExpired)
                        .await;
                }
                return Err(e.into());
            }
        };

        match self.session.replace_user(user.clone(), true).await {
            Ok(true) => {
                info!(username = %user.username, "Current user refreshed");
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Auth(AuthEvent::ProfileRefreshed {
                        username: user.username.clone(),
                    }));
                Ok(user)
            }
            Ok(false) => Err(AuthError::NotAuthenticated),
            Err(e) => {
                error!(error = %e, "Failed to persist refreshed user");
                self.session
                    .force_logout(SignOutReason::SessionExpired)
                    .await;
                Err(e)
            }
        }
    }

    /// End the session. Idempotent; storage failures are only logged.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        info!("Logging out");
        self.session.force_logout(SignOutReason::UserRequested).await;
    }

    /// Load the persisted session at startup and confirm it with the server.
    ///
    /// Returns the resulting status: `Confirmed` when the token is still
    /// accepted, `LoggedOut` when nothing was stored or the refresh failed.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<AuthStatus> {
        let Some(persisted) = self.session.store().load().await? else {
            debug!("No persisted session");
            return Ok(AuthStatus::LoggedOut);
        };

        let username = persisted.user.as_ref().map(|u| u.username.clone());
        info!(has_user = username.is_some(), "Restoring persisted session");

        self.session
            .adopt_unconfirmed(persisted.token, persisted.user)
            .await;
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::SessionRestored { username }));

        match self.refresh_current_user().await {
            Ok(_) => Ok(AuthStatus::Confirmed),
            Err(e) => {
                info!(error = %e, "Restored session was not accepted");
                Ok(AuthStatus::LoggedOut)
            }
        }
    }

    /// Apply a validated profile draft to the cached user and persist it.
    ///
    /// The server has no profile endpoint, so the change stays local.
    #[instrument(skip(self, draft))]
    pub async fn update_profile(&self, draft: &ProfileDraft) -> Result<User> {
        let current = self
            .session
            .current_user()
            .await
            .ok_or(AuthError::NotAuthenticated)?;

        draft.validate()?;
        let updated = draft.apply_to(&current);

        if !self.session.replace_user(updated.clone(), false).await? {
            return Err(AuthError::NotAuthenticated);
        }

        info!(username = %updated.username, "Profile updated locally");
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::ProfileRefreshed {
                username: updated.username.clone(),
            }));
        Ok(updated)
    }

    async fn authenticate<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<User> {
        let (token, user) = match self.exchange(path, body).await {
            Ok(pair) => pair,
            Err(e) => {
                let message = e.message_or(fallback);
                warn!(error = %e, "Authentication rejected");
                let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::AuthError {
                    message: message.clone(),
                    recoverable: true,
                }));
                return Err(AuthError::Rejected { message });
            }
        };

        self.session
            .establish(token, user.clone())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to persist session");
                let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::AuthError {
                    message: format!("Failed to store credentials: {}", e),
                    recoverable: false,
                }));
                e
            })?;

        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::SignedIn {
            username: user.username.clone(),
            role: user.role.to_string(),
        }));

        info!(username = %user.username, role = %user.role, "Signed in");
        Ok(user)
    }

    /// Credentials for token, then token for user record.
    async fn exchange<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<(String, User), ApiError> {
        let TokenResponse { token } = self.api.post_json_anonymous(path, body).await?;
        if token.trim().is_empty() {
            return Err(ApiError::InvalidResponse(
                "Server returned an empty token".to_string(),
            ));
        }

        let user = self.fetch_me(&token).await?;
        Ok((token, user))
    }

    async fn fetch_me(&self, token: &str) -> std::result::Result<User, ApiError> {
        let request = self
            .api
            .request(HttpMethod::Get, "/users/me")
            .bearer_token(token);
        let response = self.api.send(request).await?;
        crate::api::decode(&response)
    }
}
