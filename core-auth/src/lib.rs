//! # Session Module
//!
//! Bearer-token session management for the Audtream REST API.
//!
//! ## Overview
//!
//! This crate owns everything tied to "who is signed in": the token and the
//! cached user record, their persistence in the platform secure store, and
//! the one HTTP path every other crate uses to talk to the API. Because the
//! API client shares the [`SessionHandle`], any 401 from any endpoint ends
//! the session in one place.
//!
//! ## Features
//!
//! - Login, registration, logout and startup restore
//! - Central forced logout on 401 with `RedirectToLogin` events
//! - Lenient decoding of server records (see [`wire`])
//! - Local profile editing and form validation

pub mod api;
pub mod error;
pub mod manager;
pub mod profile;
pub mod session;
pub mod session_store;
pub mod types;
pub mod users;
pub mod validation;
pub mod wire;

pub use api::ApiClient;
pub use error::{ApiError, ApiResult, AuthError, Result, SESSION_EXPIRED_MESSAGE};
pub use manager::SessionManager;
pub use profile::{ProfileDraft, SocialPlatform};
pub use session::SessionHandle;
pub use session_store::{PersistedSession, SessionStore};
pub use types::{AuthStatus, Role, Session, SocialLinks, User};
pub use validation::RegistrationForm;
