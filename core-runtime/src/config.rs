//! # Core Configuration Module
//!
//! Provides configuration management for the Audtream client core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all bridges and settings the core needs. It validates
//! eagerly so a misconfigured host fails at startup, not on the first request.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - REST calls to the Audtream API
//! - `SecureStore` - Persistence of the bearer token and user record
//! - `SettingsStore` - User preferences
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults
//! (`ReqwestHttpClient`, `KeyringSecureStore`, `JsonSettingsStore`) are
//! injected for any bridge that was not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://api.audtream.example/api")
//!     .http_client(Arc::new(MyHttpClient))
//!     .secure_store(Arc::new(MySecureStore))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .build()?;
//! ```
//!
//! ## Base URL resolution
//!
//! 1. The value passed to [`CoreConfigBuilder::api_base_url`]
//! 2. The `AUDTREAM_API_URL` environment variable
//! 3. [`DEFAULT_API_BASE_URL`]

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{HttpClient, SecureStore, SettingsStore};
use std::sync::Arc;
use std::time::Duration;

/// API root used when neither the builder nor the environment sets one.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Environment variable consulted for the API root.
pub const API_URL_ENV: &str = "AUDTREAM_API_URL";

/// Route the host navigates to after a forced or manual logout.
pub const DEFAULT_LOGIN_PATH: &str = "/login";

/// Name used for the keychain service and the settings directory.
pub const DEFAULT_APP_NAME: &str = "audtream";

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Core configuration for the Audtream client core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// API root without a trailing slash, e.g. `http://localhost:8080/api`
    pub api_base_url: String,

    /// Per-request timeout applied by the API client
    pub request_timeout: Duration,

    /// Route announced in `AuthEvent::RedirectToLogin`
    pub login_path: String,

    /// Keychain service / settings directory name
    pub app_name: String,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    pub http_client: Arc<dyn HttpClient>,

    pub secure_store: Arc<dyn SecureStore>,

    pub settings_store: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("login_path", &self.login_path)
            .field("app_name", &self.app_name)
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Join `path` onto the API root.
    ///
    /// ```ignore
    /// assert_eq!(config.endpoint("/tracks"), "http://localhost:8080/api/tracks");
    /// ```
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The base URL is non-empty and uses http or https
    /// - The request timeout is between 1ms and 5 minutes
    /// - The login path is absolute
    /// - The event buffer holds at least one event
    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(Error::Config("API base URL cannot be empty".to_string()));
        }

        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "API base URL must start with http:// or https:// (got '{}')",
                url
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout > MAX_REQUEST_TIMEOUT {
            return Err(Error::Config(
                "Request timeout exceeds maximum of 5 minutes".to_string(),
            ));
        }

        if !self.login_path.starts_with('/') {
            return Err(Error::Config(format!(
                "Login path must start with '/' (got '{}')",
                self.login_path
            )));
        }

        if self.app_name.trim().is_empty() {
            return Err(Error::Config("App name cannot be empty".to_string()));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to reach the Audtream API. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Other hosts: inject an HttpClient bridge."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn secure_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required for credential persistence. \
                 Desktop: enable the 'desktop-shims' feature to use the default KeyringSecureStore. \
                 Web: inject a localStorage-backed secure store."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for user preferences. \
                 Desktop: enable the 'desktop-shims' feature to use the default JsonSettingsStore. \
                 Web: inject a localStorage-backed settings store."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(timeout));
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store(app_name: &str) -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    let store: Arc<dyn SecureStore> =
        Arc::new(KeyringSecureStore::with_service_name(app_name).with_known_keys(["token", "user"]));
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store(_app_name: &str) -> Result<Arc<dyn SecureStore>> {
    Err(secure_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(app_name: &str) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::JsonSettingsStore;

    let store = JsonSettingsStore::open_blocking(JsonSettingsStore::default_path(app_name)?)?;

    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_app_name: &str) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    request_timeout: Option<Duration>,
    login_path: Option<String>,
    app_name: Option<String>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
}

impl CoreConfigBuilder {
    /// Sets the API root. Takes precedence over `AUDTREAM_API_URL`.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Sets the per-request timeout.
    ///
    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the route announced after logout.
    ///
    /// Default: `/login`
    pub fn login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = Some(path.into());
        self
    }

    /// Sets the keychain service / settings directory name.
    ///
    /// Default: `audtream`
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Sets the event bus capacity.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the secure store implementation.
    ///
    /// The secure store persists the bearer token and the signed-in user
    /// record under the keys `token` and `user`.
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Sets the settings store implementation.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::CapabilityMissing`] when a bridge is absent and no desktop
    ///   default is compiled in
    /// - [`Error::Config`] when a value fails [`CoreConfig::validate`]
    pub fn build(self) -> Result<CoreConfig> {
        let api_base_url = self
            .api_base_url
            .or_else(|| std::env::var(API_URL_ENV).ok().filter(|v| !v.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let app_name = self
            .app_name
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string());

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store(&app_name)?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(&app_name)?,
        };

        let config = CoreConfig {
            api_base_url,
            request_timeout,
            login_path: self
                .login_path
                .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string()),
            app_name,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            secure_store,
            settings_store,
        };

        config.validate()?;

        Ok(config)
    }
}
