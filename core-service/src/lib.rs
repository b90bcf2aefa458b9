//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridges (HTTP, secure storage, settings)
//! into one [`CoreService`]: a shared session, the API client, the track
//! service and the preferences store, all publishing on a single event bus.
//! Desktop apps typically enable the `desktop-shims` feature, which lets
//! [`CoreConfig`] fall back to the `bridge-desktop` implementations.

pub mod error;
pub mod preferences;

pub use error::{CoreError, Result};
pub use preferences::{AudioQuality, PreferencesStore, Theme, UserPreferences};

pub use core_auth::{AuthStatus, ProfileDraft, Role, SessionManager, User};
pub use core_library::{DebouncedSearch, LibraryBrowser, LibraryQuery, TrackService, TrackSort};
pub use core_runtime::config::CoreConfig;
pub use core_runtime::events::{CoreEvent, EventStream};

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub use bridge_desktop::{JsonSettingsStore, ReqwestHttpClient};

use std::sync::Arc;

use core_auth::{ApiClient, SessionHandle};
use core_runtime::events::EventBus;
use tracing::{info, instrument, warn};

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    config: Arc<CoreConfig>,
    event_bus: EventBus,
    session: SessionManager,
    tracks: TrackService,
    preferences: PreferencesStore,
}

impl CoreService {
    /// Wire the services from `config`. No I/O happens here.
    pub fn new(config: CoreConfig) -> Self {
        let event_bus = EventBus::new(config.event_buffer_size);
        let handle = SessionHandle::new(
            config.secure_store.clone(),
            event_bus.clone(),
            config.login_path.clone(),
        );
        let api = ApiClient::from_config(&config, handle);

        Self {
            session: SessionManager::new(api.clone()),
            tracks: TrackService::new(api),
            preferences: PreferencesStore::new(config.settings_store.clone()),
            event_bus,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn tracks(&self) -> &TrackService {
        &self.tracks
    }

    pub fn preferences(&self) -> &PreferencesStore {
        &self.preferences
    }

    pub fn events(&self) -> EventStream {
        EventStream::new(self.event_bus.subscribe())
    }

    pub fn library_browser(&self) -> LibraryBrowser {
        LibraryBrowser::new()
    }

    /// A fresh type-ahead search bound to this service's API client.
    pub fn search(&self) -> DebouncedSearch {
        DebouncedSearch::new(self.session.api().clone())
    }

    /// Rehydrate the persisted session and confirm it with the server.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> Result<AuthStatus> {
        Ok(self.session.restore().await?)
    }

    /// Public profile of another user.
    pub async fn fetch_user(&self, handle: &str) -> Result<User> {
        Ok(core_auth::users::fetch_user(self.session.api(), handle).await?)
    }

    /// The server offers no account deletion yet.
    pub async fn request_account_deletion(&self) -> Result<()> {
        warn!("Account deletion requested but not supported");
        Err(CoreError::Unsupported(
            "Account deletion is not available yet".to_string(),
        ))
    }
}

impl std::fmt::Debug for CoreService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Build the service and restore any persisted session.
///
/// A restore that fails on storage is logged and the service still starts
/// signed out.
pub async fn bootstrap(config: CoreConfig) -> Result<CoreService> {
    let service = CoreService::new(config);

    match service.restore().await {
        Ok(status) => info!(status = %status, "Core service ready"),
        Err(e) => warn!(error = %e, "Session restore failed, starting signed out"),
    }

    Ok(service)
}

/// [`bootstrap`] with desktop bridges and environment defaults.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// let core = core_service::bootstrap_desktop().await?;
/// let tracks = core.tracks().list_tracks().await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop() -> Result<CoreService> {
    let config = CoreConfig::builder().build()?;
    bootstrap(config).await
}
