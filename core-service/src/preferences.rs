//! Persisted user preferences.
//!
//! Stored as one JSON document under [`PREFERENCES_KEY`]. The theme is also
//! mirrored on its own under [`THEME_KEY`] so a host can style its first frame
//! without decoding the whole document.

use std::fmt;
use std::sync::Arc;

use bridge_traits::storage::SettingsStore;
use bridge_traits::BridgeError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

pub const PREFERENCES_KEY: &str = "userSettings";
pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioQuality {
    Low,
    Medium,
    #[default]
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Missing fields take their defaults, so older documents keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub email_notifications: bool,
    pub push_notifications: bool,
    pub newsletter: bool,
    pub public_profile: bool,
    pub auto_play: bool,
    pub audio_quality: AudioQuality,
    pub theme: Theme,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            email_notifications: true,
            push_notifications: false,
            newsletter: true,
            public_profile: true,
            auto_play: false,
            audio_quality: AudioQuality::High,
            theme: Theme::Dark,
        }
    }
}

#[derive(Clone)]
pub struct PreferencesStore {
    settings: Arc<dyn SettingsStore>,
}

impl PreferencesStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Saved preferences, or the defaults when nothing usable is stored.
    pub async fn load(&self) -> Result<UserPreferences> {
        let Some(raw) = self.settings.get_string(PREFERENCES_KEY).await? else {
            debug!("No saved preferences, using defaults");
            return Ok(UserPreferences::default());
        };

        match serde_json::from_str(&raw) {
            Ok(preferences) => Ok(preferences),
            Err(e) => {
                warn!(error = %e, "Saved preferences are unreadable, using defaults");
                Ok(UserPreferences::default())
            }
        }
    }

    pub async fn save(&self, preferences: &UserPreferences) -> Result<()> {
        let json = serde_json::to_string(preferences).map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to encode preferences: {}", e))
        })?;
        self.settings.set_string(PREFERENCES_KEY, &json).await?;
        self.settings
            .set_string(THEME_KEY, preferences.theme.as_str())
            .await?;
        Ok(())
    }

    /// Load, change with `edit`, and save.
    pub async fn update<F>(&self, edit: F) -> Result<UserPreferences>
    where
        F: FnOnce(&mut UserPreferences),
    {
        let mut preferences = self.load().await?;
        edit(&mut preferences);
        self.save(&preferences).await?;
        Ok(preferences)
    }

    /// Flip between dark and light and persist. Returns the new theme.
    pub async fn toggle_theme(&self) -> Result<Theme> {
        let preferences = self.update(|p| p.theme = p.theme.toggled()).await?;
        Ok(preferences.theme)
    }
}

impl fmt::Debug for PreferencesStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreferencesStore").finish_non_exhaustive()
    }
}
