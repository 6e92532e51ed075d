// SPDX-License-Identifier: MPL-2.0

use crate::config::APP_ID;
use crate::profile::Locale;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to write settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Which backend the application talks to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendSettings {
    /// SQLite database under the user's data directory.
    #[default]
    Local,
    Remote { url: String, anon_key: String },
}

/// Persistent application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub locale: Locale,
    /// Bearer token for the remote backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Identity to sign in as against the local backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_user: Option<String>,
}

impl AppSettings {
    /// Get the settings file path (~/.config/io.github.arsound.Arsound/settings.json)
    fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push(APP_ID);
            p.push("settings.json");
            p
        })
    }

    /// Load settings from disk, or return defaults if not found, then apply
    /// environment overrides.
    pub fn load() -> Self {
        let from_disk: Self = Self::settings_path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default();
        from_disk.with_overrides(|key| std::env::var(key).ok())
    }

    /// `ARSOUND_BACKEND_URL` + `ARSOUND_ANON_KEY` switch to the remote backend;
    /// `ARSOUND_ACCESS_TOKEN` and `ARSOUND_LOCAL_USER` replace their fields.
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var("ARSOUND_BACKEND_URL") {
            let anon_key = var("ARSOUND_ANON_KEY")
                .or_else(|| match &self.backend {
                    BackendSettings::Remote { anon_key, .. } => Some(anon_key.clone()),
                    BackendSettings::Local => None,
                })
                .unwrap_or_default();
            self.backend = BackendSettings::Remote { url, anon_key };
        }
        if let Some(token) = var("ARSOUND_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
        if let Some(user) = var("ARSOUND_LOCAL_USER") {
            self.local_user = Some(user);
        }
        self
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<(), SettingsError> {
        let path = Self::settings_path().ok_or(SettingsError::NoConfigDir)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(())
    }
}
