use crate::core::SettingsStore;
use crate::domain::model::Location;
use crate::utils::error::{MenuError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSettings {
    location: usize,
}

/// Keeps the last selected cafeteria in a small TOML file in the user's
/// config directory.
///
/// A store without a path remembers nothing: loads find no location and
/// saves are skipped.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: Option<PathBuf>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Uses `path` when given, else the default location. Without a config
    /// directory the store is disabled instead of failing the run.
    pub fn resolve(path: Option<PathBuf>) -> Self {
        match path.map_or_else(Self::default_path, Ok) {
            Ok(path) => Self::new(path),
            Err(e) => {
                tracing::warn!("Location will not be remembered: {}", e);
                Self::disabled()
            }
        }
    }

    /// `<config dir>/studentenfutter/settings.toml`
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| MenuError::SettingsError {
            message: "Cannot find config directory".to_string(),
        })?;
        Ok(config_dir.join("studentenfutter").join("settings.toml"))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load_location(&self) -> Result<Option<Location>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(MenuError::SettingsError {
                    message: format!("reading {}: {}", path.display(), e),
                })
            }
        };

        let settings: PersistedSettings =
            toml::from_str(&content).map_err(|e| MenuError::SettingsError {
                message: format!("parsing {}: {}", path.display(), e),
            })?;

        let location = Location::from_index(settings.location);
        if location.is_none() {
            tracing::warn!(
                "Ignoring stored location index {} from {}",
                settings.location,
                path.display()
            );
        }
        Ok(location)
    }

    async fn save_location(&self, location: Location) -> Result<()> {
        let Some(path) = &self.path else {
            tracing::debug!("Settings store disabled, not saving {}", location);
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string(&PersistedSettings {
            location: location.index(),
        })
        .map_err(|e| MenuError::SettingsError {
            message: e.to_string(),
        })?;

        tokio::fs::write(path, content).await?;
        tracing::debug!("Saved location {} to {}", location, path.display());
        Ok(())
    }
}
