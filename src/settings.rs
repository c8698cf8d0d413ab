//! Persistent build settings

use crate::bvh::DEFAULT_MAX_LEAF_SIZE;
use crate::util::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Settings shared between runs of the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Build
    pub max_leaf_size: usize,
    pub normalize_vertex_positions: bool,

    // Recent mesh files (most recent first, max 10)
    pub recent_files: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
            normalize_vertex_positions: false,
            recent_files: Vec::new(),
        }
    }
}

const MAX_RECENT_FILES: usize = 10;

impl Settings {
    /// Get settings file path
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("bvh-scene");
            p.push("settings.json");
            p
        })
    }

    /// Load settings from the config directory, falling back to defaults
    pub fn load() -> Self {
        let mut settings: Self = Self::path()
            .and_then(|p| std::fs::read_to_string(&p).ok())
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        if settings.max_leaf_size < 1 {
            warn!("settings: max_leaf_size 0 is invalid, using {}", DEFAULT_MAX_LEAF_SIZE);
            settings.max_leaf_size = DEFAULT_MAX_LEAF_SIZE;
        }

        settings
    }

    /// Load settings from an explicit file; malformed JSON is an error
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Settings(format!("{}: {}", path.display(), e)))?;

        if settings.max_leaf_size < 1 {
            return Err(Error::Settings(format!(
                "{}: max_leaf_size must be at least 1",
                path.display()
            )));
        }
        Ok(settings)
    }

    /// Save settings to the config directory (best effort)
    pub fn save(&self) {
        if let Some(path) = Self::path() {
            if let Err(e) = self.save_to(&path) {
                warn!("settings: could not save {}: {}", path.display(), e);
            }
        }
    }

    /// Save settings to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| Error::Settings(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Add file to recent files list (moves to top if already present)
    pub fn add_recent(&mut self, path: PathBuf) {
        self.recent_files.retain(|p| p != &path);
        self.recent_files.insert(0, path);
        self.recent_files.truncate(MAX_RECENT_FILES);
    }
}
