//! Flat key/value settings persistence for ~/.gauntlet/ save files.
//!
//! The durable fight record and the stage catalog are stored as one flat
//! string-keyed document (`state.stage-number`, `stages.3.title`, ...) so
//! the on-disk key layout stays compatible across versions.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::constants::{SETTINGS_FILE, SETTINGS_VERSION};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("could not determine home directory")]
    NoHomeDir,
    #[error("settings io error: {0}")]
    Io(#[from] io::Error),
    #[error("settings encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// On-disk representation of a settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SettingsDocument {
    version: u32,
    values: BTreeMap<String, String>,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            values: BTreeMap::new(),
        }
    }
}

/// Get the ~/.gauntlet/ directory path, creating it if needed.
pub fn settings_dir() -> Result<PathBuf, SettingsError> {
    let home_dir = dirs::home_dir().ok_or(SettingsError::NoHomeDir)?;
    let dir = home_dir.join(".gauntlet");
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the full path for a save file in ~/.gauntlet/.
pub fn settings_path(filename: &str) -> Result<PathBuf, SettingsError> {
    Ok(settings_dir()?.join(filename))
}

/// A flat string-keyed settings map with typed accessors, backed by a
/// pretty-printed JSON file.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    values: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl SettingsStore {
    /// An in-memory store with no backing file. `save()` is a no-op.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the default settings file in ~/.gauntlet/.
    pub fn open_default() -> Result<Self, SettingsError> {
        Ok(Self::load(settings_path(SETTINGS_FILE)?))
    }

    /// Load a store from the given file, returning an empty store bound to
    /// that path if the file is missing or unreadable.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let doc = match fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str::<SettingsDocument>(&json).unwrap_or_default(),
            Err(_) => SettingsDocument::default(),
        };
        Self {
            values: doc.values,
            path: Some(path),
        }
    }

    /// Write the store back to its backing file, if it has one.
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let doc = SettingsDocument {
            version: SETTINGS_VERSION,
            values: self.values.clone(),
        };
        let json = serde_json::to_string_pretty(&doc)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_i64(&self, key: &str, default: i64) -> i64 {
        self.get_str(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn get_f64(&self, key: &str, default: f64) -> f64 {
        self.get_str(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    pub fn set_str(&mut self, key: &str, value: impl Into<String>) {
        let _ = self.values.insert(key.to_string(), value.into());
    }

    pub fn set_i64(&mut self, key: &str, value: i64) {
        self.set_str(key, value.to_string());
    }

    pub fn set_f64(&mut self, key: &str, value: f64) {
        self.set_str(key, value.to_string());
    }

    /// Re-read the backing file, discarding unsaved edits. A store with no
    /// backing file keeps its current values.
    pub fn reload(&mut self) {
        if let Some(path) = self.path.clone() {
            *self = SettingsStore::load(path);
        }
    }

    pub fn remove(&mut self, key: &str) {
        let _ = self.values.remove(key);
    }

    /// Remove every key beginning with the given prefix.
    pub fn remove_prefix(&mut self, prefix: &str) {
        self.values.retain(|k, _| !k.starts_with(prefix));
    }

    /// All keys beginning with the given prefix, in sorted order.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.values
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }
}
