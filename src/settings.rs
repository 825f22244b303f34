//! Credential and model selection storage.
//!
//! Settings are owned by the user and read at dispatch time; nothing in the
//! pipeline caches them, so a key saved while a chat is open applies to the
//! next draft.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Storage key holding the analysis service API key.
pub const API_KEY: &str = "openrouter_api_key";
/// Storage key holding the selected model identifier.
pub const MODEL: &str = "selected_model";

/// Key/value storage collaborator.
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// The API key, treating a blank value as absent.
    fn credential(&self) -> Option<String> {
        self.get(API_KEY).filter(|key| !key.trim().is_empty())
    }

    /// The selected model, or `default` when none is stored.
    fn model_or(&self, default: &str) -> String {
        self.get(MODEL)
            .filter(|model| !model.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    }
}

/// Settings held in memory.
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RefCell<BTreeMap<String, String>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: &str, value: &str) -> Self {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Settings persisted as a flat JSON object.
///
/// The file is re-read on every `get` so edits made by another process are
/// picked up without a restart.
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", self.path.display()))
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut values) => values.remove(key),
            Err(e) => {
                tracing::warn!(error = %e, "settings unavailable");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.load()?;
        values.insert(key.to_string(), value.to_string());
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let serialized = serde_json::to_string_pretty(&values)?;
        std::fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))?;
        tracing::debug!(%key, path = %self.path.display(), "setting saved");
        Ok(())
    }
}

/// Masks all but the last four characters of a secret.
pub fn mask(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}
