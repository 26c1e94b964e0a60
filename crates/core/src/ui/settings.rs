//! User settings persistence.
//!
//! Handles loading and saving user preferences: model, instruction, output
//! mode and an optional API key override.

use crate::config::{Config, OutputMode};
use crate::error::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Gemini models offered in the settings panel.
pub const AVAILABLE_MODELS: &[&str] = &[
    "gemini-2.5-flash-image-preview",
    "gemini-2.5-flash-image",
    "gemini-flash-latest",
];

/// User-configurable settings persisted between sessions.
///
/// Stored as JSON in the user's config directory
/// (e.g., `~/.config/smile-preview/settings.json` on Linux).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Selected Gemini model name.
    pub model: String,
    /// Instruction sent with every selfie.
    pub instruction: String,
    /// Whether to ask for an edited image or a description.
    #[serde(default)]
    pub output_mode: OutputMode,
    /// API key override (takes precedence over environment).
    #[serde(default)]
    pub api_key: String,
}

impl Settings {
    /// Returns the path to the settings file.
    ///
    /// Creates the config directory if it doesn't exist.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "smile-preview").map(|dirs| {
            let config_dir = dirs.config_dir();
            if !config_dir.exists() {
                let _ = fs::create_dir_all(config_dir);
            }
            config_dir.join("settings.json")
        })
    }

    /// Loads settings from disk, falling back to the config's values.
    pub fn load(config: &Config) -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path, config),
            None => Self::from_config(config),
        }
    }

    /// Loads settings from `path`. Missing or unreadable files yield the
    /// config's values; an empty stored API key falls back to the config's.
    pub fn load_from(path: &Path, config: &Config) -> Self {
        let mut settings = fs::read_to_string(path)
            .ok()
            .and_then(|content| match serde_json::from_str::<Settings>(&content) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable settings file");
                    None
                }
            })
            .unwrap_or_else(|| Self::from_config(config));

        if settings.api_key.is_empty() {
            settings.api_key = config.gemini_api_key.clone();
        }
        settings
    }

    /// Settings mirroring the given config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.model_name.clone(),
            instruction: config.instruction.clone(),
            output_mode: config.output_mode,
            api_key: config.gemini_api_key.clone(),
        }
    }

    /// Persists settings to the user's config directory.
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Builds the config these settings describe.
    pub fn to_config(&self) -> Result<Config> {
        Config::builder()
            .with_api_key(&self.api_key)
            .with_model(&self.model)
            .with_instruction(&self.instruction)
            .with_output_mode(self.output_mode)
            .build()
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
