//! Persisted learner settings
//!
//! A tiny TOML record next to the voice cache holding the foreign-language
//! accent. It is read at startup and rewritten whenever the accent changes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Accent of the foreign-language voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accent {
    #[default]
    British,
    American,
}

impl Accent {
    /// The other accent
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::British => Self::American,
            Self::American => Self::British,
        }
    }
}

impl fmt::Display for Accent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::British => f.write_str("british"),
            Self::American => f.write_str("american"),
        }
    }
}

impl FromStr for Accent {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "british" | "uk" | "gb" | "en-gb" => Ok(Self::British),
            "american" | "us" | "en-us" => Ok(Self::American),
            other => Err(Error::Config(format!("unknown accent: {other}"))),
        }
    }
}

/// Learner settings that survive between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub accent: Accent,
}

impl Settings {
    /// Load settings from `path`
    ///
    /// A missing file yields defaults; an unreadable or malformed file is
    /// logged and also yields defaults.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to parse settings, using defaults"
                    );
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read settings");
                Self::default()
            }
        }
    }

    /// Write settings to `path`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be serialized or written
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), accent = %self.accent, "settings saved");
        Ok(())
    }

    /// Flip the accent and persist the result
    ///
    /// # Errors
    ///
    /// Returns error if the settings cannot be written
    pub fn toggle_accent(&mut self, path: &Path) -> Result<Accent> {
        self.accent = self.accent.toggled();
        self.save(path)?;
        Ok(self.accent)
    }
}

/// Default settings path: `~/.local/share/vocab-drill/settings.toml`
#[must_use]
pub fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.toml")
}
