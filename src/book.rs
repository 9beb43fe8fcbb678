//! Word books: drill profiles and the data files they draw items from
//!
//! Layout of a books directory:
//!
//! ```text
//! books/
//! ├── configurations.json   profiles, see [`Profile`]
//! └── data/
//!     └── grade7.json       unit key -> { "words": [...], "phrases": [...] }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::item::{Item, Unit};
use crate::{Error, Result};

/// File listing the available profiles
pub const PROFILES_FILE: &str = "configurations.json";

/// Directory holding the data files
pub const DATA_DIR: &str = "data";

/// Name shown for a profile without one
pub const UNNAMED: &str = "unnamed";

/// A single value or a list of them
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    #[must_use]
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Units to take from one data file
#[derive(Debug, Clone, Deserialize)]
pub struct DataRef {
    pub data_file_name: String,
    #[serde(alias = "unit_keys")]
    pub units_keys: OneOrMany<String>,
}

/// Extra per-profile switches
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ProfileArgs {
    #[serde(default)]
    pub first_letter_tip: bool,
}

/// A drill profile: which units to load and how to present them
#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: Option<String>,

    /// Reveal mode; asked interactively when absent
    #[serde(default)]
    pub learning_mode: Option<bool>,

    #[serde(default)]
    pub other_args: ProfileArgs,

    pub content: OneOrMany<DataRef>,
}

impl Profile {
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED)
    }
}

/// Items of one unit inside a data file
#[derive(Debug, Default, Deserialize)]
struct UnitData {
    #[serde(default)]
    words: Vec<Item>,
    #[serde(default)]
    phrases: Vec<Item>,
}

/// A books directory
#[derive(Debug, Clone)]
pub struct WordBooks {
    root: PathBuf,
}

impl WordBooks {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read every profile from `configurations.json`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Book`] if the file is missing or malformed
    pub fn profiles(&self) -> Result<Vec<Profile>> {
        let path = self.root.join(PROFILES_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::Book(format!("cannot read profiles at {}: {e}", path.display()))
        })?;
        let profiles: Vec<Profile> = serde_json::from_str(&content).map_err(|e| {
            Error::Book(format!("profiles at {} are malformed: {e}", path.display()))
        })?;

        tracing::debug!(path = %path.display(), count = profiles.len(), "loaded profiles");
        Ok(profiles)
    }

    /// Find a profile by name (case-insensitive)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Book`] if no profile has that name
    pub fn profile(&self, name: &str) -> Result<Profile> {
        self.profiles()?
            .into_iter()
            .find(|p| p.display_name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::Book(format!("no profile named {name:?}")))
    }

    /// Gather a profile's units into one drill unit
    ///
    /// Words and phrases are concatenated in the order the data references
    /// and unit keys are listed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Book`] if a data file or unit key is missing or malformed
    pub fn resolve(&self, profile: &Profile) -> Result<Unit> {
        let mut unit = Unit::default();
        let mut files: HashMap<String, HashMap<String, UnitData>> = HashMap::new();

        for data_ref in profile.content.clone().into_vec() {
            if !files.contains_key(&data_ref.data_file_name) {
                let data = self.load_data_file(&data_ref.data_file_name)?;
                files.insert(data_ref.data_file_name.clone(), data);
            }
            let Some(data) = files.get(&data_ref.data_file_name) else {
                continue;
            };

            for key in data_ref.units_keys.into_vec() {
                let unit_data = data.get(&key).ok_or_else(|| {
                    Error::Book(format!(
                        "unit {key:?} not found in data file {}",
                        data_ref.data_file_name
                    ))
                })?;
                unit.extend(Unit::new(
                    unit_data.words.clone(),
                    unit_data.phrases.clone(),
                ));
            }
        }

        tracing::debug!(
            profile = profile.display_name(),
            words = unit.words.len(),
            phrases = unit.phrases.len(),
            "resolved profile"
        );
        Ok(unit)
    }

    fn load_data_file(&self, name: &str) -> Result<HashMap<String, UnitData>> {
        let path = self.root.join(DATA_DIR).join(name);
        if !path.is_file() {
            return Err(Error::Book(format!(
                "data file {name} not found in {}",
                self.root.join(DATA_DIR).display()
            )));
        }

        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Book(format!("data file {name} is malformed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_accepts_single_or_list_content() {
        let single: Profile = serde_json::from_str(
            r#"{"name":"u1","content":{"data_file_name":"a.json","units_keys":"u1"}}"#,
        )
        .unwrap();
        assert_eq!(single.content.into_vec().len(), 1);

        let many: Profile = serde_json::from_str(
            r#"{"content":[
                {"data_file_name":"a.json","units_keys":["u1","u2"]},
                {"data_file_name":"b.json","unit_keys":"u3"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(many.display_name(), UNNAMED);
        assert!(many.learning_mode.is_none());
        assert!(!many.other_args.first_letter_tip);
        let refs = many.content.into_vec();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].units_keys.clone().into_vec(), ["u1", "u2"]);
        assert_eq!(refs[1].units_keys.clone().into_vec(), ["u3"]);
    }

    #[test]
    fn reads_profile_switches() {
        let profile: Profile = serde_json::from_str(
            r#"{"name":"x","learning_mode":true,"other_args":{"first_letter_tip":true},
                "content":{"data_file_name":"a.json","units_keys":"u"}}"#,
        )
        .unwrap();
        assert_eq!(profile.learning_mode, Some(true));
        assert!(profile.other_args.first_letter_tip);
    }
}
