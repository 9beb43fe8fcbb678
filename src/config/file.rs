//! TOML configuration file loading
//!
//! Supports `~/.config/vocab-drill/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct VocabConfigFile {
    /// Speech synthesis and playback
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Quiz presentation
    #[serde(default)]
    pub quiz: QuizFileConfig,

    /// Dictation pacing
    #[serde(default)]
    pub dictation: DictationFileConfig,

    /// Where word books and cached audio live
    #[serde(default)]
    pub paths: PathsFileConfig,

    /// API keys for the TTS providers
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Voice configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Speak at all
    pub enabled: Option<bool>,

    /// TTS provider ("openai" or "elevenlabs")
    pub provider: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub model: Option<String>,

    /// TTS speed multiplier
    pub speed: Option<f32>,

    /// Voice for the learner's own language
    pub meaning_voice: Option<String>,

    /// Foreign-language voice, British accent
    pub british_voice: Option<String>,

    /// Foreign-language voice, American accent
    pub american_voice: Option<String>,

    /// Parallel synthesis requests while pregenerating
    pub concurrency: Option<usize>,
}

/// Quiz configuration
#[derive(Debug, Default, Deserialize)]
pub struct QuizFileConfig {
    pub first_letter_tip: Option<bool>,
}

/// Dictation configuration
#[derive(Debug, Default, Deserialize)]
pub struct DictationFileConfig {
    /// Seconds to wait after each item
    pub delay_secs: Option<u64>,

    /// Sound played before the first item
    pub start_sound: Option<String>,
}

/// Directory configuration
#[derive(Debug, Default, Deserialize)]
pub struct PathsFileConfig {
    pub books_dir: Option<String>,
    pub cache_dir: Option<String>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `VocabConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> VocabConfigFile {
    config_file_path().map_or_else(VocabConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_file_from(path: &Path) -> VocabConfigFile {
    if !path.exists() {
        return VocabConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                VocabConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            VocabConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/vocab-drill/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("vocab-drill").join("config.toml"))
}
