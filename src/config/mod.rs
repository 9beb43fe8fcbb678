//! Configuration management for vocab-drill

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::voice::{TtsProvider, VoiceProfiles};
use crate::{Error, Result};

use self::file::VocabConfigFile;

/// Default pause after each dictation item
pub const DEFAULT_DICTATION_DELAY_SECS: u64 = 5;

/// Runtime configuration
#[derive(Debug)]
pub struct Config {
    /// Directory holding `configurations.json` and `data/`
    pub books_dir: PathBuf,

    /// Directory for cached audio
    pub cache_dir: PathBuf,

    /// Directory for persisted settings
    pub data_dir: PathBuf,

    /// Voice configuration
    pub voice: VoiceConfig,

    /// Quiz configuration
    pub quiz: QuizConfig,

    /// Dictation configuration
    pub dictation: DictationConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// Voice configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Speak at all
    pub enabled: bool,

    /// TTS provider
    pub provider: TtsProvider,

    /// Model override; the provider default when unset
    pub model: Option<String>,

    /// TTS speed multiplier (0.25 to 4.0)
    pub speed: f32,

    /// Voice identifiers per spoken language
    pub profiles: VoiceProfiles,

    /// Parallel synthesis requests while pregenerating
    pub concurrency: usize,
}

/// Quiz configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct QuizConfig {
    /// Give away the first letter unless the profile says otherwise
    pub first_letter_tip: bool,
}

/// Dictation configuration
#[derive(Debug, Clone)]
pub struct DictationConfig {
    pub delay: Duration,
    pub start_sound: Option<PathBuf>,
}

/// API keys for the TTS providers
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key
    pub openai: Option<SecretString>,

    /// `ElevenLabs` API key
    pub elevenlabs: Option<SecretString>,
}

impl ApiKeys {
    /// Key for `provider`, if configured
    #[must_use]
    pub fn for_provider(&self, provider: TtsProvider) -> Option<&SecretString> {
        match provider {
            TtsProvider::OpenAI => self.openai.as_ref(),
            TtsProvider::ElevenLabs => self.elevenlabs.as_ref(),
        }
    }
}

/// Built-in voices for `provider`
#[must_use]
pub fn default_profiles(provider: TtsProvider) -> VoiceProfiles {
    let (meaning, british, american) = match provider {
        TtsProvider::OpenAI => ("nova", "fable", "alloy"),
        // Charlotte (multilingual), Daniel, Rachel
        TtsProvider::ElevenLabs => (
            "XB0fDUnXU5powFXDhCwa",
            "onwK4e9ZLuTAKqWW03F9",
            "21m00Tcm4TlvDq8ikWAM",
        ),
    };
    VoiceProfiles {
        meaning: meaning.to_string(),
        british: british.to_string(),
        american: american.to_string(),
    }
}

/// Settings directory: `~/.local/share/vocab-drill` on Linux
pub fn data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/vocab-drill"),
        |d| d.data_dir().join("vocab-drill"),
    )
}

/// Audio cache directory: `~/.cache/vocab-drill/voice` on Linux
pub fn default_cache_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".cache/vocab-drill/voice"),
        |d| d.cache_dir().join("vocab-drill").join("voice"),
    )
}

/// Options given on the command line, highest precedence
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub books_dir: Option<PathBuf>,
    pub mute: bool,
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load() -> Result<Self> {
        Self::load_with_options(LoadOptions::default())
    }

    /// Load configuration with command-line overrides
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load_with_options(options: LoadOptions) -> Result<Self> {
        // env > toml > default
        let fc = file::load_config_file();
        let config = Self::resolve(fc, options, |name| std::env::var(name).ok())?;

        std::fs::create_dir_all(&config.data_dir).ok();
        Ok(config)
    }

    /// Merge command-line options, environment and file into a configuration
    ///
    /// # Errors
    ///
    /// Returns error if the provider name or speed is invalid
    pub fn resolve(
        fc: VocabConfigFile,
        options: LoadOptions,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let api_keys = ApiKeys {
            openai: env("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            elevenlabs: env("ELEVENLABS_API_KEY")
                .or(fc.api_keys.elevenlabs)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
        };

        let provider = env("VOCAB_TTS_PROVIDER")
            .or(fc.voice.provider)
            .map(|p| p.parse::<TtsProvider>())
            .transpose()?
            .unwrap_or_default();

        let speed = fc.voice.speed.unwrap_or(1.0);
        if !(0.25..=4.0).contains(&speed) {
            return Err(Error::Config(format!(
                "voice.speed must be between 0.25 and 4.0, got {speed}"
            )));
        }

        let defaults = default_profiles(provider);
        let profiles = VoiceProfiles {
            meaning: fc.voice.meaning_voice.unwrap_or(defaults.meaning),
            british: fc.voice.british_voice.unwrap_or(defaults.british),
            american: fc.voice.american_voice.unwrap_or(defaults.american),
        };

        let mut enabled = !options.mute && fc.voice.enabled.unwrap_or(true);
        if options.mute {
            tracing::info!("voice disabled via --mute");
        } else if enabled && api_keys.for_provider(provider).is_none() {
            tracing::warn!(?provider, "no API key for TTS provider, voice disabled");
            enabled = false;
        }

        let voice = VoiceConfig {
            enabled,
            provider,
            model: fc.voice.model,
            speed,
            profiles,
            concurrency: fc
                .voice
                .concurrency
                .unwrap_or(crate::voice::cache::DEFAULT_CONCURRENCY)
                .max(1),
        };

        let data_dir = data_dir();

        let books_dir = options
            .books_dir
            .or_else(|| env("VOCAB_BOOKS_DIR").map(PathBuf::from))
            .or_else(|| fc.paths.books_dir.map(PathBuf::from))
            .unwrap_or_else(|| data_dir.join("books"));

        let cache_dir = env("VOCAB_CACHE_DIR")
            .map(PathBuf::from)
            .or_else(|| fc.paths.cache_dir.map(PathBuf::from))
            .unwrap_or_else(default_cache_dir);

        let quiz = QuizConfig {
            first_letter_tip: fc.quiz.first_letter_tip.unwrap_or(false),
        };

        let dictation = DictationConfig {
            delay: Duration::from_secs(
                fc.dictation
                    .delay_secs
                    .unwrap_or(DEFAULT_DICTATION_DELAY_SECS),
            ),
            start_sound: fc.dictation.start_sound.map(PathBuf::from),
        };

        tracing::debug!(
            books_dir = %books_dir.display(),
            cache_dir = %cache_dir.display(),
            voice_enabled = voice.enabled,
            "configuration resolved"
        );

        Ok(Self {
            books_dir,
            cache_dir,
            data_dir,
            voice,
            quiz,
            dictation,
            api_keys,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_key_disable_voice() {
        let config =
            Config::resolve(VocabConfigFile::default(), LoadOptions::default(), env_of(&[]))
                .unwrap();
        assert!(!config.voice.enabled);
        assert_eq!(config.voice.provider, TtsProvider::OpenAI);
        assert_eq!(config.voice.profiles, default_profiles(TtsProvider::OpenAI));
        assert_eq!(config.dictation.delay, Duration::from_secs(5));
        assert!(!config.quiz.first_letter_tip);
    }

    #[test]
    fn env_beats_file() {
        let fc: VocabConfigFile = toml::from_str(
            r#"
            [paths]
            books_dir = "/from/file"
            cache_dir = "/cache/file"

            [api_keys]
            openai = "file-key"
            "#,
        )
        .unwrap();
        let config = Config::resolve(
            fc,
            LoadOptions::default(),
            env_of(&[("VOCAB_BOOKS_DIR", "/from/env"), ("OPENAI_API_KEY", "env-key")]),
        )
        .unwrap();

        assert_eq!(config.books_dir, PathBuf::from("/from/env"));
        assert_eq!(config.cache_dir, PathBuf::from("/cache/file"));
        assert!(config.voice.enabled);
    }

    #[test]
    fn cli_beats_env_and_mute_wins() {
        let options = LoadOptions {
            books_dir: Some(PathBuf::from("/from/cli")),
            mute: true,
        };
        let config = Config::resolve(
            VocabConfigFile::default(),
            options,
            env_of(&[("VOCAB_BOOKS_DIR", "/from/env"), ("OPENAI_API_KEY", "k")]),
        )
        .unwrap();
        assert_eq!(config.books_dir, PathBuf::from("/from/cli"));
        assert!(!config.voice.enabled);
    }

    #[test]
    fn provider_picks_its_voices_and_key() {
        let fc: VocabConfigFile = toml::from_str(
            r#"
            [voice]
            american_voice = "custom"
            "#,
        )
        .unwrap();
        let config = Config::resolve(
            fc,
            LoadOptions::default(),
            env_of(&[("VOCAB_TTS_PROVIDER", "elevenlabs"), ("OPENAI_API_KEY", "k")]),
        )
        .unwrap();

        let defaults = default_profiles(TtsProvider::ElevenLabs);
        assert_eq!(config.voice.provider, TtsProvider::ElevenLabs);
        assert_eq!(config.voice.profiles.british, defaults.british);
        assert_eq!(config.voice.profiles.american, "custom");
        // only an OpenAI key is present
        assert!(!config.voice.enabled);
    }

    #[test]
    fn rejects_bad_values() {
        let err = Config::resolve(
            VocabConfigFile::default(),
            LoadOptions::default(),
            env_of(&[("VOCAB_TTS_PROVIDER", "espeak")]),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let fc: VocabConfigFile = toml::from_str("[voice]\nspeed = 9.0").unwrap();
        let err = Config::resolve(fc, LoadOptions::default(), env_of(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
