//! Error types for vocab-drill

use thiserror::Error;

/// Result type alias for vocab-drill operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while drilling
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Word book could not be resolved into items
    #[error("word book error: {0}")]
    Book(String),

    /// Voice generation failed after exhausting retries
    #[error("synthesis failed for {text:?} ({voice}) after {attempts} attempts: {reason}")]
    Synthesis {
        text: String,
        voice: String,
        attempts: u32,
        reason: String,
    },

    /// A single text-to-speech request failed
    ///
    /// `status` is the HTTP status when the service answered at all.
    #[error("TTS error: {message}")]
    Tts { status: Option<u16>, message: String },

    /// Audio file missing or playback backend failure
    #[error("playback error: {0}")]
    Playback(String),

    /// Terminal input error
    #[error("input error: {0}")]
    Input(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML writing error
    #[error("toml write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

impl From<dialoguer::Error> for Error {
    fn from(e: dialoguer::Error) -> Self {
        Self::Input(e.to_string())
    }
}
