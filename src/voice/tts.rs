//! Text-to-speech (TTS) synthesis

use std::str::FromStr;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::{Error, Result};

/// Turns text into encoded audio for a given voice
///
/// Voice identifiers are opaque to callers; each backend interprets its own.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` with `voice`, returning MP3 bytes
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>>;
}

/// TTS provider backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TtsProvider {
    #[default]
    OpenAI,
    ElevenLabs,
}

impl TtsProvider {
    /// Default model for the provider
    #[must_use]
    pub const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAI => "tts-1",
            Self::ElevenLabs => "eleven_multilingual_v2",
        }
    }
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Synthesizes speech through a hosted TTS API
pub struct HttpSynthesizer {
    client: reqwest::Client,
    api_key: SecretString,
    speed: f32,
    model: String,
    provider: TtsProvider,
}

impl HttpSynthesizer {
    /// Create a synthesizer using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(api_key: SecretString, speed: f32) -> Result<Self> {
        Self::with_model(TtsProvider::OpenAI, api_key, speed, None)
    }

    /// Create a synthesizer using ElevenLabs
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs(api_key: SecretString) -> Result<Self> {
        Self::with_model(TtsProvider::ElevenLabs, api_key, 1.0, None)
    }

    /// Create a synthesizer for any provider with an optional model override
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn with_model(
        provider: TtsProvider,
        api_key: SecretString,
        speed: f32,
        model: Option<String>,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config(format!(
                "{provider:?} API key required for TTS"
            )));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            speed,
            model: model.unwrap_or_else(|| provider.default_model().to_string()),
            provider,
        })
    }

    /// Synthesize using `OpenAI` TTS
    async fn synthesize_openai(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/speech")
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts {
                status: Some(status.as_u16()),
                message: format!("OpenAI TTS error {status}: {body}"),
            });
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    /// Synthesize using ElevenLabs TTS
    async fn synthesize_elevenlabs(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!("https://api.elevenlabs.io/v1/text-to-speech/{voice}");

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", self.api_key.expose_secret())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts {
                status: Some(status.as_u16()),
                message: format!("ElevenLabs TTS error {status}: {body}"),
            });
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        tracing::debug!(provider = ?self.provider, voice, chars = text.len(), "synthesizing");
        match self.provider {
            TtsProvider::OpenAI => self.synthesize_openai(text, voice).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text, voice).await,
        }
    }
}
