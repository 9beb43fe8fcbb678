//! Narrator: speaks prompts through the voice cache
//!
//! Holds the voice selection for a drill session. Foreign-language text is
//! spoken with the voice for the learner's chosen accent; a session may swap
//! in another voice (the meaning-language voice during dictation) through a
//! [`VoiceGuard`], which restores the previous voice when dropped.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::cache::{PregenerateReport, VoiceCache};
use super::playback::AudioPlayer;
use crate::Result;
use crate::settings::Accent;

/// Voice identifiers for each spoken language
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceProfiles {
    /// Voice for glosses and prompts in the learner's own language
    pub meaning: String,
    /// Foreign-language voice with a British accent
    pub british: String,
    /// Foreign-language voice with an American accent
    pub american: String,
}

impl VoiceProfiles {
    /// Foreign-language voice for `accent`
    #[must_use]
    pub fn foreign(&self, accent: Accent) -> &str {
        match accent {
            Accent::British => &self.british,
            Accent::American => &self.american,
        }
    }
}

#[derive(Debug)]
struct VoiceState {
    accent: Accent,
    override_voice: Option<String>,
}

struct Backend {
    cache: Arc<VoiceCache>,
    player: Arc<dyn AudioPlayer>,
}

/// Speaks text with the active voice, synthesizing through the cache
pub struct Narrator {
    backend: Option<Backend>,
    profiles: VoiceProfiles,
    state: Mutex<VoiceState>,
}

impl Narrator {
    /// Create a narrator speaking through `cache` and `player`
    pub fn new(
        cache: Arc<VoiceCache>,
        player: Arc<dyn AudioPlayer>,
        profiles: VoiceProfiles,
        accent: Accent,
    ) -> Self {
        Self {
            backend: Some(Backend { cache, player }),
            profiles,
            state: Mutex::new(VoiceState {
                accent,
                override_voice: None,
            }),
        }
    }

    /// A narrator that never makes a sound (voice disabled)
    #[must_use]
    pub fn silent(profiles: VoiceProfiles, accent: Accent) -> Self {
        Self {
            backend: None,
            profiles,
            state: Mutex::new(VoiceState {
                accent,
                override_voice: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, VoiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub const fn is_silent(&self) -> bool {
        self.backend.is_none()
    }

    #[must_use]
    pub const fn profiles(&self) -> &VoiceProfiles {
        &self.profiles
    }

    #[must_use]
    pub fn accent(&self) -> Accent {
        self.state().accent
    }

    /// Switch the foreign-language accent used by subsequent `speak` calls
    pub fn set_accent(&self, accent: Accent) {
        self.state().accent = accent;
        tracing::debug!(?accent, "accent changed");
    }

    /// Foreign-language voice for the current accent
    #[must_use]
    pub fn foreign_voice(&self) -> String {
        self.profiles.foreign(self.accent()).to_string()
    }

    #[must_use]
    pub fn meaning_voice(&self) -> &str {
        &self.profiles.meaning
    }

    /// Voice used by [`Narrator::speak`]
    #[must_use]
    pub fn active_voice(&self) -> String {
        let state = self.state();
        state
            .override_voice
            .clone()
            .unwrap_or_else(|| self.profiles.foreign(state.accent).to_string())
    }

    /// Speak with `voice` until the returned guard is dropped
    #[must_use = "the voice reverts as soon as the guard is dropped"]
    pub fn use_voice(&self, voice: impl Into<String>) -> VoiceGuard<'_> {
        let voice = voice.into();
        tracing::debug!(voice = %voice, "voice swapped in");
        let previous = self.state().override_voice.replace(voice);
        VoiceGuard {
            narrator: self,
            previous,
        }
    }

    /// Speak with the meaning-language voice until the guard is dropped
    #[must_use = "the voice reverts as soon as the guard is dropped"]
    pub fn use_meaning_voice(&self) -> VoiceGuard<'_> {
        self.use_voice(self.profiles.meaning.clone())
    }

    /// Speak `text` with the active voice, blocking until playback ends
    ///
    /// # Errors
    ///
    /// Returns a synthesis or playback error
    pub async fn speak(&self, text: &str) -> Result<()> {
        let voice = self.active_voice();
        self.speak_with(text, &voice).await
    }

    /// Speak `text` with an explicit voice, blocking until playback ends
    ///
    /// Blank text is ignored.
    ///
    /// # Errors
    ///
    /// Returns a synthesis or playback error
    pub async fn speak_with(&self, text: &str, voice: &str) -> Result<()> {
        let Some(backend) = &self.backend else {
            return Ok(());
        };
        if text.trim().is_empty() {
            return Ok(());
        }

        let path = backend.cache.ensure(text, voice).await?;
        let _pin = backend.cache.pin(&path);
        backend.player.play_file(&path)
    }

    /// Play an audio file that is not part of the cache
    ///
    /// # Errors
    ///
    /// Returns a playback error
    pub fn play_file(&self, path: &Path) -> Result<()> {
        match &self.backend {
            Some(backend) => backend.player.play_file(path),
            None => Ok(()),
        }
    }

    /// Stop any playback in progress
    pub fn stop(&self) {
        if let Some(backend) = &self.backend {
            backend.player.stop();
        }
    }

    /// Synthesize `texts` with `voice` ahead of time
    pub async fn pregenerate<I, S>(&self, texts: I, voice: &str) -> PregenerateReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        match &self.backend {
            Some(backend) => backend.cache.pregenerate(texts, voice).await,
            None => PregenerateReport::default(),
        }
    }
}

/// Restores the narrator's previous voice when dropped
pub struct VoiceGuard<'a> {
    narrator: &'a Narrator,
    previous: Option<String>,
}

impl Drop for VoiceGuard<'_> {
    fn drop(&mut self) {
        self.narrator.state().override_voice = self.previous.take();
        tracing::debug!("voice restored");
    }
}
