//! Voice module
//!
//! Handles speech synthesis, the on-disk voice cache and playback.
//! The quiz and dictation sessions only talk to the [`Narrator`].

pub mod cache;
mod narrator;
mod playback;
pub mod retry;
mod tts;

pub use cache::{
    ClearReport, ClearWarning, PinGuard, PregenerateReport, VoiceCache, cache_key, clear_dir,
};
pub use narrator::{Narrator, VoiceGuard, VoiceProfiles};
pub use playback::{AudioPlayback, AudioPlayer, Clip};
pub use retry::RetryPolicy;
pub use tts::{HttpSynthesizer, Synthesizer, TtsProvider};
