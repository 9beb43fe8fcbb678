//! Vocab Drill - Spaced-retry vocabulary drills with spoken prompts
//!
//! This library provides the core functionality for the `vocab` CLI:
//! - Retry-until-mastered quiz over words and phrases
//! - Dictation read out in the learner's own language
//! - Content-addressed cache of synthesized speech
//! - Word book loading and persisted learner settings
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                  Sessions                            │
//! │   Quiz  │  Dictation  │  Browse  │  Menu            │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Narrator                            │
//! │   Voice profiles  │  Scoped voice swap               │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │   VoiceCache (TTS + retry)  │  AudioPlayback (cpal) │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod book;
pub mod browse;
pub mod config;
pub mod dictation;
pub mod error;
pub mod item;
pub mod menu;
pub mod pos;
pub mod quiz;
pub mod settings;
pub mod terminal;
pub mod voice;

pub use book::{Profile, WordBooks};
pub use config::Config;
pub use dictation::{DictationOptions, DictationSession};
pub use error::{Error, Result};
pub use item::{Item, RoundResult, Section, SectionKind, Unit};
pub use quiz::{QuizEngine, QuizOptions, QuizReport};
pub use settings::{Accent, Settings};
pub use terminal::{Console, TerminalConsole};
pub use voice::{Narrator, VoiceCache};
