//! Drill items and the sections that group them

use serde::{Deserialize, Serialize};

/// A word or phrase to learn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Text the learner must type (the `word` or `phrase` field of a record)
    #[serde(rename = "word", alias = "phrase")]
    pub key_text: String,

    /// Gloss shown as the prompt
    pub meaning: String,

    /// Part of speech, possibly several joined by `/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_of_speech: Option<String>,

    /// Phonetic transcription
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic_symbol: Option<String>,
}

impl Item {
    /// Create an item with only the required fields
    pub fn new(key_text: impl Into<String>, meaning: impl Into<String>) -> Self {
        Self {
            key_text: key_text.into(),
            meaning: meaning.into(),
            part_of_speech: None,
            phonetic_symbol: None,
        }
    }

    #[must_use]
    pub fn with_part_of_speech(mut self, pos: impl Into<String>) -> Self {
        self.part_of_speech = Some(pos.into());
        self
    }

    #[must_use]
    pub fn with_phonetic_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.phonetic_symbol = Some(symbol.into());
        self
    }

    /// Part of speech, empty when absent
    #[must_use]
    pub fn part_of_speech(&self) -> &str {
        self.part_of_speech.as_deref().unwrap_or_default()
    }

    /// Phonetic symbol, empty when absent
    #[must_use]
    pub fn phonetic_symbol(&self) -> &str {
        self.phonetic_symbol.as_deref().unwrap_or_default()
    }

    /// Prompt text: part of speech followed by the meaning (`"n.猫"`)
    #[must_use]
    pub fn gloss(&self) -> String {
        format!("{}{}", self.part_of_speech(), self.meaning)
    }
}

/// Which kind of items a section holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Words,
    Phrases,
}

impl SectionKind {
    /// Section name as used in word books (`"words"`, `"phrases"`)
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Words => "words",
            Self::Phrases => "phrases",
        }
    }

    /// Name of the record field holding the key text (`"word"`, `"phrase"`)
    #[must_use]
    pub const fn key_field(self) -> &'static str {
        match self {
            Self::Words => "word",
            Self::Phrases => "phrase",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Named, ordered collection of items sharing one key field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub items: Vec<Item>,
}

impl Section {
    #[must_use]
    pub const fn new(kind: SectionKind, items: Vec<Item>) -> Self {
        Self { kind, items }
    }

    #[must_use]
    pub const fn empty(kind: SectionKind) -> Self {
        Self::new(kind, Vec::new())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Items answered incorrectly at least once during one pass, in first-failure order
pub type RoundResult = Vec<Item>;

/// A quiz unit: the words and phrases sections of one drill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub words: Section,
    pub phrases: Section,
}

impl Default for Unit {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

impl Unit {
    #[must_use]
    pub const fn new(words: Vec<Item>, phrases: Vec<Item>) -> Self {
        Self {
            words: Section::new(SectionKind::Words, words),
            phrases: Section::new(SectionKind::Phrases, phrases),
        }
    }

    /// Look up a section by kind
    #[must_use]
    pub const fn section(&self, kind: SectionKind) -> &Section {
        match kind {
            SectionKind::Words => &self.words,
            SectionKind::Phrases => &self.phrases,
        }
    }

    /// Sections in presentation order (words, then phrases)
    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        [&self.words, &self.phrases].into_iter()
    }

    /// All items, words first
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.sections().flat_map(|s| s.items.iter())
    }

    /// True when both sections are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty() && self.phrases.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len() + self.phrases.len()
    }

    /// Append another unit's items section by section
    pub fn extend(&mut self, other: Self) {
        self.words.items.extend(other.words.items);
        self.phrases.items.extend(other.phrases.items);
    }
}
