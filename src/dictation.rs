//! Dictation: the learner writes down items read out in the meaning language

use std::path::PathBuf;
use std::time::Duration;

use console::style;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::item::{Item, SectionKind, Unit};
use crate::pos;
use crate::terminal::Console;
use crate::voice::Narrator;
use crate::Result;

/// Spoken label announcing a phrase
const PHRASE_LABEL: &str = "短语";

/// Separator between the parts of a spoken prompt
const PROMPT_SEPARATOR: &str = "，";

/// Announcement at the end of a dictation
pub const FINISHED_NOTICE: &str = "dictation finished";

/// Dictation settings
#[derive(Debug, Clone)]
pub struct DictationOptions {
    /// Pause after each item for the learner to write
    pub delay: Duration,
    /// Sound played once before the first item
    pub start_sound: Option<PathBuf>,
}

impl Default for DictationOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            start_sound: None,
        }
    }
}

/// Prompt spoken for an item: localized part of speech and meaning
///
/// Phrases are announced as such. Empty parts are left out.
#[must_use]
pub fn spoken_prompt(item: &Item, kind: SectionKind) -> String {
    let pos = pos::localize(item.part_of_speech());
    let label = match kind {
        SectionKind::Words => "",
        SectionKind::Phrases => PHRASE_LABEL,
    };

    [label, pos.as_str(), item.meaning.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(PROMPT_SEPARATOR)
}

/// Line of the answer key for the `ordinal`-th item (1-based)
#[must_use]
pub fn answer_line(ordinal: usize, item: &Item) -> String {
    format!("{ordinal}. {} --- {}", item.key_text, item.meaning)
}

/// Reads a unit aloud one item at a time and prints the answer key at the end
pub struct DictationSession<'a> {
    narrator: &'a Narrator,
    console: &'a mut dyn Console,
    rng: StdRng,
    options: DictationOptions,
}

impl<'a> DictationSession<'a> {
    pub fn new(
        narrator: &'a Narrator,
        console: &'a mut dyn Console,
        options: DictationOptions,
    ) -> Self {
        Self::with_rng(narrator, console, options, StdRng::from_entropy())
    }

    pub fn with_rng(
        narrator: &'a Narrator,
        console: &'a mut dyn Console,
        options: DictationOptions,
        rng: StdRng,
    ) -> Self {
        Self {
            narrator,
            console,
            rng,
            options,
        }
    }

    /// Run the dictation and return the answer key
    ///
    /// Words and phrases are shuffled separately, words first. Prompts are
    /// spoken with the meaning-language voice, which is swapped back out
    /// when the readout ends, also on error.
    ///
    /// # Errors
    ///
    /// Returns error if input for the final acknowledgement cannot be read
    pub async fn run(&mut self, unit: &Unit) -> Result<Vec<String>> {
        self.console.clear();

        let mut words = unit.words.items.clone();
        let mut phrases = unit.phrases.items.clone();
        words.shuffle(&mut self.rng);
        phrases.shuffle(&mut self.rng);

        let script: Vec<(Item, String)> = words
            .into_iter()
            .map(|item| {
                let prompt = spoken_prompt(&item, SectionKind::Words);
                (item, prompt)
            })
            .chain(phrases.into_iter().map(|item| {
                let prompt = spoken_prompt(&item, SectionKind::Phrases);
                (item, prompt)
            }))
            .collect();

        let answer_key = self.read_out(&script).await;

        self.console.print_line(FINISHED_NOTICE);
        self.say(FINISHED_NOTICE).await;
        for line in &answer_key {
            self.console.print_line(line);
        }
        self.console.pause("Press Enter to exit")?;
        self.console.clear();

        Ok(answer_key)
    }

    /// Speak every prompt with the meaning-language voice
    async fn read_out(&mut self, script: &[(Item, String)]) -> Vec<String> {
        let narrator = self.narrator;
        let _voice = narrator.use_meaning_voice();
        let voice = narrator.active_voice();

        let report = narrator
            .pregenerate(script.iter().map(|(_, prompt)| prompt.as_str()), &voice)
            .await;
        for (text, error) in &report.failed {
            self.warn(&format!("could not prepare audio for {text:?}: {error}"));
        }

        if let Some(sound) = self.options.start_sound.clone() {
            self.console.clear();
            self.console.print_line(&style("READY GO!").yellow().to_string());
            if let Err(e) = self.narrator.play_file(&sound) {
                self.warn(&format!("start sound unavailable: {e}"));
            }
        }

        let total = script.len();
        let mut answer_key = Vec::with_capacity(total);

        for (index, (item, prompt)) in script.iter().enumerate() {
            let ordinal = index + 1;
            self.console.clear();
            self.console
                .print_line(&format!("--dictation--  item: {ordinal}  total: {total}\n\n"));
            self.console.print_line(&item.gloss());

            // Read twice
            self.say(prompt).await;
            self.say(prompt).await;
            tokio::time::sleep(self.options.delay).await;

            answer_key.push(answer_line(ordinal, item));
        }

        self.console.clear();
        answer_key
    }

    async fn say(&mut self, text: &str) {
        if let Err(e) = self.narrator.speak(text).await {
            self.warn(&format!("(audio unavailable: {e})"));
        }
    }

    fn warn(&mut self, message: &str) {
        tracing::warn!("{message}");
        self.console
            .print_line(&style(message).yellow().to_string());
    }
}
