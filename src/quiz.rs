//! Retry-until-mastered vocabulary quiz
//!
//! A round walks every item of a section in random order. Each item is asked
//! until the learner types it exactly; items missed at least once come back in
//! the next round. Rounds repeat until one finishes without a miss in either
//! section.

use console::style;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::item::{Item, RoundResult, Section, SectionKind, Unit};
use crate::terminal::Console;
use crate::voice::Narrator;
use crate::Result;

/// How items are presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuizOptions {
    /// Show and speak every item before asking for it
    pub reveal: bool,
    /// Give away the first letter of the answer
    pub first_letter_tip: bool,
}

/// Counts for one completed round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSummary {
    pub words: usize,
    pub phrases: usize,
    pub wrong_words: usize,
    pub wrong_phrases: usize,
}

impl RoundSummary {
    #[must_use]
    pub const fn wrong(&self) -> usize {
        self.wrong_words + self.wrong_phrases
    }
}

/// Outcome of a full quiz
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuizReport {
    pub rounds: Vec<RoundSummary>,
}

impl QuizReport {
    #[must_use]
    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Misses summed over all rounds
    #[must_use]
    pub fn total_wrong(&self) -> usize {
        self.rounds.iter().map(RoundSummary::wrong).sum()
    }
}

/// Drives the quiz over a console, speaking through a narrator
pub struct QuizEngine<'a> {
    narrator: &'a Narrator,
    console: &'a mut dyn Console,
    rng: StdRng,
    options: QuizOptions,
}

impl<'a> QuizEngine<'a> {
    pub fn new(narrator: &'a Narrator, console: &'a mut dyn Console, options: QuizOptions) -> Self {
        Self::with_rng(narrator, console, options, StdRng::from_entropy())
    }

    /// Engine with a caller-supplied random source for the presentation order
    pub fn with_rng(
        narrator: &'a Narrator,
        console: &'a mut dyn Console,
        options: QuizOptions,
        rng: StdRng,
    ) -> Self {
        Self {
            narrator,
            console,
            rng,
            options,
        }
    }

    /// Drill a unit until every word and phrase has been answered correctly
    ///
    /// The spoken answers are synthesized up front. Each round covers the words
    /// and then the phrases; the items missed in a round form the next round.
    /// There is no round limit.
    ///
    /// # Errors
    ///
    /// Returns error if learner input cannot be read
    pub async fn run_quiz(&mut self, unit: &Unit) -> Result<QuizReport> {
        self.pregenerate(unit).await;

        let mut report = QuizReport::default();
        let mut current = unit.clone();

        loop {
            self.console.clear();
            let wrong_words = self.drill_section(&current.words, 0).await?;
            let wrong_phrases = self
                .drill_section(&current.phrases, wrong_words.len())
                .await?;
            self.console.clear();

            let summary = RoundSummary {
                words: current.words.len(),
                phrases: current.phrases.len(),
                wrong_words: wrong_words.len(),
                wrong_phrases: wrong_phrases.len(),
            };
            tracing::info!(
                round = report.rounds.len() + 1,
                wrong_words = summary.wrong_words,
                wrong_phrases = summary.wrong_phrases,
                "round finished"
            );
            report.rounds.push(summary);

            let next = Unit::new(wrong_words, wrong_phrases);
            if next.is_empty() {
                return Ok(report);
            }
            current = next;
        }
    }

    /// One pass over a section
    ///
    /// Returns the items missed at least once, each listed once, in the order
    /// they were first missed. `wrong_offset` is the miss count carried over
    /// from earlier sections of the round and only affects the status line.
    ///
    /// # Errors
    ///
    /// Returns error if learner input cannot be read
    pub async fn drill_section(
        &mut self,
        section: &Section,
        wrong_offset: usize,
    ) -> Result<RoundResult> {
        let mut order = section.items.clone();
        order.shuffle(&mut self.rng);

        let mut remaining = order.len();
        let mut wrong: RoundResult = Vec::new();

        for item in &order {
            let mut failed = false;
            let mut last_wrong_input = String::new();

            loop {
                self.console.clear();
                self.print_status(section.kind, remaining, wrong.len() + wrong_offset);

                if failed {
                    self.console.print_line(&format!(
                        "That is wrong: {}",
                        style(&last_wrong_input).red()
                    ));
                }

                if self.options.reveal || failed {
                    self.teach(item, section.kind).await?;
                    self.console.clear();
                    self.print_status(section.kind, remaining, wrong.len() + wrong_offset);
                }

                let tip = if self.options.first_letter_tip {
                    item.key_text.chars().next().map(String::from).unwrap_or_default()
                } else {
                    String::new()
                };
                let prompt = format!("{}: {tip}", item.gloss());
                let reply = self.console.read_line(&prompt)?;
                let answer = format!("{tip}{reply}").trim().to_string();

                if answer == item.key_text {
                    self.console.print_line(&format!(
                        "{}: {} {}",
                        item.gloss(),
                        style(&answer).green(),
                        item.phonetic_symbol()
                    ));
                    self.say(&answer).await;
                    self.console.clear();
                    remaining -= 1;
                    break;
                }

                if !failed {
                    wrong.push(item.clone());
                    failed = true;
                }
                tracing::debug!(expected = %item.key_text, answer = %answer, "wrong answer");
                last_wrong_input = answer;
            }
        }

        Ok(wrong)
    }

    async fn pregenerate(&mut self, unit: &Unit) {
        let voice = self.narrator.foreign_voice();
        let report = self
            .narrator
            .pregenerate(unit.items().map(|i| i.key_text.as_str()), &voice)
            .await;

        for (text, error) in &report.failed {
            self.console.print_line(
                &style(format!("could not prepare audio for {text:?}: {error}"))
                    .yellow()
                    .to_string(),
            );
        }
    }

    /// Show every field of the item and speak its answer
    async fn teach(&mut self, item: &Item, kind: SectionKind) -> Result<()> {
        for line in item_table(item, kind) {
            self.console.print_line(&line);
        }
        self.say(&item.key_text).await;
        self.console.pause("Press Enter to continue")
    }

    /// Speak, reporting failures on screen instead of ending the quiz
    async fn say(&mut self, text: &str) {
        if let Err(e) = self.narrator.speak(text).await {
            tracing::warn!(error = %e, "speech failed");
            self.console
                .print_line(&style(format!("(audio unavailable: {e})")).yellow().to_string());
        }
    }

    fn print_status(&mut self, kind: SectionKind, remaining: usize, wrong: usize) {
        self.console
            .print_line(&format!("--{kind}--  remaining: {remaining}  wrong: {wrong}\n\n"));
    }
}

/// Field-per-line view of an item, optional fields only when present
#[must_use]
pub fn item_table(item: &Item, kind: SectionKind) -> Vec<String> {
    let mut rows = vec![
        (kind.key_field(), item.key_text.as_str()),
        ("meaning", item.meaning.as_str()),
    ];
    if let Some(pos) = &item.part_of_speech {
        rows.push(("part_of_speech", pos));
    }
    if let Some(symbol) = &item.phonetic_symbol {
        rows.push(("phonetic_symbol", symbol));
    }

    rows.into_iter()
        .map(|(field, value)| format!("{field:<16} {value}"))
        .collect()
}
