//! Content-addressed store of synthesized speech
//!
//! Every `(voice, text)` pair maps to exactly one file in a flat cache
//! directory. The file name is derived from a SHA-256 over a length-prefixed
//! encoding of the pair, so distinct pairs never share a path and the file's
//! existence on disk is the only index.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use sha2::{Digest, Sha256};

use super::retry::{RetryPolicy, delay_for_attempt, is_retryable};
use super::tts::Synthesizer;
use crate::{Error, Result};

/// Extension of cached audio files
const AUDIO_EXTENSION: &str = "mp3";

/// Default number of synthesis requests in flight during pregeneration
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Maps `(text, voice)` to audio files, synthesizing on a miss
pub struct VoiceCache {
    dir: PathBuf,
    synthesizer: Arc<dyn Synthesizer>,
    retry: RetryPolicy,
    concurrency: usize,
    show_progress: bool,
    pinned: Arc<Mutex<HashSet<PathBuf>>>,
}

impl std::fmt::Debug for VoiceCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceCache")
            .field("dir", &self.dir)
            .field("retry", &self.retry)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

/// Outcome of a bulk pregeneration
#[derive(Debug, Default)]
pub struct PregenerateReport {
    /// Distinct non-blank texts requested
    pub requested: usize,
    /// Texts that were already cached
    pub cached: usize,
    /// Texts synthesized by this call
    pub generated: usize,
    /// Texts that could not be synthesized, with the reason
    pub failed: Vec<(String, Error)>,
}

impl PregenerateReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// A cache file that `clear` left in place
#[derive(Debug)]
pub struct ClearWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl std::fmt::Display for ClearWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "could not delete {}: {} (is another drill session running?)",
            self.path.display(),
            self.reason
        )
    }
}

/// Outcome of clearing the cache
#[derive(Debug, Default)]
pub struct ClearReport {
    pub removed: usize,
    pub warnings: Vec<ClearWarning>,
}

/// Marks a cache file as in use until dropped; `clear` skips pinned files
#[derive(Debug)]
pub struct PinGuard {
    path: PathBuf,
    pinned: Arc<Mutex<HashSet<PathBuf>>>,
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        self.pinned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
    }
}

impl VoiceCache {
    /// Open (and create if needed) a cache rooted at `dir`
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(dir: impl Into<PathBuf>, synthesizer: Arc<dyn Synthesizer>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        Ok(Self {
            dir,
            synthesizer,
            retry: RetryPolicy::default(),
            concurrency: DEFAULT_CONCURRENCY,
            show_progress: true,
            pinned: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Cap on concurrent synthesis requests during pregeneration (minimum 1)
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    #[must_use]
    pub const fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Deterministic path for `(text, voice)`
    #[must_use]
    pub fn path_for(&self, text: &str, voice: &str) -> PathBuf {
        self.dir.join(format!(
            "{}_{}.{AUDIO_EXTENSION}",
            sanitize_voice(voice),
            cache_key(text, voice)
        ))
    }

    /// Whether audio for `(text, voice)` is already on disk
    #[must_use]
    pub fn contains(&self, text: &str, voice: &str) -> bool {
        self.path_for(text, voice).is_file()
    }

    /// Return the cached file for `(text, voice)`, synthesizing it on a miss
    ///
    /// Synthesis is attempted up to the retry budget. A failure that retrying
    /// cannot fix (see [`is_retryable`]) ends the attempts early. Audio is
    /// written to a temporary file in the cache directory and renamed into
    /// place, so a failed or interrupted write never leaves a partial file at
    /// the path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Synthesis`] when every attempt fails or the request is rejected
    pub async fn ensure(&self, text: &str, voice: &str) -> Result<PathBuf> {
        let path = self.path_for(text, voice);
        if path.is_file() {
            tracing::trace!(path = %path.display(), "voice cache hit");
            return Ok(path);
        }

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempts = 0;
        let mut last_error = None;

        while attempts < max_attempts {
            if attempts > 0 {
                let delay = delay_for_attempt(&self.retry, attempts - 1);
                tokio::time::sleep(delay).await;
            }
            attempts += 1;

            match self.generate(text, voice, &path).await {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), attempts, "voice cached");
                    return Ok(path);
                }
                Err(e) if is_retryable(&e) => {
                    tracing::warn!(voice, attempts, error = %e, "synthesis attempt failed");
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::warn!(voice, error = %e, "synthesis rejected, not retrying");
                    last_error = Some(e);
                    break;
                }
            }
        }

        Err(Error::Synthesis {
            text: text.to_string(),
            voice: voice.to_string(),
            attempts,
            reason: last_error.map_or_else(|| "no attempt made".to_string(), |e| e.to_string()),
        })
    }

    /// One synthesis attempt, written atomically to `path`
    async fn generate(&self, text: &str, voice: &str, path: &Path) -> Result<()> {
        let audio = self.synthesizer.synthesize(text, voice).await?;
        if audio.is_empty() {
            return Err(Error::Tts {
                status: None,
                message: "synthesizer returned no audio".to_string(),
            });
        }

        // Dropping the temp file on any error below deletes the partial write
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&audio)?;
        tmp.flush()?;
        // Same content for the same key, so a concurrent writer winning the race is harmless
        tmp.persist(path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Synthesize every uncached text ahead of time
    ///
    /// Blank entries and duplicates are dropped, cached entries are skipped and
    /// the remainder is generated with at most `concurrency` requests in
    /// flight. All requests finish before this returns. A text that fails is
    /// reported and does not stop the rest of the batch.
    pub async fn pregenerate<I, S>(&self, texts: I, voice: &str) -> PregenerateReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let texts: Vec<String> = texts
            .into_iter()
            .filter(|t| !t.as_ref().trim().is_empty())
            .filter(|t| seen.insert(t.as_ref().to_string()))
            .map(|t| t.as_ref().to_string())
            .collect();

        let mut report = PregenerateReport {
            requested: texts.len(),
            ..PregenerateReport::default()
        };
        if texts.is_empty() {
            return report;
        }

        let (cached, missing): (Vec<String>, Vec<String>) =
            texts.into_iter().partition(|t| self.contains(t, voice));
        report.cached = cached.len();

        let progress = self.progress_bar(report.requested, voice);
        progress.inc(report.cached as u64);

        let results: Vec<(String, Result<PathBuf>)> = stream::iter(missing)
            .map(|text| {
                let progress = &progress;
                async move {
                    let result = self.ensure(&text, voice).await;
                    progress.inc(1);
                    (text, result)
                }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        progress.finish_and_clear();

        for (text, result) in results {
            match result {
                Ok(_) => report.generated += 1,
                Err(e) => {
                    tracing::warn!(voice, text = %text, error = %e, "pregeneration skipped item");
                    report.failed.push((text, e));
                }
            }
        }

        tracing::info!(
            voice,
            requested = report.requested,
            cached = report.cached,
            generated = report.generated,
            failed = report.failed.len(),
            "pregeneration finished"
        );

        report
    }

    fn progress_bar(&self, total: usize, voice: &str) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg} [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(format!("pregenerating ({voice})"));
        bar
    }

    /// Mark a cache file as in use by playback
    #[must_use]
    pub fn pin(&self, path: &Path) -> PinGuard {
        let path = path.to_path_buf();
        self.pinned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.clone());
        PinGuard {
            path,
            pinned: Arc::clone(&self.pinned),
        }
    }

    fn is_pinned(&self, path: &Path) -> bool {
        self.pinned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(path)
    }

    /// Delete every cached audio file
    ///
    /// Files in use by playback, or that the OS refuses to delete, are left in
    /// place and reported as warnings; the remaining files are still removed.
    ///
    /// # Errors
    ///
    /// Returns error only if the cache directory itself cannot be read
    pub fn clear(&self) -> Result<ClearReport> {
        clear_files(&self.dir, |path| self.is_pinned(path))
    }
}

/// Delete every cached audio file in `dir` without opening a cache
///
/// Used when no synthesizer is configured; nothing can be pinned then.
///
/// # Errors
///
/// Returns error only if the directory itself cannot be read
pub fn clear_dir(dir: &Path) -> Result<ClearReport> {
    clear_files(dir, |_| false)
}

fn clear_files(dir: &Path, is_pinned: impl Fn(&Path) -> bool) -> Result<ClearReport> {
    let mut report = ClearReport::default();

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(AUDIO_EXTENSION) {
            continue;
        }

        if is_pinned(&path) {
            report.warnings.push(ClearWarning {
                path,
                reason: "file is in use by playback".to_string(),
            });
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => report.removed += 1,
            Err(e) => report.warnings.push(ClearWarning {
                path,
                reason: e.to_string(),
            }),
        }
    }

    for warning in &report.warnings {
        tracing::warn!(path = %warning.path.display(), reason = %warning.reason, "cache file not removed");
    }
    tracing::info!(removed = report.removed, skipped = report.warnings.len(), "voice cache cleared");

    Ok(report)
}

/// Hex SHA-256 over `len(voice) ‖ voice ‖ text`
///
/// The length prefix makes the encoding injective: no two distinct
/// `(voice, text)` pairs produce the same byte string.
#[must_use]
pub fn cache_key(text: &str, voice: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update((voice.len() as u64).to_le_bytes());
    hasher.update(voice.as_bytes());
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Voice id reduced to characters safe in a file name
fn sanitize_voice(voice: &str) -> String {
    voice
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_deterministic() {
        assert_eq!(cache_key("hello", "en-GB"), cache_key("hello", "en-GB"));
        assert_eq!(cache_key("hello", "en-GB").len(), 64);
    }

    #[test]
    fn key_separates_field_boundaries() {
        assert_ne!(cache_key("ab", "c"), cache_key("a", "bc"));
        assert_ne!(cache_key("bc", "a"), cache_key("c", "ab"));
        assert_ne!(cache_key("", "ab"), cache_key("b", "a"));
    }

    #[test]
    fn key_depends_on_voice() {
        assert_ne!(cache_key("hello", "alloy"), cache_key("hello", "fable"));
    }

    #[test]
    fn sanitizes_voice_for_file_names() {
        assert_eq!(sanitize_voice("en-GB-SoniaNeural"), "en-GB-SoniaNeural");
        assert_eq!(sanitize_voice("../etc/x y"), "___etc_x_y");
    }

    #[test]
    fn clear_warning_mentions_path() {
        let warning = ClearWarning {
            path: PathBuf::from("/tmp/a.mp3"),
            reason: "busy".to_string(),
        };
        let text = warning.to_string();
        assert!(text.contains("/tmp/a.mp3"));
        assert!(text.contains("busy"));
    }
}
