//! Shared test utilities

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vocab_drill::voice::{AudioPlayer, RetryPolicy, Synthesizer, VoiceCache, VoiceProfiles};
use vocab_drill::{Accent, Console, Error, Narrator, Result};

/// Synthesizer that returns `voice:text` as the audio bytes
#[derive(Default)]
pub struct FakeSynthesizer {
    calls: AtomicUsize,
    failures_left: AtomicUsize,
    always_fail: bool,
    reject: bool,
}

impl FakeSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the first `n` requests, then succeeds
    pub fn failing_first(n: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(n),
            ..Self::default()
        }
    }

    /// Never succeeds; every request fails with a 503
    pub fn broken() -> Self {
        Self {
            always_fail: true,
            ..Self::default()
        }
    }

    /// Refuses every request with a 401, as with a bad API key
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Synthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.reject {
            return Err(Error::Tts {
                status: Some(401),
                message: "401 Unauthorized: invalid api key".to_string(),
            });
        }
        if self.always_fail {
            return Err(Error::Tts {
                status: Some(503),
                message: "503 Service Unavailable".to_string(),
            });
        }
        let transient = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if transient {
            return Err(Error::Tts {
                status: None,
                message: "timeout".to_string(),
            });
        }

        Ok(format!("{voice}:{text}").into_bytes())
    }
}

/// Player that records what it was asked to play instead of making sound
#[derive(Default)]
pub struct RecordingPlayer {
    played: Mutex<Vec<String>>,
    stops: AtomicUsize,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of every played file, in order (`voice:text` for cached audio)
    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl AudioPlayer for RecordingPlayer {
    fn play_file(&self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Playback(format!("{}: {e}", path.display())))?;
        self.played.lock().unwrap().push(content);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Console that answers prompts from a script keyed by the item's gloss
///
/// A quiz prompt reads `<gloss>: <tip>`; each read pops the next scripted
/// reply for the gloss. Pauses never consume replies.
#[derive(Default)]
pub struct ScriptedConsole {
    replies: HashMap<String, VecDeque<String>>,
    pub output: Vec<String>,
    pub prompts: Vec<String>,
    pub pauses: usize,
    pub clears: usize,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for the item whose gloss is `gloss`
    pub fn answer(mut self, gloss: &str, replies: &[&str]) -> Self {
        self.replies
            .entry(gloss.to_string())
            .or_default()
            .extend(replies.iter().map(|r| (*r).to_string()));
        self
    }

    /// Whether any printed line contains `needle`
    pub fn printed(&self, needle: &str) -> bool {
        self.output.iter().any(|line| line.contains(needle))
    }
}

impl Console for ScriptedConsole {
    fn clear(&mut self) {
        self.clears += 1;
    }

    fn print_line(&mut self, text: &str) {
        self.output.push(text.to_string());
    }

    fn read_line(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_string());
        self.replies
            .iter_mut()
            .find(|(gloss, _)| prompt.starts_with(&format!("{gloss}:")))
            .and_then(|(_, queue)| queue.pop_front())
            .ok_or_else(|| Error::Input(format!("no scripted reply for {prompt:?}")))
    }

    fn pause(&mut self, _prompt: &str) -> Result<()> {
        self.pauses += 1;
        Ok(())
    }
}

pub fn profiles() -> VoiceProfiles {
    VoiceProfiles {
        meaning: "zh".to_string(),
        british: "gb".to_string(),
        american: "us".to_string(),
    }
}

/// Cache in `dir` with no retry delays and no progress bar
pub fn test_cache(dir: &Path, synthesizer: Arc<FakeSynthesizer>) -> VoiceCache {
    VoiceCache::new(dir, synthesizer)
        .expect("failed to create cache")
        .with_retry(RetryPolicy::immediate())
        .with_progress(false)
}

/// Narrator wired to fakes, plus handles to inspect them
pub struct TestVoice {
    pub narrator: Narrator,
    pub synthesizer: Arc<FakeSynthesizer>,
    pub player: Arc<RecordingPlayer>,
    pub dir: PathBuf,
}

pub fn test_voice(dir: &Path) -> TestVoice {
    let synthesizer = Arc::new(FakeSynthesizer::new());
    let player = Arc::new(RecordingPlayer::new());
    let cache = test_cache(dir, Arc::clone(&synthesizer));
    let narrator = Narrator::new(
        Arc::new(cache),
        Arc::clone(&player) as Arc<dyn AudioPlayer>,
        profiles(),
        Accent::British,
    );

    TestVoice {
        narrator,
        synthesizer,
        player,
        dir: dir.to_path_buf(),
    }
}

/// Cached audio files in `dir`
pub fn audio_files(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "mp3"))
        .collect()
}
