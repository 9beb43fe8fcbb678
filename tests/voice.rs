//! Voice cache and narrator integration tests
//!
//! Runs against a fake synthesizer and a recording player, no network or
//! audio hardware required

use std::sync::Arc;

use vocab_drill::voice::{AudioPlayer, clear_dir};
use vocab_drill::{Accent, Error, Narrator};

mod common;

use common::{FakeSynthesizer, RecordingPlayer, audio_files, profiles, test_cache, test_voice};

#[tokio::test]
async fn test_ensure_synthesizes_once() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynthesizer::new());
    let cache = test_cache(dir.path(), Arc::clone(&synth));

    let first = cache.ensure("hello", "gb").await.unwrap();
    let second = cache.ensure("hello", "gb").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(synth.calls(), 1);
    assert_eq!(std::fs::read_to_string(&first).unwrap(), "gb:hello");
    assert!(cache.contains("hello", "gb"));
}

#[tokio::test]
async fn test_distinct_pairs_get_distinct_files() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynthesizer::new());
    let cache = test_cache(dir.path(), Arc::clone(&synth));

    let a = cache.ensure("ab", "c").await.unwrap();
    let b = cache.ensure("a", "bc").await.unwrap();
    let c = cache.ensure("ab", "us").await.unwrap();

    assert_ne!(a, b);
    assert_ne!(a, c);
    assert_eq!(synth.calls(), 3);
    assert_eq!(audio_files(dir.path()).len(), 3);
}

#[tokio::test]
async fn test_pregenerate_skips_blanks_and_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynthesizer::new());
    let cache = test_cache(dir.path(), Arc::clone(&synth));

    let report = cache.pregenerate(["hello", "hello", "", "  "], "gb").await;
    assert_eq!(report.requested, 1);
    assert_eq!(report.generated, 1);
    assert!(report.is_complete());
    assert_eq!(synth.calls(), 1);

    let again = cache.pregenerate(["hello"], "gb").await;
    assert_eq!(again.cached, 1);
    assert_eq!(again.generated, 0);
    assert_eq!(synth.calls(), 1);
}

#[tokio::test]
async fn test_pregenerate_with_concurrency_limit() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynthesizer::new());
    let cache = test_cache(dir.path(), Arc::clone(&synth)).with_concurrency(2);

    let texts: Vec<String> = (0..10).map(|i| format!("word {i}")).collect();
    let report = cache.pregenerate(&texts, "us").await;

    assert_eq!(report.generated, 10);
    assert_eq!(synth.calls(), 10);
    for text in &texts {
        assert!(cache.contains(text, "us"));
    }
}

#[tokio::test]
async fn test_failed_synthesis_leaves_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynthesizer::broken());
    let cache = test_cache(dir.path(), Arc::clone(&synth));

    let err = cache.ensure("hello", "gb").await.unwrap_err();
    match err {
        Error::Synthesis {
            text,
            voice,
            attempts,
            ..
        } => {
            assert_eq!(text, "hello");
            assert_eq!(voice, "gb");
            assert_eq!(attempts, 3);
        }
        other => panic!("expected synthesis error, got {other:?}"),
    }

    assert_eq!(synth.calls(), 3);
    assert!(!cache.contains("hello", "gb"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynthesizer::failing_first(2));
    let cache = test_cache(dir.path(), Arc::clone(&synth));

    let path = cache.ensure("hello", "gb").await.unwrap();
    assert_eq!(synth.calls(), 3);
    assert!(path.is_file());
}

#[tokio::test]
async fn test_rejected_request_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynthesizer::rejecting());
    let cache = test_cache(dir.path(), Arc::clone(&synth));

    let err = cache.ensure("hello", "gb").await.unwrap_err();
    match err {
        Error::Synthesis {
            attempts, reason, ..
        } => {
            assert_eq!(attempts, 1);
            assert!(reason.contains("401"), "reason: {reason}");
        }
        other => panic!("expected synthesis error, got {other:?}"),
    }
    assert_eq!(synth.calls(), 1);

    let report = cache.pregenerate(["one", "two", "three"], "gb").await;
    assert_eq!(report.failed.len(), 3);
    // one request per item
    assert_eq!(synth.calls(), 4);
}

#[tokio::test]
async fn test_pregenerate_reports_failures_without_aborting() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynthesizer::broken());
    let cache = test_cache(dir.path(), Arc::clone(&synth));

    let report = cache.pregenerate(["one", "two"], "gb").await;
    assert_eq!(report.requested, 2);
    assert_eq!(report.generated, 0);
    assert_eq!(report.failed.len(), 2);
    assert!(!report.is_complete());
    // every item used its whole budget
    assert_eq!(synth.calls(), 6);
}

#[tokio::test]
async fn test_clear_skips_pinned_file() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynthesizer::new());
    let cache = test_cache(dir.path(), Arc::clone(&synth));

    let a = cache.ensure("a", "gb").await.unwrap();
    cache.ensure("b", "gb").await.unwrap();
    cache.ensure("c", "gb").await.unwrap();

    let pin = cache.pin(&a);
    let report = cache.clear().unwrap();
    assert_eq!(report.removed, 2);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].path, a);
    assert!(a.is_file());

    drop(pin);
    let report = cache.clear().unwrap();
    assert_eq!(report.removed, 1);
    assert!(report.warnings.is_empty());
    assert!(audio_files(dir.path()).is_empty());
}

#[tokio::test]
async fn test_clear_dir_only_touches_audio() {
    let dir = tempfile::tempdir().unwrap();
    let synth = Arc::new(FakeSynthesizer::new());
    let cache = test_cache(dir.path(), synth);
    cache.ensure("a", "gb").await.unwrap();
    std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

    let report = clear_dir(dir.path()).unwrap();
    assert_eq!(report.removed, 1);
    assert!(dir.path().join("notes.txt").is_file());
}

#[tokio::test]
async fn test_narrator_speaks_with_active_voice() {
    let dir = tempfile::tempdir().unwrap();
    let voice = test_voice(dir.path());

    voice.narrator.speak("cat").await.unwrap();
    voice.narrator.set_accent(Accent::American);
    voice.narrator.speak("cat").await.unwrap();
    {
        let _meaning = voice.narrator.use_meaning_voice();
        voice.narrator.speak("猫").await.unwrap();
    }
    voice.narrator.speak("dog").await.unwrap();

    assert_eq!(
        voice.player.played(),
        ["gb:cat", "us:cat", "zh:猫", "us:dog"]
    );
    assert_eq!(voice.synthesizer.calls(), 4);
}

#[tokio::test]
async fn test_speak_blank_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let voice = test_voice(dir.path());

    voice.narrator.speak("").await.unwrap();
    voice.narrator.speak("   ").await.unwrap();

    assert_eq!(voice.synthesizer.calls(), 0);
    assert!(voice.player.played().is_empty());
    assert!(audio_files(&voice.dir).is_empty());
}

#[tokio::test]
async fn test_speak_reports_synthesis_failure() {
    let dir = tempfile::tempdir().unwrap();
    let player = Arc::new(RecordingPlayer::new());
    let cache = test_cache(dir.path(), Arc::new(FakeSynthesizer::broken()));
    let narrator = Narrator::new(
        Arc::new(cache),
        Arc::clone(&player) as Arc<dyn AudioPlayer>,
        profiles(),
        Accent::British,
    );

    let err = narrator.speak("cat").await.unwrap_err();
    assert!(matches!(err, Error::Synthesis { .. }));
    assert!(player.played().is_empty());
}

#[tokio::test]
async fn test_silent_narrator_never_plays() {
    let narrator = Narrator::silent(profiles(), Accent::British);
    assert!(narrator.is_silent());
    narrator.speak("cat").await.unwrap();
    let report = narrator.pregenerate(["cat"], "gb").await;
    assert_eq!(report.requested, 0);
}

#[test]
fn test_stop_reaches_player() {
    let dir = tempfile::tempdir().unwrap();
    let voice = test_voice(dir.path());
    voice.narrator.stop();
    assert_eq!(voice.player.stops(), 1);
}
