use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use secrecy::{ExposeSecret, SecretString};
use tracing_subscriber::EnvFilter;

use vocab_drill::config::LoadOptions;
use vocab_drill::dictation::DictationOptions;
use vocab_drill::quiz::QuizOptions;
use vocab_drill::settings::settings_path;
use vocab_drill::voice::{AudioPlayback, HttpSynthesizer, Narrator, VoiceCache};
use vocab_drill::{
    Accent, Config, DictationSession, Profile, QuizEngine, Settings, TerminalConsole, Unit,
    WordBooks, browse, menu,
};

/// Vocab - Drill words and phrases until they stick
#[derive(Parser)]
#[command(name = "vocab", version, about)]
struct Cli {
    /// Directory holding configurations.json and data/
    #[arg(long, env = "VOCAB_BOOKS_DIR")]
    books_dir: Option<PathBuf>,

    /// Do not speak (no synthesis, no playback)
    #[arg(long, env = "VOCAB_MUTE")]
    mute: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Quiz a profile until every item is answered correctly
    Quiz {
        /// Profile name
        #[arg(short, long)]
        profile: String,
        /// Show and speak every item before asking for it
        #[arg(long)]
        reveal: bool,
        /// Never reveal items first, even if the profile asks for it
        #[arg(long, conflicts_with = "reveal")]
        no_reveal: bool,
        /// Give away the first letter of each answer
        #[arg(long)]
        first_letter_tip: bool,
    },
    /// Read a profile aloud for dictation
    Dictation {
        /// Profile name
        #[arg(short, long)]
        profile: String,
        /// Seconds to wait after each item
        #[arg(long)]
        delay: Option<u64>,
        /// Skip the start sound
        #[arg(long)]
        no_start_sound: bool,
    },
    /// List every item of a profile
    Browse {
        /// Profile name
        #[arg(short, long)]
        profile: String,
    },
    /// Synthesize the spoken answers of a profile ahead of time
    Pregenerate {
        /// Profile name
        #[arg(short, long)]
        profile: String,
    },
    /// Delete cached audio
    ClearCache,
    /// Show or change the foreign-language accent
    Accent {
        #[arg(value_enum, default_value = "show")]
        action: AccentAction,
    },
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// List available profiles
    Profiles,
}

#[derive(Clone, Copy, ValueEnum)]
enum AccentAction {
    Show,
    British,
    American,
    Toggle,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Quiz screens stay clean unless asked otherwise
    let filter = match cli.verbose {
        0 => "warn",
        1 => "warn,vocab_drill=info",
        2 => "info,vocab_drill=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_with_options(LoadOptions {
        books_dir: cli.books_dir,
        mute: cli.mute,
    })?;
    tracing::debug!(?config, "loaded configuration");

    let books = WordBooks::new(&config.books_dir);
    let settings_file = settings_path(&config.data_dir);
    let mut settings = Settings::load(&settings_file);

    let Some(cmd) = cli.command else {
        return interactive(&config, &books, settings.accent).await;
    };

    match cmd {
        Command::Quiz {
            profile,
            reveal,
            no_reveal,
            first_letter_tip,
        } => {
            let profile = books.profile(&profile)?;
            let requested = if reveal {
                Some(true)
            } else if no_reveal {
                Some(false)
            } else {
                None
            };
            let options = QuizOptions {
                reveal: menu::reveal_mode(requested, &profile),
                first_letter_tip: first_letter_tip || wants_first_letter_tip(&config, &profile),
            };
            let unit = books.resolve(&profile)?;
            let narrator = build_narrator(&config, settings.accent)?;
            quiz(&narrator, &unit, options).await
        }
        Command::Dictation {
            profile,
            delay,
            no_start_sound,
        } => {
            let unit = books.resolve(&books.profile(&profile)?)?;
            let mut options = dictation_options(&config);
            if let Some(secs) = delay {
                options.delay = Duration::from_secs(secs);
            }
            if no_start_sound {
                options.start_sound = None;
            }
            let narrator = build_narrator(&config, settings.accent)?;
            dictation(&narrator, &unit, options).await
        }
        Command::Browse { profile } => {
            let unit = books.resolve(&books.profile(&profile)?)?;
            browse::browse(&unit, &mut TerminalConsole::new())?;
            Ok(())
        }
        Command::Pregenerate { profile } => {
            let unit = books.resolve(&books.profile(&profile)?)?;
            pregenerate(&config, settings.accent, &unit).await
        }
        Command::ClearCache => clear_cache(&config),
        Command::Accent { action } => {
            let accent = match action {
                AccentAction::Show => settings.accent,
                AccentAction::Toggle => settings.toggle_accent(&settings_file)?,
                AccentAction::British | AccentAction::American => {
                    settings.accent = if matches!(action, AccentAction::British) {
                        Accent::British
                    } else {
                        Accent::American
                    };
                    settings.save(&settings_file)?;
                    settings.accent
                }
            };
            println!("accent: {accent}");
            Ok(())
        }
        Command::TestTts { text } => test_tts(&config, settings.accent, &text).await,
        Command::Profiles => {
            for profile in books.profiles()? {
                println!("{}", profile.display_name());
            }
            Ok(())
        }
    }
}

/// Menu-driven session (no subcommand)
async fn interactive(config: &Config, books: &WordBooks, accent: Accent) -> anyhow::Result<()> {
    let profiles = books.profiles()?;
    let choice = menu::choose_session(&profiles)?;
    let unit = books.resolve(&choice.profile)?;
    let narrator = build_narrator(config, accent)?;

    if choice.dictation {
        dictation(&narrator, &unit, dictation_options(config)).await
    } else {
        let options = QuizOptions {
            reveal: choice.reveal,
            first_letter_tip: wants_first_letter_tip(config, &choice.profile),
        };
        quiz(&narrator, &unit, options).await
    }
}

fn wants_first_letter_tip(config: &Config, profile: &Profile) -> bool {
    profile.other_args.first_letter_tip || config.quiz.first_letter_tip
}

fn dictation_options(config: &Config) -> DictationOptions {
    DictationOptions {
        delay: config.dictation.delay,
        start_sound: config.dictation.start_sound.clone(),
    }
}

async fn quiz(narrator: &Narrator, unit: &Unit, options: QuizOptions) -> anyhow::Result<()> {
    let mut console = TerminalConsole::new();
    let report = QuizEngine::new(narrator, &mut console, options)
        .run_quiz(unit)
        .await?;
    println!(
        "All {} items mastered in {} round(s), {} miss(es).",
        unit.len(),
        report.round_count(),
        report.total_wrong()
    );
    Ok(())
}

async fn dictation(
    narrator: &Narrator,
    unit: &Unit,
    options: DictationOptions,
) -> anyhow::Result<()> {
    let mut console = TerminalConsole::new();
    DictationSession::new(narrator, &mut console, options)
        .run(unit)
        .await?;
    Ok(())
}

/// Voice cache backed by the configured TTS provider
fn build_cache(config: &Config) -> anyhow::Result<VoiceCache> {
    let key = config
        .api_keys
        .for_provider(config.voice.provider)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no API key for {:?}; set it in the config file or environment",
                config.voice.provider
            )
        })?;

    let synthesizer = HttpSynthesizer::with_model(
        config.voice.provider,
        SecretString::from(key.expose_secret().to_owned()),
        config.voice.speed,
        config.voice.model.clone(),
    )?;

    Ok(VoiceCache::new(&config.cache_dir, Arc::new(synthesizer))?
        .with_concurrency(config.voice.concurrency)
        .with_progress(true))
}

/// Narrator for a session; silent when voice is off or no device is present
fn build_narrator(config: &Config, accent: Accent) -> anyhow::Result<Narrator> {
    let profiles = config.voice.profiles.clone();
    if !config.voice.enabled {
        return Ok(Narrator::silent(profiles, accent));
    }

    let player = match AudioPlayback::new() {
        Ok(player) => player,
        Err(e) => {
            tracing::warn!(error = %e, "audio output unavailable, continuing without voice");
            return Ok(Narrator::silent(profiles, accent));
        }
    };

    let cache = build_cache(config)?;
    Ok(Narrator::new(
        Arc::new(cache),
        Arc::new(player),
        profiles,
        accent,
    ))
}

async fn pregenerate(config: &Config, accent: Accent, unit: &Unit) -> anyhow::Result<()> {
    let cache = build_cache(config)?;
    let voice = config.voice.profiles.foreign(accent);

    let report = cache
        .pregenerate(unit.items().map(|i| i.key_text.as_str()), voice)
        .await;

    println!(
        "{} requested, {} already cached, {} generated",
        report.requested, report.cached, report.generated
    );
    for (text, error) in &report.failed {
        println!("  failed: {text:?}: {error}");
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        anyhow::bail!("{} item(s) could not be synthesized", report.failed.len())
    }
}

fn clear_cache(config: &Config) -> anyhow::Result<()> {
    if !config.cache_dir.exists() {
        println!("cache is empty");
        return Ok(());
    }

    let report = vocab_drill::voice::clear_dir(&config.cache_dir)?;
    println!("removed {} cached file(s)", report.removed);
    for warning in &report.warnings {
        println!("  skipped {}: {}", warning.path.display(), warning.reason);
    }
    Ok(())
}

/// Test TTS output through the cache
async fn test_tts(config: &Config, accent: Accent, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let cache = build_cache(config)?;
    let voice = config.voice.profiles.foreign(accent);

    println!("Synthesizing speech ({voice})...");
    let path = cache.ensure(text, voice).await?;
    println!("Cached at {}", path.display());

    let narrator = Narrator::new(
        Arc::new(cache),
        Arc::new(AudioPlayback::new()?),
        config.voice.profiles.clone(),
        accent,
    );
    println!("Playing...");
    narrator.speak_with(text, voice).await?;

    println!("\n---");
    println!("If you heard the speech, TTS and playback are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");
    println!("  3. Try: pavucontrol (to check output levels)");

    Ok(())
}
