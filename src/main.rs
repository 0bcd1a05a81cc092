//! Echo - a multi-modal assistant in the terminal
//!
//! Type to talk. Slash commands drive the microphone, camera and audio.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use echo::asr::{AsrEngine, WyomingRecognizer};
use echo::audio::{AmbientMixer, SilentMixer, SoundEngine};
use echo::config::{self, Config, ConfigSource, VisionPolicyKind};
use echo::orchestrator::{Command, Orchestrator, OrchestratorHandle};
use echo::presenter::{Notice, NoticeLevel, Presenter};
use echo::session::{Mode, Speaker, TranscriptEntry};
use echo::tts;
use echo::vision::{SceneAnalyzer, SimulatedCamera};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    OneShot,
    Continuous,
}

impl From<PolicyArg> for VisionPolicyKind {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::OneShot => VisionPolicyKind::OneShot,
            PolicyArg::Continuous => VisionPolicyKind::Continuous,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start with speech output muted
    #[arg(long)]
    mute: bool,

    /// Camera analysis policy, overriding the config
    #[arg(long, value_enum)]
    vision_policy: Option<PolicyArg>,

    /// Disable speech synthesis entirely
    #[arg(long)]
    no_speech: bool,

    /// Write the default config file and exit
    #[arg(long)]
    write_default_config: bool,
}

/// Prints the conversation and status to the terminal
struct ConsolePresenter {
    name: String,
}

impl Presenter for ConsolePresenter {
    fn transcript_appended(&self, entry: &TranscriptEntry) {
        print_entry(&self.name, entry);
    }

    fn mode_changed(&self, mode: Mode) {
        let orb = match mode {
            Mode::Idle => "○",
            Mode::Listening => "◉",
            Mode::Thinking => "◌",
            Mode::Speaking => "◎",
            Mode::Analyzing => "◈",
        };
        println!("   {} {}", orb, mode);
    }

    fn notify(&self, notice: &Notice) {
        match notice.level {
            NoticeLevel::Info => println!("ℹ️  {}", notice.message),
            NoticeLevel::Warning => eprintln!("⚠️  {}", notice.message),
            NoticeLevel::Error => eprintln!("❌ {}", notice.message),
        }
    }
}

fn print_entry(name: &str, entry: &TranscriptEntry) {
    let speaker = match entry.speaker {
        Speaker::User => "You",
        Speaker::Assistant => name,
    };
    println!(
        "[{}] {}: {}",
        entry.timestamp.format("%H:%M:%S"),
        speaker,
        entry.text
    );
}

/// One line of terminal input
#[derive(Debug)]
enum ConsoleInput {
    Send(Command),
    Help,
    History,
    Quit,
    Unknown(String),
    Empty,
}

fn parse_input(line: &str) -> ConsoleInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ConsoleInput::Empty;
    }
    if !trimmed.starts_with('/') {
        return ConsoleInput::Send(Command::SubmitText(line.to_string()));
    }

    match trimmed {
        "/listen" => ConsoleInput::Send(Command::StartListening),
        "/stop-listening" => ConsoleInput::Send(Command::StopListening),
        "/camera" => ConsoleInput::Send(Command::ToggleCamera),
        "/mute" => ConsoleInput::Send(Command::SetMuted(true)),
        "/unmute" => ConsoleInput::Send(Command::SetMuted(false)),
        "/stop" => ConsoleInput::Send(Command::StopSpeaking),
        "/quiet" => ConsoleInput::Send(Command::StopAmbient),
        "/story" => ConsoleInput::Send(Command::Story),
        "/music" => ConsoleInput::Send(Command::Music),
        "/help" => ConsoleInput::Help,
        "/history" => ConsoleInput::History,
        "/quit" | "/exit" => ConsoleInput::Quit,
        other => ConsoleInput::Unknown(other.to_string()),
    }
}

fn print_help() {
    println!("Commands:");
    println!("  /listen          speak instead of typing");
    println!("  /stop-listening  cancel voice input");
    println!("  /camera          open or close the camera");
    println!("  /mute, /unmute   toggle spoken replies");
    println!("  /stop            stop the current reply");
    println!("  /quiet           stop ambient audio");
    println!("  /story, /music   quick actions");
    println!("  /history         show the conversation");
    println!("  /quit            exit");
}

async fn read_stdin(handle: OrchestratorHandle, name: String) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read input: {}", e);
                break;
            }
        };

        match parse_input(&line) {
            ConsoleInput::Send(command) => {
                if handle.send(command).is_err() {
                    break;
                }
            }
            ConsoleInput::Help => print_help(),
            ConsoleInput::History => match handle.transcript().await {
                Ok(entries) => entries.iter().for_each(|e| print_entry(&name, e)),
                Err(_) => break,
            },
            ConsoleInput::Quit => break,
            ConsoleInput::Unknown(command) => {
                println!("Unknown command {}. Type /help for the list.", command)
            }
            ConsoleInput::Empty => {}
        }
    }

    let _ = handle.shutdown();
}

fn init_logging(verbose: bool, config_level: &str) {
    let default_level = if verbose {
        "debug".to_string()
    } else {
        config_level.to_lowercase()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(config::config_path);
    if args.write_default_config {
        Config::default().save_to(&config_path)?;
        println!("Wrote default config to {}", config_path.display());
        return Ok(());
    }

    let (mut config, source) = Config::load_from(&config_path)?;
    init_logging(args.verbose, &config.log_level);
    info!("🤖 Echo v{} starting...", env!("CARGO_PKG_VERSION"));
    if let ConfigSource::Recovered { backup, reason } = &source {
        warn!(
            "⚠️ Config file corrupted or invalid, using defaults: {} (moved to {})",
            reason,
            backup.display()
        );
    }

    if let Some(policy) = args.vision_policy {
        config.vision.policy = policy.into();
    }
    if args.no_speech {
        config.voice.engine = "none".to_string();
    }

    let tts = tts::create_engine(&config);
    let asr = WyomingRecognizer::connect(&config.recognition)
        .await
        .map(|r| Arc::new(r) as Arc<dyn AsrEngine>);

    let mixer: Arc<dyn AmbientMixer> = match SoundEngine::new() {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            warn!("🔇 Ambient audio disabled: {}", e);
            Arc::new(SilentMixer)
        }
    };

    let camera = if config.vision.deny_access {
        SimulatedCamera::denying()
    } else {
        SimulatedCamera::new()
    };

    let name = config.assistant.name.clone();
    let mut orchestrator = Orchestrator::builder(config)
        .with_tts(tts)
        .with_asr(asr)
        .with_vision(Arc::new(camera), Arc::new(SceneAnalyzer::new()))
        .with_mixer(mixer)
        .with_presenter(Box::new(ConsolePresenter { name: name.clone() }))
        .build();

    if args.mute {
        orchestrator.set_muted(true);
    }

    println!("Type a message, or /help for commands.");
    let (handle, commands) = OrchestratorHandle::channel();
    tokio::spawn(read_stdin(handle, name));

    orchestrator.run(commands).await;
    Ok(())
}
