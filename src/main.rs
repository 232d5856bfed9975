use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use tts_free::config::{Config, EngineKind};
use tts_free::document::{SplitMode, TextDocument};
use tts_free::playback::RodioPlayer;
use tts_free::pronunciation::PronunciationRules;
use tts_free::worker::SynthesisWorker;
use tts_free::{engines, export, gui, Command, Reader, SynthesisEngine};

/// Read a text file aloud, one line at a time.
#[derive(Parser, Debug)]
#[command(name = "tts-free", version, about)]
struct Cli {
    /// Text file to open at startup
    file: Option<PathBuf>,

    /// JSON config file; command-line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Preferred speech backend
    #[arg(long, value_enum)]
    engine: Option<EngineKind>,

    /// Voice id, e.g. bf_emma (Kokoro), en_GB-cori-high (Piper), en-gb+f2 (eSpeak)
    #[arg(long)]
    speaker: Option<String>,

    /// Kokoro model directory
    #[arg(long)]
    kokoro_dir: Option<PathBuf>,

    /// Kokoro speech speed, 0.5 to 2.0
    #[arg(long)]
    speed: Option<f32>,

    /// Path to the piper executable
    #[arg(long, env = "PIPER_BIN")]
    piper_bin: Option<PathBuf>,

    /// Directory holding Piper voice models; searched before the configured ones
    #[arg(long, env = "PIPER_MODEL_DIR")]
    piper_model_dir: Option<PathBuf>,

    /// Allow the robotic eSpeak NG fallback
    #[arg(long)]
    allow_espeak: bool,

    /// Play the new line after "Next"
    #[arg(long)]
    auto_play: bool,

    /// Only move the cursor on "Next"
    #[arg(long)]
    no_auto_play: bool,

    /// Continue with the next line when a clip finishes
    #[arg(long)]
    auto_advance: bool,

    /// Split lines into sentences
    #[arg(long)]
    sentences: bool,

    /// Pronunciation CSV with term,replacement columns
    #[arg(long)]
    pronunciation: Option<PathBuf>,

    /// Write each utterance of FILE to DIR as numbered WAVs instead of opening the window
    #[arg(long, value_name = "DIR", requires = "file")]
    export: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> Result<Config, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(engine) = self.engine {
            config.engine = engine;
        }
        if let Some(speaker) = &self.speaker {
            config.speaker = Some(speaker.clone());
        }
        if let Some(dir) = &self.kokoro_dir {
            config.kokoro.model_dir = dir.clone();
        }
        if let Some(speed) = self.speed {
            config.kokoro.speed = speed;
        }
        if let Some(bin) = &self.piper_bin {
            config.piper.binary = Some(bin.clone());
        }
        if let Some(dir) = &self.piper_model_dir {
            config.piper.model_dirs.insert(0, dir.clone());
        }
        if let Some(csv) = &self.pronunciation {
            config.pronunciation = Some(csv.clone());
        }
        config.allow_espeak |= self.allow_espeak;
        config.auto_advance |= self.auto_advance;
        if self.auto_play {
            config.auto_play = true;
        }
        if self.no_auto_play {
            config.auto_play = false;
        }
        if self.sentences {
            config.split_mode = SplitMode::Sentences;
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_logging() {
    let debug = std::env::var("TTS_FREE_DEBUG").is_ok_and(|v| v != "0" && !v.is_empty());
    let default_filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.config()?;

    if let (Some(out_dir), Some(file)) = (&cli.export, &cli.file) {
        let mut engine = engines::select(&config)?;
        let speaker = config.speaker_for(engine.as_ref());
        let document = TextDocument::load(file, config.split_mode)?;
        let rules = match &config.pronunciation {
            Some(csv) => PronunciationRules::load(csv)?,
            None => PronunciationRules::default(),
        };
        let written =
            export::export_document(engine.as_mut(), &document, &rules, &speaker, out_dir)?;
        log::info!("Wrote {} files to {}", written.len(), out_dir.display());
        return Ok(());
    }

    // The window still opens without a backend; every play then reports why.
    let mut notices = Vec::new();
    let engine: Box<dyn SynthesisEngine> = match engines::select(&config) {
        Ok(engine) => engine,
        Err(e) => {
            notices.push(e.to_string());
            Box::new(engines::Unavailable::new(e.to_string()))
        }
    };

    let worker = SynthesisWorker::spawn(engine)?;
    let mut reader = Reader::new(&config, worker, Box::new(RodioPlayer::new()));
    if let Some(csv) = &config.pronunciation {
        if let Err(e) = reader.dispatch(Command::LoadPronunciation(csv.clone())) {
            notices.push(e.to_string());
        }
    }

    gui::run(reader, config, cli.file, notices).map_err(|e| e.to_string())?;
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    log::debug!("{cli:?}");

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
