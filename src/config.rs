use std::path::{Path, PathBuf};

use derive_builder::Builder;
use serde::Deserialize;

use crate::document::SplitMode;
use crate::error::ConfigError;
use crate::SynthesisEngine;

/// Speech backends, in the order they are tried when the preferred one fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    #[default]
    Kokoro,
    Piper,
    Espeak,
}

impl EngineKind {
    /// The preferred engine followed by the remaining fallbacks.
    ///
    /// eSpeak NG is only included when allowed, or when it was asked for.
    pub fn fallback_order(self, allow_espeak: bool) -> Vec<EngineKind> {
        let mut order = vec![self];
        for kind in [EngineKind::Kokoro, EngineKind::Piper] {
            if kind != self {
                order.push(kind);
            }
        }
        if allow_espeak && self != EngineKind::Espeak {
            order.push(EngineKind::Espeak);
        }
        order
    }

    /// Engines a user may switch to at runtime.
    pub fn selectable(allow_espeak: bool) -> Vec<EngineKind> {
        let mut kinds = vec![EngineKind::Kokoro, EngineKind::Piper];
        if allow_espeak {
            kinds.push(EngineKind::Espeak);
        }
        kinds
    }

    pub fn label(self) -> &'static str {
        match self {
            EngineKind::Kokoro => "Kokoro",
            EngineKind::Piper => "Piper",
            EngineKind::Espeak => "eSpeak NG",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct KokoroSettings {
    /// Directory holding the `.onnx` model, `voices-v1.0.bin` and `config.json`.
    pub model_dir: PathBuf,
    /// Number of CPU threads for inference. `None` uses the ORT default.
    pub num_threads: Option<usize>,
    /// Speech speed multiplier, 0.5 to 2.0.
    pub speed: f32,
}

impl Default for KokoroSettings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/kokoro"),
            num_threads: None,
            speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PiperSettings {
    /// Path to the `piper` executable. Falls back to `./piper/piper`.
    pub binary: Option<PathBuf>,
    /// Directories searched for `<voice>.onnx` models, in order.
    pub model_dirs: Vec<PathBuf>,
}

impl Default for PiperSettings {
    fn default() -> Self {
        Self {
            binary: None,
            model_dirs: vec![PathBuf::from("piper")],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EspeakSettings {
    /// Path to `espeak-ng`. Falls back to `espeak-ng` then `espeak` on PATH.
    pub binary: Option<PathBuf>,
    /// Words per minute.
    pub rate: u32,
    pub pitch: u32,
}

impl Default for EspeakSettings {
    fn default() -> Self {
        Self {
            binary: None,
            rate: 180,
            pitch: 50,
        }
    }
}

/// Application configuration.
///
/// Built from defaults, then an optional JSON file, then command-line flags.
/// Engines receive the parts they need at construction time.
#[derive(Debug, Clone, PartialEq, Deserialize, Builder)]
#[builder(default, build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct Config {
    #[builder(setter(into))]
    pub engine: EngineKind,
    /// Voice to speak with. `None` uses the engine's default voice.
    #[builder(setter(into, strip_option))]
    pub speaker: Option<String>,
    /// Permit the robotic eSpeak NG fallback.
    pub allow_espeak: bool,
    /// Play the new current line after "Next".
    pub auto_play: bool,
    /// Advance and play the next line when a clip finishes on its own.
    pub auto_advance: bool,
    pub split_mode: SplitMode,
    /// Pronunciation CSV to load at startup.
    #[builder(setter(into, strip_option))]
    pub pronunciation: Option<PathBuf>,
    pub kokoro: KokoroSettings,
    pub piper: PiperSettings,
    pub espeak: EspeakSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineKind::default(),
            speaker: None,
            allow_espeak: false,
            auto_play: true,
            auto_advance: false,
            split_mode: SplitMode::default(),
            pronunciation: None,
            kokoro: KokoroSettings::default(),
            piper: PiperSettings::default(),
            espeak: EspeakSettings::default(),
        }
    }
}

impl Config {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check(self.speaker.as_deref(), self.kokoro.speed).map_err(ConfigError::Invalid)
    }

    /// The configured voice, or the engine's default when none is set.
    pub fn speaker_for(&self, engine: &dyn SynthesisEngine) -> String {
        self.speaker
            .clone()
            .unwrap_or_else(|| engine.default_speaker())
    }
}

impl ConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        let speaker = self.speaker.as_ref().and_then(|s| s.as_deref());
        let speed = self.kokoro.as_ref().map_or(1.0, |k| k.speed);
        check(speaker, speed)
    }
}

fn check(speaker: Option<&str>, speed: f32) -> Result<(), String> {
    if speaker.is_some_and(|s| s.trim().is_empty()) {
        return Err("speaker must not be empty".to_string());
    }
    if !(0.5..=2.0).contains(&speed) {
        return Err(format!("kokoro speed {speed} is outside 0.5-2.0"));
    }
    Ok(())
}
