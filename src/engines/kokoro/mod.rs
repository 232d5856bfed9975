//! Kokoro-82M text-to-speech engine.
//!
//! Runs the Kokoro-82M ONNX model through `ort`, with espeak-ng providing
//! phonemization. Output is 24 kHz mono.
//!
//! # Model Directory Layout
//!
//! ```text
//! models/kokoro/
//! ├── kokoro-quant-convinteger.onnx   # 8-bit quantized model (any *.onnx is accepted)
//! ├── voices-v1.0.bin                  # Voice data archive (.npz format)
//! └── config.json                      # Model config with the phoneme "vocab" table
//! ```
//!
//! # Voice Naming Convention
//!
//! Voices follow the pattern `{language_prefix}_{name}`, e.g. `bf_emma`
//! (British English female "emma") or `af_heart` (American English female
//! "heart"). The prefix selects the espeak-ng language used for
//! phonemization.

mod model;
mod phonemizer;
mod vocab;
mod voices;

pub use model::KokoroError;

use crate::config::{EspeakSettings, KokoroSettings};
use crate::engines::espeak::Espeak;
use crate::error::SynthesisError;
use crate::{AudioBuffer, SynthesisEngine};

use model::{KokoroModel, SAMPLE_RATE};

const ENGINE: &str = "Kokoro";

/// Kokoro text-to-speech engine, loaded and ready to synthesize.
///
/// ```rust,no_run
/// use tts_free::config::{EspeakSettings, KokoroSettings};
/// use tts_free::engines::kokoro::KokoroEngine;
/// use tts_free::SynthesisEngine;
///
/// let mut engine = KokoroEngine::load(&KokoroSettings::default(), &EspeakSettings::default())?;
/// let audio = engine.synthesize("Hello, world!", "bf_emma")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct KokoroEngine {
    model: KokoroModel,
    espeak: Espeak,
    speed: f32,
}

impl KokoroEngine {
    pub const DEFAULT_VOICE: &'static str = "bf_emma";

    pub fn load(
        settings: &KokoroSettings,
        espeak: &EspeakSettings,
    ) -> Result<Self, SynthesisError> {
        let espeak = Espeak::locate(espeak.binary.as_deref())?;
        let model = KokoroModel::load(&settings.model_dir, settings.num_threads)?;
        Ok(Self {
            model,
            espeak,
            speed: settings.speed,
        })
    }
}

impl SynthesisEngine for KokoroEngine {
    fn name(&self) -> String {
        format!("Kokoro (speed {:.1})", self.speed)
    }

    fn list_speakers(&self) -> Vec<String> {
        self.model
            .list_voices()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn default_speaker(&self) -> String {
        Self::DEFAULT_VOICE.to_string()
    }

    fn synthesize(&mut self, text: &str, speaker_id: &str) -> Result<AudioBuffer, SynthesisError> {
        let text = super::check_request(ENGINE, text, speaker_id, &self.list_speakers())?;
        let samples = self
            .model
            .synthesize_text(text, speaker_id, self.speed, &self.espeak)?;
        Ok(AudioBuffer::mono(samples, SAMPLE_RATE))
    }
}

impl From<KokoroError> for SynthesisError {
    fn from(e: KokoroError) -> Self {
        match e {
            KokoroError::VoiceNotFound(speaker) => SynthesisError::UnknownSpeaker {
                speaker,
                engine: ENGINE.to_string(),
            },
            other => SynthesisError::Engine {
                engine: ENGINE.to_string(),
                message: other.to_string(),
            },
        }
    }
}
