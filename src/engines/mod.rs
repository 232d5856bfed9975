//! Speech synthesis engines.
//!
//! This module contains the text-to-speech backends and the logic that picks
//! one at startup.
//!
//! # Available Engines
//!
//! - `kokoro` - Kokoro TTS (ONNX format, espeak-ng required), enabled by the
//!   `kokoro` Cargo feature
//! - `piper` - Piper voices through the external `piper` binary
//! - `espeak` - eSpeak NG, used only when explicitly allowed

pub mod espeak;
#[cfg(feature = "kokoro")]
pub mod kokoro;
pub mod piper;

use crate::config::{Config, EngineKind};
use crate::error::SynthesisError;
use crate::{AudioBuffer, SynthesisEngine};

/// Construct the preferred engine, falling back through the remaining ones.
///
/// Every failure is logged and collected; if no engine can be opened the
/// returned error lists all of them.
pub fn select(config: &Config) -> Result<Box<dyn SynthesisEngine>, SynthesisError> {
    select_with(
        &config.engine.fallback_order(config.allow_espeak),
        |kind| open(kind, config),
    )
}

pub fn open(kind: EngineKind, config: &Config) -> Result<Box<dyn SynthesisEngine>, SynthesisError> {
    match kind {
        EngineKind::Kokoro => open_kokoro(config),
        EngineKind::Piper => Ok(Box::new(piper::PiperEngine::new(&config.piper)?)),
        EngineKind::Espeak => Ok(Box::new(espeak::EspeakEngine::new(&config.espeak)?)),
    }
}

#[cfg(feature = "kokoro")]
fn open_kokoro(config: &Config) -> Result<Box<dyn SynthesisEngine>, SynthesisError> {
    Ok(Box::new(kokoro::KokoroEngine::load(&config.kokoro, &config.espeak)?))
}

#[cfg(not(feature = "kokoro"))]
fn open_kokoro(_config: &Config) -> Result<Box<dyn SynthesisEngine>, SynthesisError> {
    Err(SynthesisError::EngineUnavailable(
        "built without the `kokoro` feature".to_string(),
    ))
}

fn select_with<F>(order: &[EngineKind], mut open: F) -> Result<Box<dyn SynthesisEngine>, SynthesisError>
where
    F: FnMut(EngineKind) -> Result<Box<dyn SynthesisEngine>, SynthesisError>,
{
    let mut failures = Vec::new();
    for &kind in order {
        match open(kind) {
            Ok(engine) => {
                log::info!("Using speech backend: {}", engine.name());
                return Ok(engine);
            }
            Err(e) => {
                log::warn!("{kind:?} unavailable: {e}");
                failures.push(format!("{kind:?}: {e}"));
            }
        }
    }
    Err(SynthesisError::EngineUnavailable(failures.join("\n")))
}

/// Stand-in used when no backend could be opened, so the reader stays usable.
///
/// Every synthesis fails with the reason selection gave.
pub struct Unavailable {
    reason: String,
}

impl Unavailable {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl SynthesisEngine for Unavailable {
    fn name(&self) -> String {
        "None".to_string()
    }

    fn list_speakers(&self) -> Vec<String> {
        Vec::new()
    }

    fn default_speaker(&self) -> String {
        String::new()
    }

    fn synthesize(&mut self, _text: &str, _speaker_id: &str) -> Result<AudioBuffer, SynthesisError> {
        Err(SynthesisError::EngineUnavailable(self.reason.clone()))
    }
}

/// Check a request against an engine's voice list and return the trimmed text.
pub(crate) fn check_request<'a>(
    engine: &str,
    text: &'a str,
    speaker_id: &str,
    known: &[String],
) -> Result<&'a str, SynthesisError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SynthesisError::EmptyText);
    }
    if !known.iter().any(|k| k == speaker_id) {
        return Err(SynthesisError::UnknownSpeaker {
            speaker: speaker_id.to_string(),
            engine: engine.to_string(),
        });
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::{check_request, select_with, Unavailable};
    use crate::config::EngineKind;
    use crate::error::SynthesisError;
    use crate::{AudioBuffer, SynthesisEngine};

    struct Named(&'static str);

    impl SynthesisEngine for Named {
        fn name(&self) -> String {
            self.0.to_string()
        }
        fn list_speakers(&self) -> Vec<String> {
            Vec::new()
        }
        fn default_speaker(&self) -> String {
            String::new()
        }
        fn synthesize(&mut self, _: &str, _: &str) -> Result<AudioBuffer, SynthesisError> {
            Err(SynthesisError::ModelNotLoaded)
        }
    }

    #[test]
    fn falls_back_to_next_engine() {
        let engine = select_with(&[EngineKind::Kokoro, EngineKind::Piper], |kind| match kind {
            EngineKind::Piper => Ok(Box::new(Named("piper"))),
            _ => Err(SynthesisError::ModelNotLoaded),
        })
        .unwrap();
        assert_eq!(engine.name(), "piper");
    }

    #[test]
    fn reports_every_failure_when_nothing_opens() {
        let err = select_with(&[EngineKind::Kokoro, EngineKind::Piper], |kind| {
            Err(SynthesisError::EngineUnavailable(format!("no {kind:?}")))
        })
        .err()
        .unwrap();

        let message = err.to_string();
        assert!(message.contains("Kokoro: No speech backend available:\nno Kokoro"));
        assert!(message.contains("Piper:"));
    }

    #[test]
    fn unavailable_engine_reports_its_reason() {
        let mut engine = Unavailable::new("Piper: binary not found");
        let err = engine.synthesize("Hello", "").unwrap_err();
        assert!(err.to_string().contains("binary not found"));
    }

    #[test]
    fn rejects_blank_text_before_unknown_voice() {
        let known = vec!["p240".to_string()];
        assert!(matches!(
            check_request("Test", "  ", "nobody", &known),
            Err(SynthesisError::EmptyText)
        ));
        assert!(matches!(
            check_request("Test", "Hi", "nobody", &known),
            Err(SynthesisError::UnknownSpeaker { .. })
        ));
        assert_eq!(check_request("Test", " Hi ", "p240", &known).unwrap(), "Hi");
    }
}
