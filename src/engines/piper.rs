use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::PiperSettings;
use crate::error::SynthesisError;
use crate::{AudioBuffer, SynthesisEngine};

const ENGINE: &str = "Piper";

#[derive(Debug, Clone)]
struct PiperVoice {
    model: PathBuf,
    /// `<model>.onnx.json`, passed with `-c` when present.
    config: Option<PathBuf>,
}

/// Piper voices run through the external `piper` executable.
///
/// Each `<voice>.onnx` model found in the configured directories becomes a
/// speaker id, e.g. `en_GB-cori-high`.
pub struct PiperEngine {
    binary: PathBuf,
    voices: BTreeMap<String, PiperVoice>,
}

impl PiperEngine {
    pub const DEFAULT_VOICE: &'static str = "en_GB-cori-high";

    pub fn new(settings: &PiperSettings) -> Result<Self, SynthesisError> {
        let binary = settings.binary.clone().unwrap_or_else(bundled_binary);
        log::debug!("Piper probe: binary={}", binary.display());
        if !binary.is_file() {
            return Err(SynthesisError::EngineUnavailable(format!(
                "Piper binary not found at {}. Set PIPER_BIN or place it in ./piper/",
                binary.display()
            )));
        }

        let voices = scan_voices(&settings.model_dirs);
        if voices.is_empty() {
            return Err(SynthesisError::EngineUnavailable(format!(
                "no Piper voices (*.onnx) found in {:?}. Set PIPER_MODEL_DIR",
                settings.model_dirs
            )));
        }

        log::info!("Piper ready with voices: {:?}", voices.keys().collect::<Vec<_>>());
        Ok(Self { binary, voices })
    }
}

fn bundled_binary() -> PathBuf {
    let name = if cfg!(windows) { "piper.exe" } else { "piper" };
    Path::new("piper").join(name)
}

/// Map voice names to model files. Earlier directories win on name clashes.
fn scan_voices(dirs: &[PathBuf]) -> BTreeMap<String, PiperVoice> {
    let mut voices = BTreeMap::new();
    for dir in dirs {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("Skipping Piper model dir {}: {e}", dir.display());
                continue;
            }
        };

        for entry in entries.flatten() {
            let model = entry.path();
            if model.extension().and_then(|e| e.to_str()) != Some("onnx") {
                continue;
            }
            let Some(name) = model.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let mut config = model.clone().into_os_string();
            config.push(".json");
            let config = PathBuf::from(config);
            let config = config.is_file().then_some(config);

            voices
                .entry(name.to_string())
                .or_insert(PiperVoice { model, config });
        }
    }
    voices
}

impl SynthesisEngine for PiperEngine {
    fn name(&self) -> String {
        "Piper".to_string()
    }

    fn list_speakers(&self) -> Vec<String> {
        self.voices.keys().cloned().collect()
    }

    fn default_speaker(&self) -> String {
        if self.voices.contains_key(Self::DEFAULT_VOICE) {
            Self::DEFAULT_VOICE.to_string()
        } else {
            self.voices
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| Self::DEFAULT_VOICE.to_string())
        }
    }

    fn synthesize(&mut self, text: &str, speaker_id: &str) -> Result<AudioBuffer, SynthesisError> {
        let text = super::check_request(ENGINE, text, speaker_id, &self.list_speakers())?;
        let voice = &self.voices[speaker_id];

        let wav = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        let mut command = Command::new(&self.binary);
        command
            .arg("-m")
            .arg(&voice.model)
            .arg("--output_file")
            .arg(&*wav);
        if let Some(config) = &voice.config {
            command.arg("-c").arg(config);
        }
        log::debug!("Piper synth: {command:?}");

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
            stdin.write_all(b"\n")?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(SynthesisError::Engine {
                engine: ENGINE.to_string(),
                message: format!(
                    "exited with code {:?}: {}",
                    output.status.code(),
                    String::from_utf8_lossy(&output.stderr)
                ),
            });
        }

        Ok(AudioBuffer::read_wav(&wav)?)
    }
}

#[cfg(test)]
mod tests {
    use super::PiperEngine;
    use crate::config::PiperSettings;
    use crate::error::SynthesisError;
    use crate::SynthesisEngine;
    use std::fs;
    use std::path::Path;

    fn settings(root: &Path) -> PiperSettings {
        let binary = root.join("piper");
        fs::write(&binary, b"").unwrap();
        let models = root.join("voices");
        fs::create_dir(&models).unwrap();
        for name in ["en_GB-semaine-medium", "en_GB-cori-high"] {
            fs::write(models.join(format!("{name}.onnx")), b"").unwrap();
        }
        fs::write(models.join("en_GB-cori-high.onnx.json"), b"{}").unwrap();
        fs::write(models.join("README.md"), b"").unwrap();

        PiperSettings {
            binary: Some(binary),
            model_dirs: vec![root.join("missing"), models],
        }
    }

    #[test]
    fn voices_come_from_model_files() {
        let dir = tempfile::tempdir().unwrap();
        let engine = PiperEngine::new(&settings(dir.path())).unwrap();
        assert_eq!(
            engine.list_speakers(),
            vec!["en_GB-cori-high", "en_GB-semaine-medium"]
        );
        assert_eq!(engine.default_speaker(), "en_GB-cori-high");
        assert!(engine.voices["en_GB-cori-high"].config.is_some());
        assert!(engine.voices["en_GB-semaine-medium"].config.is_none());
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.binary = Some(dir.path().join("nope"));
        assert!(matches!(
            PiperEngine::new(&settings),
            Err(SynthesisError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn no_models_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());
        settings.model_dirs = vec![dir.path().join("missing")];
        assert!(matches!(
            PiperEngine::new(&settings),
            Err(SynthesisError::EngineUnavailable(_))
        ));
    }

    #[test]
    fn unknown_voice_is_rejected_without_running_piper() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = PiperEngine::new(&settings(dir.path())).unwrap();
        let err = engine.synthesize("Hello", "p240").unwrap_err();
        assert!(matches!(err, SynthesisError::UnknownSpeaker { .. }));
        let err = engine.synthesize("   ", "en_GB-cori-high").unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyText));
    }

    #[cfg(unix)]
    #[test]
    fn runs_binary_and_decodes_its_wav() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings(dir.path());

        let fixture = dir.path().join("fixture.wav");
        crate::AudioBuffer::mono(vec![0.5; 100], 22050)
            .write_wav(&fixture)
            .unwrap();

        // Stand-in for piper: swallow stdin, copy the fixture to --output_file.
        let script = dir.path().join("fake-piper");
        fs::write(
            &script,
            format!(
                "#!/bin/sh\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = --output_file ]; then out=\"$2\"; fi\n  shift\ndone\ncat > /dev/null\ncp '{}' \"$out\"\n",
                fixture.display()
            ),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        settings.binary = Some(script);

        let mut engine = PiperEngine::new(&settings).unwrap();
        let audio = engine.synthesize("Hello world", "en_GB-cori-high").unwrap();
        assert_eq!(audio.sample_rate, 22050);
        assert_eq!(audio.samples.len(), 100);
    }
}
