use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::EspeakSettings;
use crate::error::SynthesisError;
use crate::{AudioBuffer, SynthesisEngine};

const ENGINE: &str = "eSpeak NG";

/// A located `espeak-ng` (or legacy `espeak`) executable.
///
/// Used directly as the last-resort voice and by Kokoro for phonemization.
#[derive(Debug, Clone)]
pub struct Espeak {
    binary: PathBuf,
}

impl Espeak {
    /// Find a working executable, preferring an explicit path.
    pub fn locate(explicit: Option<&Path>) -> Result<Self, SynthesisError> {
        let candidates: Vec<PathBuf> = match explicit {
            Some(path) => vec![path.to_path_buf()],
            None => vec![PathBuf::from("espeak-ng"), PathBuf::from("espeak")],
        };

        for binary in candidates {
            let probe = Command::new(&binary)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status();
            match probe {
                Ok(status) if status.success() => {
                    log::debug!("Found eSpeak at {}", binary.display());
                    return Ok(Self { binary });
                }
                _ => log::debug!("eSpeak probe failed for {}", binary.display()),
            }
        }

        Err(SynthesisError::EngineUnavailable(
            "eSpeak NG not found. Install: Linux: `sudo apt-get install espeak-ng`, \
             macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
                .to_string(),
        ))
    }

    /// Convert newline-separated input to IPA, one output line per input line.
    pub fn phonemes(&self, input: &str, lang: &str) -> Result<String, SynthesisError> {
        let output = self.run(&["--ipa", "--stdin", "-q", "-v", lang], Some(input))?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    /// Voice (language) identifiers reported by `--voices`.
    pub fn voices(&self) -> Result<Vec<String>, SynthesisError> {
        let output = self.run(&["--voices"], None)?;
        Ok(parse_voice_list(&String::from_utf8_lossy(&output)))
    }

    /// Speak `text` into a WAV file.
    pub fn render(
        &self,
        text: &str,
        voice: &str,
        rate: u32,
        pitch: u32,
        wav_path: &Path,
    ) -> Result<(), SynthesisError> {
        let rate = rate.to_string();
        let pitch = pitch.to_string();
        let wav = wav_path.to_string_lossy();
        self.run(
            &["-v", voice, "-s", &rate, "-p", &pitch, "-w", &wav, "--stdin"],
            Some(text),
        )?;
        Ok(())
    }

    fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<Vec<u8>, SynthesisError> {
        log::debug!("eSpeak: {} {}", self.binary.display(), args.join(" "));
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            // espeak-ng reads stdin line by line; an unterminated last line
            // can lose its final token.
            pipe.write_all(newline_terminated(input).as_bytes())?;
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
        Ok(output.stdout)
    }
}

fn newline_terminated(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

/// Pull the language column out of `espeak-ng --voices` output.
fn parse_voice_list(output: &str) -> Vec<String> {
    let mut voices: Vec<String> = output
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect();
    voices.sort_unstable();
    voices.dedup();
    voices
}

/// eSpeak NG as a speech backend.
///
/// Voices are language codes, optionally with a `+variant` suffix such as
/// `en-gb+f2`.
pub struct EspeakEngine {
    espeak: Espeak,
    voices: Vec<String>,
    rate: u32,
    pitch: u32,
}

impl EspeakEngine {
    pub const DEFAULT_VOICE: &'static str = "en-gb+f2";

    pub fn new(settings: &EspeakSettings) -> Result<Self, SynthesisError> {
        let espeak = Espeak::locate(settings.binary.as_deref())?;
        let voices = espeak.voices()?;
        log::info!("eSpeak NG ready with {} voices", voices.len());
        Ok(Self {
            espeak,
            voices,
            rate: settings.rate,
            pitch: settings.pitch,
        })
    }
}

impl SynthesisEngine for EspeakEngine {
    fn name(&self) -> String {
        format!("eSpeak NG ({} wpm)", self.rate)
    }

    fn list_speakers(&self) -> Vec<String> {
        self.voices.clone()
    }

    fn default_speaker(&self) -> String {
        Self::DEFAULT_VOICE.to_string()
    }

    fn synthesize(&mut self, text: &str, speaker_id: &str) -> Result<AudioBuffer, SynthesisError> {
        let base = speaker_id.split('+').next().unwrap_or(speaker_id);
        let text = super::check_request(ENGINE, text, base, &self.voices)?;

        let wav = tempfile::Builder::new()
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();
        self.espeak
            .render(text, speaker_id, self.rate, self.pitch, &wav)?;
        Ok(AudioBuffer::read_wav(&wav)?)
    }
}

#[cfg(test)]
mod tests {
    use super::{newline_terminated, parse_voice_list, Espeak, EspeakEngine};
    use crate::config::EspeakSettings;
    use crate::error::SynthesisError;
    use crate::SynthesisEngine;

    const VOICES: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 2  en-gb           --/M      English_(Great_Britain) gmw/en         (en 2)
 5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
 5  en-gb           --/F      English_(variant)  gmw/en-f
";

    fn espeak_available() -> bool {
        Espeak::locate(None).is_ok()
    }

    #[test]
    fn parses_language_column() {
        assert_eq!(parse_voice_list(VOICES), vec!["af", "en-gb", "en-us"]);
    }

    #[test]
    fn appends_trailing_newline_for_stdin() {
        assert_eq!(newline_terminated("America"), "America\n");
        assert_eq!(newline_terminated("America\n"), "America\n");
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let err = Espeak::locate(Some("/nonexistent/espeak-ng".as_ref())).unwrap_err();
        assert!(matches!(err, SynthesisError::EngineUnavailable(_)));
    }

    #[test]
    fn variant_suffix_is_accepted_and_unknown_voice_rejected() {
        if !espeak_available() {
            return;
        }

        let mut engine = EspeakEngine::new(&EspeakSettings::default()).unwrap();
        assert!(engine.list_speakers().iter().any(|v| v == "en-gb"));

        let audio = engine.synthesize("Hello world", "en-gb+f2").unwrap();
        assert!(!audio.is_empty());

        let err = engine.synthesize("Hello world", "xx-nowhere").unwrap_err();
        assert!(matches!(err, SynthesisError::UnknownSpeaker { .. }));
    }
}
