use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::document::TextDocument;
use crate::error::SynthesisError;
use crate::pronunciation::PronunciationRules;
use crate::SynthesisEngine;

/// Render every utterance of `document` to `0001.wav`, `0002.wav`, ... in `out_dir`.
///
/// Stops at the first failure. Returns the written paths in order.
pub fn export_document(
    engine: &mut dyn SynthesisEngine,
    document: &TextDocument,
    rules: &PronunciationRules,
    speaker_id: &str,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, SynthesisError> {
    std::fs::create_dir_all(out_dir)?;

    let mut written = Vec::with_capacity(document.len());
    for (i, line) in document.lines().enumerate() {
        let path = out_dir.join(format!("{:04}.wav", i + 1));
        let started = Instant::now();
        engine.synthesize_to_file(&rules.apply(line), speaker_id, &path)?;
        log::info!(
            "[{}/{}] {} in {:.2?}",
            i + 1,
            document.len(),
            path.display(),
            started.elapsed()
        );
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::export_document;
    use crate::document::{SplitMode, TextDocument};
    use crate::error::SynthesisError;
    use crate::pronunciation::PronunciationRules;
    use crate::{AudioBuffer, SynthesisEngine};

    struct Tone;

    impl SynthesisEngine for Tone {
        fn name(&self) -> String {
            "Tone".to_string()
        }
        fn list_speakers(&self) -> Vec<String> {
            vec!["a".to_string()]
        }
        fn default_speaker(&self) -> String {
            "a".to_string()
        }
        fn synthesize(&mut self, text: &str, speaker_id: &str) -> Result<AudioBuffer, SynthesisError> {
            let text = crate::engines::check_request("Tone", text, speaker_id, &self.list_speakers())?;
            Ok(AudioBuffer::mono(vec![0.25; text.len()], 8000))
        }
    }

    #[test]
    fn writes_one_numbered_wav_per_utterance() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let document = TextDocument::parse("Hi\n\nThere you are\n", SplitMode::Lines);

        let written =
            export_document(&mut Tone, &document, &PronunciationRules::default(), "a", &out)
                .unwrap();

        assert_eq!(written, vec![out.join("0001.wav"), out.join("0002.wav")]);
        let second = AudioBuffer::read_wav(&written[1]).unwrap();
        assert_eq!(second.samples.len(), "There you are".len());
        assert_eq!(second.sample_rate, 8000);
    }

    #[test]
    fn stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let document = TextDocument::parse("Hi\nThere\n", SplitMode::Lines);
        let err = export_document(
            &mut Tone,
            &document,
            &PronunciationRules::default(),
            "b",
            dir.path(),
        )
        .unwrap_err();
        assert!(matches!(err, SynthesisError::UnknownSpeaker { .. }));
        assert!(!dir.path().join("0001.wav").exists());
    }
}
