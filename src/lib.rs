//! # tts-free
//!
//! A desktop reader that speaks a text file one utterance at a time using an
//! offline text-to-speech engine.
//!
//! ## Features
//!
//! - **Kokoro TTS**: High-quality neural voices via ONNX (feature `kokoro`)
//! - **Piper**: Offline voices driven through the `piper` binary
//! - **eSpeak NG**: Robotic last-resort voice, off unless explicitly allowed
//! - **Reader**: Load a file, play the current line, step to the next one
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use tts_free::{engines, Config, SynthesisEngine};
//!
//! let config = Config::default();
//! let mut engine = engines::select(&config)?;
//! let speaker = config.speaker_for(engine.as_ref());
//!
//! let audio = engine.synthesize("Hello, world!", &speaker)?;
//! audio.write_wav(Path::new("output.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod cursor;
pub mod document;
pub mod engines;
pub mod error;
pub mod export;
pub mod gui;
pub mod playback;
pub mod pronunciation;
pub mod reader;
pub mod worker;

use std::path::Path;

pub use config::{Config, ConfigBuilder, EngineKind};
pub use cursor::{Cursor, Line};
pub use document::{SplitMode, TextDocument};
pub use error::{ConfigError, LoadError, PlaybackError, SynthesisError};
pub use reader::{Command, Reader, ReaderError, ReaderState};

/// Synthesized audio, produced for a single utterance and consumed by playback.
///
/// Samples are interleaved f32 values in `[-1.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
            channels: 1,
        }
    }

    /// Decode a PCM or float WAV file written by an engine process.
    pub fn read_wav(path: &Path) -> Result<Self, hound::Error> {
        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
        })
    }

    /// Write the audio to a 32-bit float WAV file.
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()?;
        Ok(())
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        let frames = self.samples.len() / self.channels.max(1) as usize;
        frames as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// One play action: the utterance to speak and the voice to speak it with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub speaker_id: String,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>, speaker_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speaker_id: speaker_id.into(),
        }
    }
}

/// Common interface for text-to-speech synthesis engines.
///
/// Engines receive all of their configuration (model paths, default voice,
/// speed) at construction time, so a loaded engine is ready to synthesize.
/// The trait is object safe; the reader and the synthesis worker hold a
/// `Box<dyn SynthesisEngine>`.
pub trait SynthesisEngine: Send {
    /// Human-readable backend label, e.g. `"Piper"` or `"Kokoro (speed 1.0)"`.
    fn name(&self) -> String;

    /// Voice identifiers this engine accepts as `speaker_id`.
    fn list_speakers(&self) -> Vec<String>;

    /// The voice used when the configuration does not name one.
    fn default_speaker(&self) -> String;

    /// Synthesize speech for `text` with the given voice.
    fn synthesize(&mut self, text: &str, speaker_id: &str)
        -> Result<AudioBuffer, SynthesisError>;

    /// Synthesize speech from the given text and write to a WAV file.
    ///
    /// Default implementation calls `synthesize()` then `AudioBuffer::write_wav()`.
    fn synthesize_to_file(
        &mut self,
        text: &str,
        speaker_id: &str,
        wav_path: &Path,
    ) -> Result<(), SynthesisError> {
        self.synthesize(text, speaker_id)?.write_wav(wav_path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::AudioBuffer;

    #[test]
    fn wav_written_as_float_reads_back_with_same_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let audio = AudioBuffer {
            samples: vec![0.0, 0.25, -0.25, 0.5],
            sample_rate: 22050,
            channels: 2,
        };
        audio.write_wav(&path).unwrap();

        let decoded = AudioBuffer::read_wav(&path).unwrap();
        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.samples, audio.samples);
    }

    #[test]
    fn reads_16_bit_pcm_as_normalized_floats() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pcm.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(i16::MIN).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.write_sample(16384i16).unwrap();
        writer.finalize().unwrap();

        let decoded = AudioBuffer::read_wav(&path).unwrap();
        assert_eq!(decoded.samples, vec![-1.0, 0.0, 0.5]);
    }

    #[test]
    fn duration_accounts_for_channels() {
        let audio = AudioBuffer {
            samples: vec![0.0; 48000],
            sample_rate: 24000,
            channels: 2,
        };
        assert_eq!(audio.duration_secs(), 1.0);
    }
}
