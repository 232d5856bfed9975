use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView2};
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use super::phonemizer::{phonemize, voice_lang};
use super::voices::VoiceStore;
use crate::engines::espeak::Espeak;

/// Maximum number of phoneme tokens per chunk (before padding).
pub const MAX_PHONEME_LEN: usize = 510;

/// Style vector dimension for Kokoro.
pub const STYLE_DIM: usize = 256;

/// Output sample rate from the Kokoro model.
pub const SAMPLE_RATE: u32 = 24000;

/// 10ms @ 24kHz
const CHUNK_CROSSFADE_SAMPLES: usize = 240;

const VOICES_FILE: &str = "voices-v1.0.bin";

#[derive(thiserror::Error, Debug)]
pub enum KokoroError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Phonemization failed: {0}")]
    PhonemizerFailed(String),
    #[error("Voice '{0}' not found")]
    VoiceNotFound(String),
    #[error("Invalid config.json: {0}")]
    Config(String),
    #[error("Failed to parse voice file: {0}")]
    VoiceParse(String),
    #[error("{0} not found")]
    Missing(PathBuf),
}

pub struct KokoroModel {
    session: Session,
    voice_store: VoiceStore,
    vocab: HashMap<char, i64>,
    /// "input_ids" or "tokens", depending on the export.
    tokens_input_name: String,
    speed_is_int32: bool,
}

impl KokoroModel {
    pub fn load(model_dir: &Path, num_threads: Option<usize>) -> Result<Self, KokoroError> {
        let onnx_path = find_onnx_file(model_dir)?;
        log::info!("Loading Kokoro model from {}", onnx_path.display());

        let session = init_session(&onnx_path, num_threads)?;
        let tokens_input_name = detect_tokens_input(&session);
        let speed_is_int32 = detect_speed_type(&session);
        log::debug!(
            "Kokoro inputs: tokens='{}', speed_is_int32={}",
            tokens_input_name,
            speed_is_int32
        );

        let voices_path = model_dir.join(VOICES_FILE);
        if !voices_path.is_file() {
            return Err(KokoroError::Missing(voices_path));
        }
        let voice_store = VoiceStore::load(&voices_path)?;

        let config_path = model_dir.join("config.json");
        if !config_path.is_file() {
            return Err(KokoroError::Missing(config_path));
        }
        let vocab = super::vocab::load_vocab(&config_path)?;

        Ok(Self {
            session,
            voice_store,
            vocab,
            tokens_input_name,
            speed_is_int32,
        })
    }

    pub fn synthesize_text(
        &mut self,
        text: &str,
        voice_name: &str,
        speed: f32,
        espeak: &Espeak,
    ) -> Result<Vec<f32>, KokoroError> {
        let ids = phonemize(text, voice_lang(voice_name), &self.vocab, espeak)?;
        if ids.is_empty() {
            log::warn!("No phoneme tokens produced for text: {text:?}");
            return Ok(vec![]);
        }

        if self.speed_is_int32 && int_speed(speed) as f32 != speed {
            log::warn!(
                "Model takes an integer speed; using {} for {speed}",
                int_speed(speed)
            );
        }

        // One style index for the whole utterance so chunks share prosody.
        let style = self.voice_store.get_style(voice_name, ids.len())?;
        let mut combined = Vec::with_capacity(ids.len() * 300);

        for chunk in split_chunks(&ids) {
            let audio = self.synthesize_chunk(&chunk, &style, speed)?;
            if combined.is_empty() {
                combined = audio;
            } else {
                append_with_crossfade(&mut combined, &audio, CHUNK_CROSSFADE_SAMPLES);
            }
        }

        Ok(combined)
    }

    fn synthesize_chunk(
        &mut self,
        tokens: &[i64],
        style: &[f32; STYLE_DIM],
        speed: f32,
    ) -> Result<Vec<f32>, KokoroError> {
        // [[0, t1..tN, 0]]
        let mut padded = Vec::with_capacity(tokens.len() + 2);
        padded.push(0);
        padded.extend_from_slice(tokens);
        padded.push(0);
        let tokens_arr = Array2::from_shape_vec((1, padded.len()), padded)?;
        let style_view = ArrayView2::from_shape((1, STYLE_DIM), style.as_slice())?;

        let output = if self.speed_is_int32 {
            let speed_arr = ndarray::arr1(&[int_speed(speed)]);
            self.session.run(inputs![
                self.tokens_input_name.as_str() => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ])?
        } else {
            let speed_arr = ndarray::arr1(&[speed]);
            self.session.run(inputs![
                self.tokens_input_name.as_str() => TensorRef::from_array_view(tokens_arr.view())?,
                "style" => TensorRef::from_array_view(style_view)?,
                "speed" => TensorRef::from_array_view(speed_arr.view())?,
            ])?
        };

        let (_, waveform) = output
            .iter()
            .next()
            .ok_or_else(|| KokoroError::Ort(ort::Error::new("No output from model")))?;
        let waveform = waveform.try_extract_array::<f32>()?;
        Ok(waveform.iter().copied().collect())
    }

    pub fn list_voices(&self) -> Vec<&str> {
        self.voice_store.list_voices()
    }
}

/// Prefers `kokoro-quant-convinteger.onnx`, then the first `.onnx` file found.
fn find_onnx_file(model_dir: &Path) -> Result<PathBuf, KokoroError> {
    let preferred = model_dir.join("kokoro-quant-convinteger.onnx");
    if preferred.is_file() {
        return Ok(preferred);
    }

    for entry in std::fs::read_dir(model_dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("onnx") {
            return Ok(path);
        }
    }

    Err(KokoroError::Missing(model_dir.join("*.onnx")))
}

fn init_session(onnx_path: &Path, num_threads: Option<usize>) -> Result<Session, KokoroError> {
    let mut builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_execution_providers([CPUExecutionProvider::default().build()])?
        .with_parallel_execution(true)?;

    if let Some(threads) = num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    Ok(builder.commit_from_file(onnx_path)?)
}

fn detect_tokens_input(session: &Session) -> String {
    session
        .inputs()
        .iter()
        .map(|input| input.name())
        .find(|name| *name == "input_ids" || *name == "tokens")
        .unwrap_or("input_ids")
        .to_string()
}

/// Modern Kokoro exports take `speed` as int32.
fn detect_speed_type(session: &Session) -> bool {
    session
        .inputs()
        .iter()
        .find(|input| input.name() == "speed")
        .map_or(true, |input| {
            format!("{:?}", input.dtype()).to_lowercase().contains("int32")
        })
}

/// Speed for int32 exports: rounded, at least 1.
fn int_speed(speed: f32) -> i32 {
    (speed.round() as i32).max(1)
}

/// Split phoneme IDs into chunks of at most `MAX_PHONEME_LEN`, preferring to
/// cut after punctuation.
fn split_chunks(ids: &[i64]) -> Vec<Vec<i64>> {
    // ';':1 ':':2 ',':3 '.':4 '!':5 '?':6
    const PUNCT_IDS: &[i64] = &[1, 2, 3, 4, 5, 6];

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < ids.len() {
        let end = (start + MAX_PHONEME_LEN).min(ids.len());
        if end == ids.len() {
            chunks.push(ids[start..end].to_vec());
            break;
        }

        let split = ids[start..end]
            .iter()
            .rposition(|id| PUNCT_IDS.contains(id))
            .map_or(end, |i| start + i + 1);
        chunks.push(ids[start..split].to_vec());
        start = split;
    }
    chunks
}

fn append_with_crossfade(dst: &mut Vec<f32>, src: &[f32], crossfade_samples: usize) {
    let overlap = crossfade_samples.min(dst.len()).min(src.len());
    let dst_start = dst.len() - overlap;
    for i in 0..overlap {
        let t = (i + 1) as f32 / (overlap as f32 + 1.0);
        dst[dst_start + i] = dst[dst_start + i] * (1.0 - t) + src[i] * t;
    }
    dst.extend_from_slice(&src[overlap..]);
}
