use std::path::PathBuf;

/// Failure to read a text document or a pronunciation table.
#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("Could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not valid UTF-8 text")]
    Encoding { path: PathBuf },
    #[error("Could not read Word document {path}: {message}")]
    Docx { path: PathBuf, message: String },
    #[error("Pronunciation table {path} is missing a '{column}' column")]
    MissingColumn { path: PathBuf, column: &'static str },
}

#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("Text input is empty.")]
    EmptyText,
    #[error("Voice '{speaker}' is not known to {engine}.")]
    UnknownSpeaker { speaker: String, engine: String },
    #[error("Model not loaded.")]
    ModelNotLoaded,
    #[error("No speech backend available:\n{0}")]
    EngineUnavailable(String),
    #[error("{engine} failed: {message}")]
    Engine { engine: String, message: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not decode synthesized audio: {0}")]
    Wav(#[from] hound::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum PlaybackError {
    #[error("Audio output device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("Audio buffer is empty")]
    EmptyBuffer,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
