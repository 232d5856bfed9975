use std::path::PathBuf;

use crate::config::Config;
use crate::cursor::Cursor;
use crate::document::{SplitMode, TextDocument};
use crate::error::{LoadError, PlaybackError, SynthesisError};
use crate::playback::AudioOutput;
use crate::pronunciation::PronunciationRules;
use crate::worker::SynthesisWorker;
use crate::{SynthesisEngine, SynthesisRequest};

/// Everything the GUI can ask the reader to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadFile(PathBuf),
    LoadPronunciation(PathBuf),
    PlayCurrent,
    Next,
    Stop,
    SetSpeaker(String),
    SetAutoPlay(bool),
    SetAutoAdvance(bool),
}

#[derive(thiserror::Error, Debug)]
pub enum ReaderError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error("No text file loaded.")]
    NoDocument,
    #[error("Still working on the previous line.")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    NoFileLoaded,
    FileLoaded { line: usize },
}

/// Owns the loaded document and drives synthesis and playback.
///
/// The GUI turns clicks into [`Command`]s for [`Reader::dispatch`] and calls
/// [`Reader::poll`] every frame to collect finished synthesis.
pub struct Reader {
    cursor: Option<Cursor>,
    rules: PronunciationRules,
    worker: SynthesisWorker,
    output: Box<dyn AudioOutput>,
    speaker: String,
    split_mode: SplitMode,
    auto_play: bool,
    auto_advance: bool,
    /// A clip we started is (or was) playing and its end has not been seen.
    clip_active: bool,
    /// Stop was pressed while synthesizing; drop that result when it arrives.
    discard_pending: bool,
}

impl Reader {
    pub fn new(config: &Config, worker: SynthesisWorker, output: Box<dyn AudioOutput>) -> Self {
        let speaker = config
            .speaker
            .clone()
            .unwrap_or_else(|| worker.default_speaker().to_string());
        Self {
            cursor: None,
            rules: PronunciationRules::default(),
            worker,
            output,
            speaker,
            split_mode: config.split_mode,
            auto_play: config.auto_play,
            auto_advance: config.auto_advance,
            clip_active: false,
            discard_pending: false,
        }
    }

    pub fn dispatch(&mut self, command: Command) -> Result<(), ReaderError> {
        log::debug!("Command: {command:?}");
        match command {
            Command::LoadFile(path) => {
                self.ensure_idle()?;
                let document = TextDocument::load(&path, self.split_mode)?;
                self.stop();
                self.cursor = Some(Cursor::new(document));
            }
            Command::LoadPronunciation(path) => {
                self.rules = PronunciationRules::load(&path)?;
            }
            Command::PlayCurrent => {
                self.ensure_idle()?;
                self.play_current()?;
            }
            Command::Next => {
                self.ensure_idle()?;
                let cursor = self.cursor.as_mut().ok_or(ReaderError::NoDocument)?;
                let moved = cursor.advance();
                self.stop();
                if moved && self.auto_play {
                    self.play_current()?;
                }
            }
            Command::Stop => self.stop(),
            Command::SetSpeaker(speaker) => self.speaker = speaker,
            Command::SetAutoPlay(on) => self.auto_play = on,
            Command::SetAutoAdvance(on) => self.auto_advance = on,
        }
        Ok(())
    }

    /// Swap in another speech backend. The current voice is kept if the new
    /// engine knows it, otherwise the engine's default is used.
    pub fn replace_engine(&mut self, engine: Box<dyn SynthesisEngine>) -> Result<(), ReaderError> {
        self.ensure_idle()?;
        let worker = SynthesisWorker::spawn(engine).map_err(SynthesisError::Io)?;
        self.stop();
        if !worker.speakers().iter().any(|s| *s == self.speaker) {
            self.speaker = worker.default_speaker().to_string();
        }
        log::info!("Switched to {} with voice {}", worker.engine_name(), self.speaker);
        self.worker = worker;
        Ok(())
    }

    /// Collect a finished synthesis, or notice that the current clip ended.
    pub fn poll(&mut self) -> Result<(), ReaderError> {
        if let Some((request, result)) = self.worker.try_recv() {
            if std::mem::take(&mut self.discard_pending) {
                log::debug!("Dropping stopped synthesis of {:?}", request.text);
                return Ok(());
            }
            let audio = result?;
            log::debug!(
                "Synthesized {:.2}s for {:?}",
                audio.duration_secs(),
                request.text
            );
            self.output.play(audio)?;
            self.clip_active = true;
            return Ok(());
        }

        // A replay still synthesizing takes over from the clip that just ended.
        if self.clip_active && !self.worker.is_busy() && !self.output.is_playing() {
            self.clip_active = false;
            if self.auto_advance {
                if let Some(cursor) = self.cursor.as_mut() {
                    if cursor.advance() {
                        self.play_current()?;
                    }
                }
            }
        }
        Ok(())
    }

    fn play_current(&mut self) -> Result<(), ReaderError> {
        let cursor = self.cursor.as_ref().ok_or(ReaderError::NoDocument)?;
        let text = cursor.current().text().ok_or(SynthesisError::EmptyText)?;
        let request = SynthesisRequest::new(self.rules.apply(text), self.speaker.clone());
        if self.worker.submit(request) {
            self.clip_active = false;
            Ok(())
        } else {
            Err(ReaderError::Busy)
        }
    }

    fn stop(&mut self) {
        self.output.stop();
        self.clip_active = false;
        self.discard_pending = self.worker.is_busy();
    }

    fn ensure_idle(&self) -> Result<(), ReaderError> {
        if self.worker.is_busy() {
            Err(ReaderError::Busy)
        } else {
            Ok(())
        }
    }

    pub fn state(&self) -> ReaderState {
        match &self.cursor {
            None => ReaderState::NoFileLoaded,
            Some(cursor) => ReaderState::FileLoaded {
                line: cursor.index(),
            },
        }
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn current_text(&self) -> String {
        self.cursor
            .as_ref()
            .map(|c| c.current().to_string())
            .unwrap_or_default()
    }

    pub fn next_text(&self) -> String {
        self.cursor
            .as_ref()
            .map(|c| c.peek_next().to_string())
            .unwrap_or_default()
    }

    pub fn is_busy(&self) -> bool {
        self.worker.is_busy()
    }

    pub fn is_playing(&self) -> bool {
        self.output.is_playing()
    }

    pub fn engine_name(&self) -> &str {
        self.worker.engine_name()
    }

    /// Status-bar label, e.g. `Piper (en_GB-cori-high)`.
    pub fn backend_label(&self) -> String {
        if self.speaker.is_empty() {
            self.engine_name().to_string()
        } else {
            format!("{} ({})", self.engine_name(), self.speaker)
        }
    }

    pub fn speakers(&self) -> &[String] {
        self.worker.speakers()
    }

    pub fn speaker(&self) -> &str {
        &self.speaker
    }

    pub fn auto_play(&self) -> bool {
        self.auto_play
    }

    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    pub fn pronunciation_rules(&self) -> usize {
        self.rules.len()
    }
}
