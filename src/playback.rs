use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::error::PlaybackError;
use crate::AudioBuffer;

/// Where synthesized audio goes.
///
/// `play` is fire-and-forget: it returns once the clip is queued. Starting a
/// clip stops whatever was playing, so clips never overlap.
pub trait AudioOutput {
    fn play(&mut self, audio: AudioBuffer) -> Result<(), PlaybackError>;
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
}

/// Plays through the default output device with `rodio`.
///
/// The device is opened on first use, so a machine without audio can still
/// start the application.
#[derive(Default)]
pub struct RodioPlayer {
    output: Option<(OutputStream, OutputStreamHandle)>,
    sink: Option<Sink>,
}

impl RodioPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&mut self) -> Result<&OutputStreamHandle, PlaybackError> {
        if self.output.is_none() {
            let output = OutputStream::try_default()
                .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;
            log::info!("Opened default audio output");
            self.output = Some(output);
        }
        match &self.output {
            Some((_, handle)) => Ok(handle),
            None => Err(PlaybackError::DeviceUnavailable("no output stream".to_string())),
        }
    }
}

impl AudioOutput for RodioPlayer {
    fn play(&mut self, audio: AudioBuffer) -> Result<(), PlaybackError> {
        if audio.is_empty() {
            return Err(PlaybackError::EmptyBuffer);
        }
        self.stop();

        let sink = Sink::try_new(self.handle()?)
            .map_err(|e| PlaybackError::DeviceUnavailable(e.to_string()))?;
        log::debug!(
            "Playing {:.2}s of audio at {} Hz",
            audio.duration_secs(),
            audio.sample_rate
        );
        sink.append(SamplesBuffer::new(
            audio.channels,
            audio.sample_rate,
            audio.samples,
        ));
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|sink| !sink.empty())
    }
}
