use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};

use crate::error::SynthesisError;
use crate::{AudioBuffer, SynthesisEngine, SynthesisRequest};

pub type SynthesisOutcome = (SynthesisRequest, Result<AudioBuffer, SynthesisError>);

/// Runs an engine on its own thread so the UI stays responsive.
///
/// At most one request is in flight; `submit` refuses a second one until the
/// first result has been received.
pub struct SynthesisWorker {
    requests: Option<Sender<SynthesisRequest>>,
    results: Receiver<SynthesisOutcome>,
    thread: Option<JoinHandle<()>>,
    in_flight: bool,
    engine_name: String,
    speakers: Vec<String>,
    default_speaker: String,
}

impl SynthesisWorker {
    pub fn spawn(mut engine: Box<dyn SynthesisEngine>) -> std::io::Result<Self> {
        let engine_name = engine.name();
        let speakers = engine.list_speakers();
        let default_speaker = engine.default_speaker();

        let (request_tx, request_rx) = crossbeam_channel::unbounded::<SynthesisRequest>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded();

        let thread = std::thread::Builder::new()
            .name("synthesis".to_string())
            .spawn(move || {
                for request in request_rx.iter() {
                    log::debug!("Synthesizing {:?} as {}", request.text, request.speaker_id);
                    let result = engine.synthesize(&request.text, &request.speaker_id);
                    if result_tx.send((request, result)).is_err() {
                        break;
                    }
                }
                log::debug!("Synthesis worker stopped");
            })?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            thread: Some(thread),
            in_flight: false,
            engine_name,
            speakers,
            default_speaker,
        })
    }

    /// Queue a request. Returns `false` if one is already in flight.
    pub fn submit(&mut self, request: SynthesisRequest) -> bool {
        if self.in_flight {
            return false;
        }
        let sent = self
            .requests
            .as_ref()
            .is_some_and(|tx| tx.send(request).is_ok());
        self.in_flight = sent;
        sent
    }

    pub fn try_recv(&mut self) -> Option<SynthesisOutcome> {
        let outcome = self.results.try_recv().ok()?;
        self.in_flight = false;
        Some(outcome)
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn speakers(&self) -> &[String] {
        &self.speakers
    }

    pub fn default_speaker(&self) -> &str {
        &self.default_speaker
    }
}

impl Drop for SynthesisWorker {
    fn drop(&mut self) {
        // closing the request channel ends the worker loop
        self.requests.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Synthesis worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{SynthesisOutcome, SynthesisWorker};
    use crate::error::SynthesisError;
    use crate::{AudioBuffer, SynthesisEngine, SynthesisRequest};
    use std::time::{Duration, Instant};

    fn wait(worker: &mut SynthesisWorker) -> SynthesisOutcome {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(outcome) = worker.try_recv() {
                return outcome;
            }
            assert!(Instant::now() < deadline, "no result from worker");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    struct Echo;

    impl SynthesisEngine for Echo {
        fn name(&self) -> String {
            "Echo".to_string()
        }
        fn list_speakers(&self) -> Vec<String> {
            vec!["p240".to_string()]
        }
        fn default_speaker(&self) -> String {
            "p240".to_string()
        }
        fn synthesize(&mut self, text: &str, speaker_id: &str) -> Result<AudioBuffer, SynthesisError> {
            if speaker_id != "p240" {
                return Err(SynthesisError::UnknownSpeaker {
                    speaker: speaker_id.to_string(),
                    engine: self.name(),
                });
            }
            Ok(AudioBuffer::mono(vec![0.0; text.len()], 16000))
        }
    }

    #[test]
    fn one_request_in_flight_at_a_time() {
        let mut worker = SynthesisWorker::spawn(Box::new(Echo)).unwrap();
        assert_eq!(worker.engine_name(), "Echo");
        assert_eq!(worker.speakers(), ["p240".to_string()]);

        assert!(worker.submit(SynthesisRequest::new("Hello", "p240")));
        assert!(worker.is_busy());
        assert!(!worker.submit(SynthesisRequest::new("Again", "p240")));

        let (request, result) = wait(&mut worker);
        assert_eq!(request.text, "Hello");
        assert_eq!(result.unwrap().samples.len(), 5);
        assert!(!worker.is_busy());
    }

    #[test]
    fn engine_errors_come_back_as_results() {
        let mut worker = SynthesisWorker::spawn(Box::new(Echo)).unwrap();
        assert!(worker.submit(SynthesisRequest::new("Hello", "nobody")));

        let (_, result) = wait(&mut worker);
        assert!(matches!(result, Err(SynthesisError::UnknownSpeaker { .. })));
    }
}
