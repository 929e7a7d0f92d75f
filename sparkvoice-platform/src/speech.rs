use parking_lot::Mutex;
use sparkvoice_core::error::ServiceError;
use sparkvoice_core::types::SpeechAuthorization;
use sparkvoice_engine::capture::{AudioTap, RecognitionSink};
use sparkvoice_engine::traits::{
    AudioFrame, AudioSource, RecognitionEvent, RecognitionTask, SpeechRecognizer,
};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};

const SAMPLE_RATE_HZ: u32 = 16_000;

#[derive(Default)]
struct SpeechState {
    utterances: VecDeque<String>,
    tap: Option<AudioTap>,
    active: bool,
    frames_heard: usize,
}

/// Microphone and recognizer driven by queued text.
///
/// Each queued utterance is what the recognizer "hears" for one session; it is delivered as
/// the final result once end-of-audio is signalled.
pub struct ScriptedSpeech {
    this: Weak<ScriptedSpeech>,
    authorization: SpeechAuthorization,
    state: Mutex<SpeechState>,
}

impl ScriptedSpeech {
    pub fn new() -> Arc<Self> {
        Self::with_authorization(SpeechAuthorization::Authorized)
    }

    pub fn with_authorization(authorization: SpeechAuthorization) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            this: this.clone(),
            authorization,
            state: Mutex::new(SpeechState::default()),
        })
    }

    pub fn queue_utterance(&self, text: impl Into<String>) {
        self.state.lock().utterances.push_back(text.into());
    }

    /// Pushes one frame of silence through the microphone tap, if capture is running.
    pub fn feed_frame(&self) -> bool {
        let tap = {
            let state = self.state.lock();
            if !state.active {
                return false;
            }
            state.tap.clone()
        };
        let Some(tap) = tap else {
            return false;
        };
        tap.push(&AudioFrame {
            sample_rate_hz: SAMPLE_RATE_HZ,
            samples: vec![0.0; 160],
        });
        true
    }

    pub fn frames_heard(&self) -> usize {
        self.state.lock().frames_heard
    }

    pub fn is_capturing(&self) -> bool {
        self.state.lock().active
    }

    fn next_utterance(&self) -> Option<String> {
        self.state.lock().utterances.pop_front()
    }
}

impl AudioSource for ScriptedSpeech {
    fn activate(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn start(&self, tap: AudioTap) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        state.tap = Some(tap);
        state.active = true;
        Ok(())
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        state.tap = None;
        state.active = false;
    }

    fn deactivate(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for ScriptedSpeech {
    async fn request_authorization(&self) -> SpeechAuthorization {
        self.authorization
    }

    fn start_task(
        &self,
        sink: RecognitionSink,
    ) -> Result<Arc<dyn RecognitionTask>, ServiceError> {
        Ok(Arc::new(ScriptedTask {
            speech: self.this.clone(),
            sink,
            done: Mutex::new(false),
        }))
    }
}

struct ScriptedTask {
    speech: Weak<ScriptedSpeech>,
    sink: RecognitionSink,
    done: Mutex<bool>,
}

impl RecognitionTask for ScriptedTask {
    fn append(&self, _frame: &AudioFrame) {
        if let Some(speech) = self.speech.upgrade() {
            speech.state.lock().frames_heard += 1;
        }
    }

    fn end_audio(&self) {
        {
            let mut done = self.done.lock();
            if *done {
                return;
            }
            *done = true;
        }

        let utterance = self.speech.upgrade().and_then(|s| s.next_utterance());
        let event = match utterance {
            Some(text) => RecognitionEvent::Result {
                text,
                is_final: true,
            },
            None => RecognitionEvent::Error {
                message: "no speech detected".into(),
                partial: None,
            },
        };
        self.sink.deliver(event);
    }

    fn cancel(&self) {
        *self.done.lock() = true;
    }
}
