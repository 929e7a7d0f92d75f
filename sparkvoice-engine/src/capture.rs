use parking_lot::Mutex;
use serde::Serialize;
use sparkvoice_core::error::CaptureError;
use sparkvoice_core::intent::classify;
use sparkvoice_core::text::non_empty_transcript;
use sparkvoice_core::types::SpeechAuthorization;
use std::sync::{Arc, Weak};

use crate::events::{ControllerEvent, EventSink};
use crate::traits::{AudioFrame, AudioSource, RecognitionEvent, RecognitionTask, SpeechRecognizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    #[default]
    Idle,
    Active,
    // Audio halted, recognition task still allowed to deliver its last result.
    Finalizing,
}

#[derive(Default)]
struct Inner {
    state: CaptureState,

    // Bumped on every start; taps and sinks from older sessions are ignored.
    generation: u64,

    // Set exactly once per session by whichever signal claims teardown first.
    finalized: bool,

    task: Option<Arc<dyn RecognitionTask>>,
    partial: String,
    teardowns: u64,
}

struct Shared {
    inner: Mutex<Inner>,
    audio: Arc<dyn AudioSource>,
    recognizer: Arc<dyn SpeechRecognizer>,
    events: EventSink,
}

/// Continuous speech capture: audio frames -> recognition task -> classified intent.
///
/// Three signals can end a session and may race: a final result, a recognition error, and a
/// result that arrives after `request_stop`. Whichever claims the session first runs teardown;
/// the others are no-ops.
#[derive(Clone)]
pub struct CaptureSession {
    shared: Arc<Shared>,
}

/// Handed to the audio source; forwards frames into the current recognition task.
#[derive(Clone)]
pub struct AudioTap {
    shared: Weak<Shared>,
    generation: u64,
}

impl AudioTap {
    pub fn push(&self, frame: &AudioFrame) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let task = {
            let inner = shared.inner.lock();
            if inner.generation != self.generation
                || inner.finalized
                || inner.state != CaptureState::Active
            {
                return;
            }
            inner.task.clone()
        };
        if let Some(task) = task {
            task.append(frame);
        }
    }
}

/// Handed to the recognizer; delivers results back into the session that created it.
#[derive(Clone)]
pub struct RecognitionSink {
    shared: Weak<Shared>,
    generation: u64,
}

impl RecognitionSink {
    pub fn deliver(&self, event: RecognitionEvent) {
        if let Some(shared) = self.shared.upgrade() {
            shared.on_recognition(self.generation, event);
        }
    }
}

impl CaptureSession {
    pub fn new(
        audio: Arc<dyn AudioSource>,
        recognizer: Arc<dyn SpeechRecognizer>,
        events: EventSink,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                audio,
                recognizer,
                events,
            }),
        }
    }

    pub fn state(&self) -> CaptureState {
        self.shared.inner.lock().state
    }

    pub fn is_listening(&self) -> bool {
        self.state() == CaptureState::Active
    }

    /// Latest non-final text of the running session, for live preview.
    pub fn partial_transcript(&self) -> Option<String> {
        let inner = self.shared.inner.lock();
        if inner.partial.is_empty() {
            None
        } else {
            Some(inner.partial.clone())
        }
    }

    /// Number of sessions that have been torn down so far.
    pub fn teardown_count(&self) -> u64 {
        self.shared.inner.lock().teardowns
    }

    /// Idle -> Active. Returns `Ok(false)` if a session is already running.
    pub async fn start(&self) -> Result<bool, CaptureError> {
        if self.state() != CaptureState::Idle {
            log::debug!("start ignored: capture session already running");
            return Ok(false);
        }

        let auth = self.shared.recognizer.request_authorization().await;
        if auth != SpeechAuthorization::Authorized {
            log::warn!("speech recognition not authorized: {auth:?}");
            return Err(CaptureError::NotAuthorized(auth));
        }

        let generation = {
            let mut inner = self.shared.inner.lock();
            if inner.state != CaptureState::Idle {
                return Ok(false);
            }
            inner.generation = inner.generation.wrapping_add(1);
            inner.state = CaptureState::Active;
            inner.finalized = false;
            inner.partial.clear();
            inner.task = None;
            inner.generation
        };

        if let Err(e) = self.shared.audio.activate() {
            log::error!("failed to activate audio session: {e}");
            self.shared.abort(generation, None, false);
            return Err(CaptureError::Audio(e));
        }

        let sink = RecognitionSink {
            shared: Arc::downgrade(&self.shared),
            generation,
        };
        let task = match self.shared.recognizer.start_task(sink) {
            Ok(task) => task,
            Err(e) => {
                log::error!("failed to start recognition task: {e}");
                self.shared.abort(generation, None, true);
                return Err(CaptureError::Recognizer(e));
            }
        };

        let stop_requested = {
            let mut inner = self.shared.inner.lock();
            if inner.generation != generation || inner.finalized {
                // The recognizer already ended this session while we were starting it.
                drop(inner);
                task.cancel();
                return Ok(true);
            }
            inner.task = Some(task.clone());
            inner.state == CaptureState::Finalizing
        };
        if stop_requested {
            task.end_audio();
            return Ok(true);
        }

        let tap = AudioTap {
            shared: Arc::downgrade(&self.shared),
            generation,
        };
        if let Err(e) = self.shared.audio.start(tap) {
            log::error!("failed to start audio capture: {e}");
            self.shared.abort(generation, Some(task), true);
            return Err(CaptureError::Audio(e));
        }

        log::info!("capture session {generation} active");
        Ok(true)
    }

    /// Active -> Finalizing. Stops the microphone and signals end-of-input, but lets the
    /// recognition task finish so the last utterance is not lost.
    pub fn request_stop(&self) -> bool {
        let (generation, task) = {
            let mut inner = self.shared.inner.lock();
            if inner.state != CaptureState::Active || inner.finalized {
                log::debug!("stop ignored: capture session is {:?}", inner.state);
                return false;
            }
            inner.state = CaptureState::Finalizing;
            (inner.generation, inner.task.clone())
        };

        self.shared.audio.stop();
        if let Some(task) = task {
            task.end_audio();
        }
        log::info!("capture session {generation} finalizing");
        true
    }
}

impl Shared {
    fn on_recognition(&self, generation: u64, event: RecognitionEvent) {
        let (task, transcript) = {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.finalized {
                log::debug!("ignoring recognition callback for finished session {generation}");
                return;
            }

            let transcript = match event {
                RecognitionEvent::Result { text, is_final } => {
                    // After a stop request any result is authoritative, final or not.
                    if !is_final && inner.state == CaptureState::Active {
                        inner.partial = text;
                        return;
                    }
                    Some(text)
                }
                RecognitionEvent::Error { message, partial } => {
                    log::warn!("recognition error: {message}");
                    partial
                }
            };

            inner.finalized = true;
            (inner.task.take(), transcript)
        };

        self.teardown(generation, task, true);

        if let Some(text) = transcript {
            self.deliver_transcript(&text);
        }
    }

    // `activated` is false when the audio session never came up; it is then not deactivated.
    fn abort(&self, generation: u64, task: Option<Arc<dyn RecognitionTask>>, activated: bool) {
        let claimed = {
            let mut inner = self.inner.lock();
            if inner.generation != generation || inner.finalized {
                false
            } else {
                inner.finalized = true;
                inner.task.take();
                true
            }
        };
        if let Some(task) = &task {
            task.cancel();
        }
        if claimed {
            self.teardown(generation, None, activated);
        }
    }

    fn teardown(&self, generation: u64, task: Option<Arc<dyn RecognitionTask>>, deactivate: bool) {
        self.audio.stop();
        drop(task);
        if deactivate {
            if let Err(e) = self.audio.deactivate() {
                log::warn!("failed to deactivate audio session: {e}");
            }
        }

        // Only now may a new session start; otherwise this teardown could stop its audio.
        let mut inner = self.inner.lock();
        if inner.generation == generation {
            inner.state = CaptureState::Idle;
            inner.partial.clear();
        }
        inner.teardowns += 1;
        log::info!("capture session {generation} idle");
    }

    fn deliver_transcript(&self, text: &str) {
        let Some(text) = non_empty_transcript(text) else {
            return;
        };
        log::info!("recognized: {text}");

        match classify(&text) {
            Some(intent) => self.events.emit(ControllerEvent::IntentDetected { text, intent }),
            None => log::info!("no intent matched for: {text}"),
        }
    }
}
