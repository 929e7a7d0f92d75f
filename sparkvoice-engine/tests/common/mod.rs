#![allow(dead_code)]

use parking_lot::Mutex;
use sparkvoice_core::error::ServiceError;
use sparkvoice_core::types::{
    AuthorizationStatus, CameraMode, MediaFile, SpeechAuthorization, TimelineAction,
};
use sparkvoice_engine::capture::{AudioTap, RecognitionSink};
use sparkvoice_engine::events::ControllerEvent;
use sparkvoice_engine::traits::{
    AudioFrame, AudioSource, CameraService, FlightService, MediaChunk, MissionService,
    PhotoLibrary, RecognitionTask, SpeechRecognizer,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<ControllerEvent>) -> ControllerEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("event timed out")
        .expect("event channel closed")
}

#[derive(Default)]
pub struct FakeAudio {
    pub fail_activate: bool,
    pub fail_start: bool,
    pub activations: Mutex<usize>,
    pub stops: Mutex<usize>,
    pub deactivations: Mutex<usize>,
    pub tap: Mutex<Option<AudioTap>>,
}

impl FakeAudio {
    pub fn push_frame(&self) {
        let tap = self.tap.lock().clone();
        if let Some(tap) = tap {
            tap.push(&AudioFrame {
                sample_rate_hz: 16_000,
                samples: vec![0.0; 160],
            });
        }
    }
}

impl AudioSource for FakeAudio {
    fn activate(&self) -> Result<(), ServiceError> {
        if self.fail_activate {
            return Err(ServiceError::new("audio session busy"));
        }
        *self.activations.lock() += 1;
        Ok(())
    }

    fn start(&self, tap: AudioTap) -> Result<(), ServiceError> {
        if self.fail_start {
            return Err(ServiceError::new("no input device"));
        }
        *self.tap.lock() = Some(tap);
        Ok(())
    }

    fn stop(&self) {
        *self.stops.lock() += 1;
    }

    fn deactivate(&self) -> Result<(), ServiceError> {
        *self.deactivations.lock() += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeTask {
    pub frames: Mutex<usize>,
    pub end_audio_calls: Mutex<usize>,
    pub cancels: Mutex<usize>,
}

impl RecognitionTask for FakeTask {
    fn append(&self, _frame: &AudioFrame) {
        *self.frames.lock() += 1;
    }

    fn end_audio(&self) {
        *self.end_audio_calls.lock() += 1;
    }

    fn cancel(&self) {
        *self.cancels.lock() += 1;
    }
}

/// Recognizer whose results are delivered by the test through the captured sinks.
pub struct FakeRecognizer {
    pub authorization: SpeechAuthorization,
    pub sinks: Mutex<Vec<RecognitionSink>>,
    pub tasks: Mutex<Vec<Arc<FakeTask>>>,
}

impl FakeRecognizer {
    pub fn authorized() -> Self {
        Self::with_authorization(SpeechAuthorization::Authorized)
    }

    pub fn with_authorization(authorization: SpeechAuthorization) -> Self {
        Self {
            authorization,
            sinks: Mutex::new(Vec::new()),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn last_sink(&self) -> RecognitionSink {
        self.sinks.lock().last().cloned().expect("no recognition task started")
    }

    pub fn last_task(&self) -> Arc<FakeTask> {
        self.tasks.lock().last().cloned().expect("no recognition task started")
    }
}

#[async_trait::async_trait]
impl SpeechRecognizer for FakeRecognizer {
    async fn request_authorization(&self) -> SpeechAuthorization {
        self.authorization
    }

    fn start_task(
        &self,
        sink: RecognitionSink,
    ) -> Result<Arc<dyn RecognitionTask>, ServiceError> {
        let task = Arc::new(FakeTask::default());
        self.sinks.lock().push(sink);
        self.tasks.lock().push(task.clone());
        Ok(task)
    }
}

pub struct FakeFlight {
    pub altitude: Option<f64>,
    pub takeoffs: Mutex<usize>,
    pub landings: Mutex<usize>,
}

impl FakeFlight {
    pub fn at_altitude(altitude: Option<f64>) -> Self {
        Self {
            altitude,
            takeoffs: Mutex::new(0),
            landings: Mutex::new(0),
        }
    }
}

#[async_trait::async_trait]
impl FlightService for FakeFlight {
    async fn start_takeoff(&self) -> Result<(), ServiceError> {
        *self.takeoffs.lock() += 1;
        Ok(())
    }

    async fn start_landing(&self) -> Result<(), ServiceError> {
        *self.landings.lock() += 1;
        Ok(())
    }

    fn current_altitude(&self) -> Option<f64> {
        self.altitude
    }
}

pub struct FakeCamera {
    pub mode: Mutex<CameraMode>,
    pub fail_set_mode: bool,
    pub fail_get_mode: bool,
    pub mode_requests: Mutex<Vec<CameraMode>>,
    pub captures: Mutex<usize>,
    pub fetches: Mutex<usize>,
    pub chunks: Vec<MediaChunk>,
    pub media: broadcast::Sender<MediaFile>,
}

impl FakeCamera {
    pub fn in_mode(mode: CameraMode) -> Self {
        let (media, _) = broadcast::channel(8);
        Self {
            mode: Mutex::new(mode),
            fail_set_mode: false,
            fail_get_mode: false,
            mode_requests: Mutex::new(Vec::new()),
            captures: Mutex::new(0),
            fetches: Mutex::new(0),
            chunks: vec![MediaChunk::Data(vec![0xFF, 0xD8, 0xFF, 0xD9]), MediaChunk::Complete],
            media,
        }
    }

    pub fn with_chunks(mut self, chunks: Vec<MediaChunk>) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn current_mode(&self) -> CameraMode {
        *self.mode.lock()
    }

    pub fn mode_requests(&self) -> Vec<CameraMode> {
        self.mode_requests.lock().clone()
    }
}

#[async_trait::async_trait]
impl CameraService for FakeCamera {
    async fn set_mode(&self, mode: CameraMode) -> Result<(), ServiceError> {
        self.mode_requests.lock().push(mode);
        if self.fail_set_mode {
            return Err(ServiceError::new("mode change rejected").with_code(-3));
        }
        *self.mode.lock() = mode;
        Ok(())
    }

    async fn get_mode(&self) -> Result<CameraMode, ServiceError> {
        if self.fail_get_mode {
            return Err(ServiceError::new("timeout"));
        }
        Ok(*self.mode.lock())
    }

    async fn start_capture(&self) -> Result<(), ServiceError> {
        *self.captures.lock() += 1;
        Ok(())
    }

    async fn fetch_bytes(
        &self,
        _file: &MediaFile,
        offset: u64,
    ) -> Result<mpsc::Receiver<MediaChunk>, ServiceError> {
        assert_eq!(offset, 0);
        *self.fetches.lock() += 1;

        let (tx, rx) = mpsc::channel(self.chunks.len().max(1));
        for chunk in &self.chunks {
            tx.try_send(chunk.clone()).expect("channel sized for all chunks");
        }
        Ok(rx)
    }

    fn subscribe_new_media(&self) -> broadcast::Receiver<MediaFile> {
        self.media.subscribe()
    }
}

#[derive(Default)]
pub struct FakeMission {
    pub fail_schedule: bool,
    pub fail_start: bool,
    pub calls: Mutex<Vec<&'static str>>,
    pub scheduled: Mutex<Vec<TimelineAction>>,
}

#[async_trait::async_trait]
impl MissionService for FakeMission {
    async fn stop_timeline(&self) {
        self.calls.lock().push("stop");
    }

    async fn unschedule_all(&self) {
        self.calls.lock().push("unschedule");
        self.scheduled.lock().clear();
    }

    async fn schedule_actions(&self, actions: &[TimelineAction]) -> Result<(), ServiceError> {
        self.calls.lock().push("schedule");
        if self.fail_schedule {
            return Err(ServiceError::new("invalid element"));
        }
        self.scheduled.lock().extend_from_slice(actions);
        Ok(())
    }

    async fn start_timeline(&self) -> Result<(), ServiceError> {
        self.calls.lock().push("start");
        if self.fail_start {
            return Err(ServiceError::new("aircraft not ready"));
        }
        Ok(())
    }
}

pub struct FakeLibrary {
    pub status: Mutex<AuthorizationStatus>,
    pub prompt_answer: AuthorizationStatus,
    pub prompts: Mutex<usize>,
    pub fail_write: bool,
    pub saved: Mutex<Vec<Vec<u8>>>,
}

impl FakeLibrary {
    pub fn with_status(status: AuthorizationStatus, prompt_answer: AuthorizationStatus) -> Self {
        Self {
            status: Mutex::new(status),
            prompt_answer,
            prompts: Mutex::new(0),
            fail_write: false,
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn authorized() -> Self {
        Self::with_status(AuthorizationStatus::Authorized, AuthorizationStatus::Authorized)
    }
}

#[async_trait::async_trait]
impl PhotoLibrary for FakeLibrary {
    async fn authorization_status(&self) -> AuthorizationStatus {
        *self.status.lock()
    }

    async fn request_authorization(&self) -> AuthorizationStatus {
        *self.prompts.lock() += 1;
        *self.status.lock() = self.prompt_answer;
        self.prompt_answer
    }

    async fn write(&self, bytes: Vec<u8>) -> Result<(), ServiceError> {
        if self.fail_write {
            return Err(ServiceError::new("library full"));
        }
        self.saved.lock().push(bytes);
        Ok(())
    }
}
