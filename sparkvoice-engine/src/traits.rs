use async_trait::async_trait;
use sparkvoice_core::error::ServiceError;
use sparkvoice_core::types::{
    AuthorizationStatus, CameraMode, MediaFile, SpeechAuthorization, TimelineAction,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::capture::{AudioTap, RecognitionSink};

#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    // Mono PCM samples at `sample_rate_hz`, as delivered by the audio device.
    pub sample_rate_hz: u32,
    pub samples: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Result { text: String, is_final: bool },

    // A terminal failure. Recognizers may still attach whatever text they had.
    Error {
        message: String,
        partial: Option<String>,
    },
}

/// One piece of an in-order media download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaChunk {
    Data(Vec<u8>),
    Complete,
    Failed(ServiceError),
}

#[async_trait]
pub trait FlightService: Send + Sync {
    async fn start_takeoff(&self) -> Result<(), ServiceError>;
    async fn start_landing(&self) -> Result<(), ServiceError>;

    /// Altitude in meters relative to the takeoff point, if the flight controller knows it.
    fn current_altitude(&self) -> Option<f64>;
}

#[async_trait]
pub trait CameraService: Send + Sync {
    async fn set_mode(&self, mode: CameraMode) -> Result<(), ServiceError>;
    async fn get_mode(&self) -> Result<CameraMode, ServiceError>;
    async fn start_capture(&self) -> Result<(), ServiceError>;

    /// Streams the file's bytes starting at `offset`. Chunks arrive in file order and the
    /// stream ends with exactly one `Complete` or `Failed`.
    async fn fetch_bytes(
        &self,
        file: &MediaFile,
        offset: u64,
    ) -> Result<mpsc::Receiver<MediaChunk>, ServiceError>;

    /// "New media produced" notifications.
    fn subscribe_new_media(&self) -> broadcast::Receiver<MediaFile>;
}

#[async_trait]
pub trait MissionService: Send + Sync {
    async fn stop_timeline(&self);
    async fn unschedule_all(&self);
    async fn schedule_actions(&self, actions: &[TimelineAction]) -> Result<(), ServiceError>;
    async fn start_timeline(&self) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait PhotoLibrary: Send + Sync {
    async fn authorization_status(&self) -> AuthorizationStatus;

    /// Prompts the user. Only called while the status is `NotDetermined`.
    async fn request_authorization(&self) -> AuthorizationStatus;

    /// Persists the bytes verbatim.
    async fn write(&self, bytes: Vec<u8>) -> Result<(), ServiceError>;
}

/// Microphone-side of a capture session. Methods are called from the session owner, while
/// frames are pushed from whatever thread the device uses.
pub trait AudioSource: Send + Sync {
    fn activate(&self) -> Result<(), ServiceError>;
    fn start(&self, tap: AudioTap) -> Result<(), ServiceError>;

    // Must be idempotent: teardown calls it even if capture already stopped.
    fn stop(&self);

    fn deactivate(&self) -> Result<(), ServiceError>;
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn request_authorization(&self) -> SpeechAuthorization;

    fn start_task(&self, sink: RecognitionSink)
    -> Result<Arc<dyn RecognitionTask>, ServiceError>;
}

pub trait RecognitionTask: Send + Sync {
    fn append(&self, frame: &AudioFrame);

    /// No more audio is coming; the task should deliver its last result.
    fn end_audio(&self);

    fn cancel(&self);
}
