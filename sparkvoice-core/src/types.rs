use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandId(pub Uuid);

impl CommandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Operating mode of the vehicle camera. Shared between photo capture and media download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CameraMode {
    ShootPhoto,
    RecordVideo,
    Playback,
    MediaDownload,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Jpeg,
    RawDng,
    Mov,
    Mp4,
    Other(String),
}

impl MediaType {
    pub fn is_photo(&self) -> bool {
        matches!(self, MediaType::Jpeg)
    }
}

/// Reference to a file produced by the vehicle camera. Bytes are fetched through the camera
/// service; the reference itself owns nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: String,
    pub media_type: MediaType,
    pub size_hint: Option<u64>,
}

impl MediaFile {
    pub fn new(id: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            id: id.into(),
            media_type,
            size_hint: None,
        }
    }

    pub fn with_size_hint(mut self, size: u64) -> Self {
        self.size_hint = Some(size);
        self
    }
}

/// Permission state of the persistent photo library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
    Limited,
}

impl AuthorizationStatus {
    pub fn allows_write(self) -> bool {
        matches!(self, AuthorizationStatus::Authorized | AuthorizationStatus::Limited)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeechAuthorization {
    Authorized,
    Denied,
    Restricted,
    NotDetermined,
}

/// Primitive steps understood by the mission/timeline engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimelineAction {
    TakeOff,
    GoToAltitude { meters: f64 },
    ShootPhoto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Subsystem {
    Vehicle,
    Flight,
    Camera,
    Mission,
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Subsystem::Vehicle => "vehicle",
            Subsystem::Flight => "flight controller",
            Subsystem::Camera => "camera",
            Subsystem::Mission => "mission control",
        })
    }
}

/// One externally visible step of a command's action sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandStep {
    Takeoff,
    Landing,
    SetCameraMode,
    Capture,
    ScheduleTimeline,
    StartTimeline,
}

impl fmt::Display for CommandStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandStep::Takeoff => "takeoff",
            CommandStep::Landing => "landing",
            CommandStep::SetCameraMode => "set camera mode",
            CommandStep::Capture => "capture",
            CommandStep::ScheduleTimeline => "schedule timeline",
            CommandStep::StartTimeline => "start timeline",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_jpeg_counts_as_photo() {
        assert!(MediaType::Jpeg.is_photo());
        assert!(!MediaType::RawDng.is_photo());
        assert!(!MediaType::Mov.is_photo());
        assert!(!MediaType::Other("heic".into()).is_photo());
    }

    #[test]
    fn authorization_write_gate() {
        assert!(AuthorizationStatus::Authorized.allows_write());
        assert!(AuthorizationStatus::Limited.allows_write());
        assert!(!AuthorizationStatus::Denied.allows_write());
        assert!(!AuthorizationStatus::Restricted.allows_write());
        assert!(!AuthorizationStatus::NotDetermined.allows_write());
    }
}
