use crate::types::{AuthorizationStatus, CommandStep, MediaType, Subsystem};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification shared by every error reported through a completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Unavailable,
    Rejected,
    SequenceAborted,
    Unauthorized,
    MalformedInput,
}

/// Error returned by an external vehicle or storage service. Passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct ServiceError {
    pub code: Option<i64>,
    pub message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("{0} unavailable")]
    Unavailable(Subsystem),

    #[error("{step} rejected: {source}")]
    Rejected {
        step: CommandStep,
        source: ServiceError,
    },

    #[error("sequence aborted at {failed}: {source}")]
    SequenceAborted {
        failed: CommandStep,
        source: ServiceError,
        skipped: Vec<CommandStep>,
    },
}

impl CommandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommandError::Unavailable(_) => ErrorKind::Unavailable,
            CommandError::Rejected { .. } => ErrorKind::Rejected,
            CommandError::SequenceAborted { .. } => ErrorKind::SequenceAborted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhotoError {
    #[error("media file is not a JPEG photo: {0:?}")]
    NotAPhoto(MediaType),

    #[error("photo library access denied ({0:?})")]
    AuthorizationDenied(AuthorizationStatus),

    #[error("camera unavailable")]
    CameraUnavailable,

    #[error("download failed: {0}")]
    DownloadFailed(ServiceError),

    #[error("no photo data received")]
    EmptyPayload,

    #[error("failed to save photo: {0}")]
    SaveFailed(ServiceError),
}

impl PhotoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PhotoError::NotAPhoto(_) | PhotoError::EmptyPayload => ErrorKind::MalformedInput,
            PhotoError::AuthorizationDenied(_) => ErrorKind::Unauthorized,
            PhotoError::CameraUnavailable => ErrorKind::Unavailable,
            PhotoError::DownloadFailed(_) | PhotoError::SaveFailed(_) => ErrorKind::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("speech recognition not authorized ({0:?})")]
    NotAuthorized(crate::types::SpeechAuthorization),

    #[error("failed to start recognition task: {0}")]
    Recognizer(ServiceError),

    #[error("failed to start audio capture: {0}")]
    Audio(ServiceError),
}

impl CaptureError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptureError::NotAuthorized(_) => ErrorKind::Unauthorized,
            CaptureError::Recognizer(_) | CaptureError::Audio(_) => ErrorKind::Unavailable,
        }
    }
}
