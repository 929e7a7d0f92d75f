use sparkvoice_core::config::ControllerConfig;
use sparkvoice_core::error::{PhotoError, ServiceError};
use sparkvoice_core::types::{AuthorizationStatus, CameraMode, MediaFile};
use std::sync::Arc;
use std::time::Duration;

use crate::camera_mode::{CameraModeLease, CameraModeManager};
use crate::events::{ControllerEvent, EventSink};
use crate::traits::{CameraService, MediaChunk, PhotoLibrary};
use crate::vehicle::VehicleLink;

// Upper bound for preallocating from the camera's size hint.
const MAX_PREALLOC_BYTES: u64 = 32 * 1024 * 1024;

/// Downloads newly produced photos from the vehicle camera into the photo library.
#[derive(Clone)]
pub struct PhotoRetrieval {
    link: VehicleLink,
    camera_modes: CameraModeManager,
    library: Arc<dyn PhotoLibrary>,
    events: EventSink,
    download_mode: CameraMode,
    restore_delay: Duration,
}

impl PhotoRetrieval {
    pub fn new(
        cfg: &ControllerConfig,
        link: VehicleLink,
        camera_modes: CameraModeManager,
        library: Arc<dyn PhotoLibrary>,
        events: EventSink,
    ) -> Self {
        Self {
            link,
            camera_modes,
            library,
            events,
            download_mode: cfg.download_mode,
            restore_delay: cfg.mode_restore_delay(),
        }
    }

    /// Handles one "new media" event. Emits exactly one `PhotoSaved`, whatever step fails.
    pub async fn process(&self, file: MediaFile) -> Result<(), PhotoError> {
        let res = self.retrieve(&file).await;
        match &res {
            Ok(()) => log::info!("photo {} saved to library", file.id),
            Err(e) => log::warn!("photo {} not saved: {e}", file.id),
        }

        self.events.emit(ControllerEvent::PhotoSaved {
            media_id: file.id.clone(),
            error: res.clone().err(),
        });
        res
    }

    async fn retrieve(&self, file: &MediaFile) -> Result<(), PhotoError> {
        if !file.media_type.is_photo() {
            return Err(PhotoError::NotAPhoto(file.media_type.clone()));
        }

        self.authorize().await?;

        let camera = self.link.camera().ok_or(PhotoError::CameraUnavailable)?;
        let mut lease = self.camera_modes.acquire(camera.clone()).await;

        let previous = lease.observe().await;
        if previous != Some(self.download_mode) {
            if let Err(e) = lease.switch_to(self.download_mode).await {
                // Some cameras serve media in the wrong mode; try anyway.
                log::warn!("failed to switch camera to {:?}: {e}", self.download_mode);
            }
        }

        // The restore timer runs from the start of the download, not its end. The lease stays
        // held until restoration so no other switch can interleave.
        let _held = if lease.switched() {
            tokio::spawn(restore_after(lease, self.restore_delay));
            None
        } else {
            Some(lease)
        };

        let data = download(&camera, file).await?;
        log::info!("downloaded {} bytes for {}", data.len(), file.id);

        self.library
            .write(data)
            .await
            .map_err(PhotoError::SaveFailed)
    }

    async fn authorize(&self) -> Result<(), PhotoError> {
        let status = match self.library.authorization_status().await {
            AuthorizationStatus::NotDetermined => self.library.request_authorization().await,
            status => status,
        };

        if status.allows_write() {
            Ok(())
        } else {
            Err(PhotoError::AuthorizationDenied(status))
        }
    }
}

async fn download(
    camera: &Arc<dyn CameraService>,
    file: &MediaFile,
) -> Result<Vec<u8>, PhotoError> {
    let mut rx = camera
        .fetch_bytes(file, 0)
        .await
        .map_err(PhotoError::DownloadFailed)?;

    let capacity = file.size_hint.unwrap_or(0).min(MAX_PREALLOC_BYTES) as usize;
    let mut data = Vec::with_capacity(capacity);

    while let Some(chunk) = rx.recv().await {
        match chunk {
            MediaChunk::Data(bytes) => data.extend_from_slice(&bytes),
            MediaChunk::Complete => {
                if data.is_empty() {
                    return Err(PhotoError::EmptyPayload);
                }
                return Ok(data);
            }
            MediaChunk::Failed(e) => return Err(PhotoError::DownloadFailed(e)),
        }
    }

    Err(PhotoError::DownloadFailed(ServiceError::new(
        "media stream ended before completion",
    )))
}

async fn restore_after(lease: CameraModeLease, delay: Duration) {
    tokio::time::sleep(delay).await;
    match lease.restore().await {
        Ok(Some(mode)) => log::info!("camera mode restored to {mode:?}"),
        Ok(None) => {}
        Err(e) => log::warn!("failed to restore camera mode: {e}"),
    }
}
