use sparkvoice_core::error::ServiceError;
use sparkvoice_core::types::CameraMode;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::traits::CameraService;

/// Single owner of the camera's operating mode.
///
/// Photo capture and media download both change the mode. Each must hold a lease for the
/// whole switch -> use -> restore sequence so two sequences never interleave.
#[derive(Clone, Default)]
pub struct CameraModeManager {
    lock: Arc<Mutex<()>>,
}

impl CameraModeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other lease is outstanding.
    pub async fn acquire(&self, camera: Arc<dyn CameraService>) -> CameraModeLease {
        let permit = self.lock.clone().lock_owned().await;
        CameraModeLease {
            camera,
            previous: None,
            target: None,
            switched: false,
            _permit: permit,
        }
    }

    pub fn is_leased(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

/// Temporary custody of the camera mode. Dropping it releases the camera without restoring.
pub struct CameraModeLease {
    camera: Arc<dyn CameraService>,
    previous: Option<CameraMode>,
    target: Option<CameraMode>,
    switched: bool,
    _permit: OwnedMutexGuard<()>,
}

impl CameraModeLease {
    /// Best-effort read of the current mode. On failure the previous mode stays unknown and
    /// `restore` becomes a no-op.
    pub async fn observe(&mut self) -> Option<CameraMode> {
        match self.camera.get_mode().await {
            Ok(mode) => {
                self.previous = Some(mode);
                Some(mode)
            }
            Err(e) => {
                log::warn!("failed to read camera mode: {e}");
                None
            }
        }
    }

    pub fn previous(&self) -> Option<CameraMode> {
        self.previous
    }

    pub fn switched(&self) -> bool {
        self.switched
    }

    pub async fn switch_to(&mut self, mode: CameraMode) -> Result<(), ServiceError> {
        self.target = Some(mode);
        self.camera.set_mode(mode).await?;
        self.switched = true;
        Ok(())
    }

    /// Puts back the observed mode, but only if this lease changed it.
    ///
    /// Returns the restored mode, or `None` when there was nothing to restore.
    pub async fn restore(self) -> Result<Option<CameraMode>, ServiceError> {
        let Some(previous) = self.previous else {
            return Ok(None);
        };
        if !self.switched || self.target == Some(previous) {
            return Ok(None);
        }

        self.camera.set_mode(previous).await?;
        Ok(Some(previous))
    }
}
