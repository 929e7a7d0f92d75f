use crate::fs_util::write_atomic;
use sparkvoice_core::error::ServiceError;
use sparkvoice_core::types::AuthorizationStatus;
use sparkvoice_engine::traits::PhotoLibrary;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Photo library backed by a directory.
///
/// A missing directory counts as "not yet decided"; asking for authorization creates it.
/// A read-only directory is treated as denied.
#[derive(Debug)]
pub struct FsPhotoLibrary {
    dir: PathBuf,
    seq: AtomicU64,
}

impl FsPhotoLibrary {
    pub fn at_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            seq: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn next_file_name(&self) -> String {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let n = self.seq.fetch_add(1, Ordering::Relaxed);
        format!("photo_{ts}_{n:04}.jpg")
    }
}

#[async_trait::async_trait]
impl PhotoLibrary for FsPhotoLibrary {
    async fn authorization_status(&self) -> AuthorizationStatus {
        match tokio::fs::metadata(&self.dir).await {
            Ok(meta) if !meta.is_dir() => AuthorizationStatus::Restricted,
            Ok(meta) if meta.permissions().readonly() => AuthorizationStatus::Denied,
            Ok(_) => AuthorizationStatus::Authorized,
            Err(_) => AuthorizationStatus::NotDetermined,
        }
    }

    async fn request_authorization(&self) -> AuthorizationStatus {
        match tokio::fs::create_dir_all(&self.dir).await {
            Ok(()) => {
                log::info!("created photo library at {}", self.dir.display());
                AuthorizationStatus::Authorized
            }
            Err(e) => {
                log::warn!(
                    "cannot create photo library {}: {e}",
                    self.dir.display()
                );
                AuthorizationStatus::Denied
            }
        }
    }

    async fn write(&self, bytes: Vec<u8>) -> Result<(), ServiceError> {
        let dst = self.dir.join(self.next_file_name());
        let len = bytes.len();

        let path = dst.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &bytes))
            .await
            .map_err(|e| ServiceError::new(format!("photo write task failed: {e}")))?
            .map_err(|e| ServiceError::new(format!("{e:#}")))?;

        log::info!("wrote {len} bytes to {}", dst.display());
        Ok(())
    }
}
