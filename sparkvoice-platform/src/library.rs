use parking_lot::Mutex;
use sparkvoice_core::error::ServiceError;
use sparkvoice_core::types::AuthorizationStatus;
use sparkvoice_engine::traits::PhotoLibrary;

/// Photo library kept in memory. The prompt answer is what the "user" picks when asked.
#[derive(Debug)]
pub struct MemoryPhotoLibrary {
    status: Mutex<AuthorizationStatus>,
    prompt_answer: AuthorizationStatus,
    pub saved: Mutex<Vec<Vec<u8>>>,
}

impl MemoryPhotoLibrary {
    pub fn authorized() -> Self {
        Self::new(AuthorizationStatus::Authorized, AuthorizationStatus::Authorized)
    }

    pub fn new(status: AuthorizationStatus, prompt_answer: AuthorizationStatus) -> Self {
        Self {
            status: Mutex::new(status),
            prompt_answer,
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn saved_count(&self) -> usize {
        self.saved.lock().len()
    }
}

impl Default for MemoryPhotoLibrary {
    fn default() -> Self {
        Self::authorized()
    }
}

#[async_trait::async_trait]
impl PhotoLibrary for MemoryPhotoLibrary {
    async fn authorization_status(&self) -> AuthorizationStatus {
        *self.status.lock()
    }

    async fn request_authorization(&self) -> AuthorizationStatus {
        let mut status = self.status.lock();
        *status = self.prompt_answer;
        *status
    }

    async fn write(&self, bytes: Vec<u8>) -> Result<(), ServiceError> {
        self.saved.lock().push(bytes);
        Ok(())
    }
}
