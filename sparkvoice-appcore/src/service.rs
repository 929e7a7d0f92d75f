use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use sparkvoice_core::config::ControllerConfig;
use sparkvoice_core::error::{CaptureError, PhotoError};
use sparkvoice_core::intent::Intent;
use sparkvoice_core::types::{CommandId, MediaFile};
use sparkvoice_engine::camera_mode::CameraModeManager;
use sparkvoice_engine::capture::{CaptureSession, CaptureState};
use sparkvoice_engine::events::{ControllerEvent, EventSink};
use sparkvoice_engine::orchestrator::CommandOrchestrator;
use sparkvoice_engine::photos::PhotoRetrieval;
use sparkvoice_engine::traits::{AudioSource, PhotoLibrary, SpeechRecognizer};
use sparkvoice_engine::vehicle::{VehicleHandle, VehicleLink};
use sparkvoice_runtime::config_store::ConfigStore;
use sparkvoice_runtime::photo_library::FsPhotoLibrary;

/// Wires speech capture, command execution and photo retrieval to one connected vehicle.
///
/// All lifecycle events reach the presentation layer through the single receiver returned by
/// `start`, in the order they were produced.
pub struct AppService {
    cfg: ControllerConfig,
    link: VehicleLink,
    capture: CaptureSession,
    orchestrator: CommandOrchestrator,
    photos: PhotoRetrieval,
    router: JoinHandle<()>,
    media_task: Mutex<Option<JoinHandle<()>>>,
}

impl AppService {
    /// Must be called from within a tokio runtime; spawns the event router.
    pub fn start(
        cfg: ControllerConfig,
        audio: Arc<dyn AudioSource>,
        recognizer: Arc<dyn SpeechRecognizer>,
        library: Arc<dyn PhotoLibrary>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (events, engine_rx) = EventSink::channel();
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();

        let link = VehicleLink::new();
        let camera_modes = CameraModeManager::new();
        let capture = CaptureSession::new(audio, recognizer, events.clone());
        let orchestrator = CommandOrchestrator::new(
            cfg.clone(),
            link.clone(),
            camera_modes.clone(),
            events.clone(),
        );
        let photos = PhotoRetrieval::new(&cfg, link.clone(), camera_modes, library, events);

        let router = tokio::spawn(route_events(engine_rx, ui_tx, orchestrator.clone()));

        let svc = Arc::new(Self {
            cfg,
            link,
            capture,
            orchestrator,
            photos,
            router,
            media_task: Mutex::new(None),
        });
        (svc, ui_rx)
    }

    /// Loads config from disk (defaults if absent). Photos go to `photo_dir`, else the
    /// directory named in the config, else `photos/` next to the config file.
    pub fn open(
        config_path: PathBuf,
        photo_dir: Option<PathBuf>,
        audio: Arc<dyn AudioSource>,
        recognizer: Arc<dyn SpeechRecognizer>,
    ) -> anyhow::Result<(Arc<Self>, mpsc::UnboundedReceiver<ControllerEvent>)> {
        let store = ConfigStore::at_path(config_path);
        let mut cfg = store.load_or_default()?;
        if photo_dir.is_some() {
            cfg.photo_dir = photo_dir;
        }

        let photo_dir = cfg.photo_dir.clone().unwrap_or_else(|| {
            store
                .path()
                .parent()
                .map(|p| p.join("photos"))
                .unwrap_or_else(|| PathBuf::from("photos"))
        });
        log::info!("photo library: {}", photo_dir.display());

        let library = Arc::new(FsPhotoLibrary::at_dir(photo_dir));
        Ok(Self::start(cfg, audio, recognizer, library))
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.cfg
    }

    pub fn product_connected(&self, handle: VehicleHandle) {
        let media_rx = handle.camera.as_ref().map(|c| c.subscribe_new_media());
        self.link.connect(handle);

        let task = media_rx.map(|rx| tokio::spawn(forward_media(rx, self.photos.clone())));
        if let Some(prev) = std::mem::replace(&mut *self.media_task.lock(), task) {
            prev.abort();
        }
    }

    pub fn product_disconnected(&self) {
        self.link.disconnect();
        if let Some(task) = self.media_task.lock().take() {
            task.abort();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn connected_model(&self) -> Option<String> {
        self.link.model()
    }

    pub async fn start_listening(&self) -> Result<bool, CaptureError> {
        self.capture.start().await
    }

    pub fn stop_listening(&self) -> bool {
        self.capture.request_stop()
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    /// Dispatches an intent that did not come from speech (e.g. an on-screen button).
    pub fn dispatch(&self, intent: Intent) -> CommandId {
        self.orchestrator.handle(intent)
    }

    /// Runs the photo workflow for a media event delivered outside the camera subscription.
    pub async fn retrieve_media(&self, file: MediaFile) -> Result<(), PhotoError> {
        self.photos.process(file).await
    }

    pub fn shutdown(&self) {
        self.product_disconnected();
        self.router.abort();
    }
}

impl Drop for AppService {
    fn drop(&mut self) {
        self.router.abort();
        if let Some(task) = self.media_task.get_mut().take() {
            task.abort();
        }
    }
}

async fn route_events(
    mut engine_rx: mpsc::UnboundedReceiver<ControllerEvent>,
    ui_tx: mpsc::UnboundedSender<ControllerEvent>,
    orchestrator: CommandOrchestrator,
) {
    while let Some(event) = engine_rx.recv().await {
        let intent = match &event {
            ControllerEvent::IntentDetected { intent, .. } => Some(*intent),
            _ => None,
        };

        if ui_tx.send(event).is_err() {
            log::debug!("presentation layer gone; events are no longer delivered");
        }

        // Forwarded after the notification so subscribers see the intent before its command.
        if let Some(intent) = intent {
            orchestrator.handle(intent);
        }
    }
}

// Aborting this loop only stops the subscription. Each event runs in its own task so a
// workflow already under way still reports its `PhotoSaved` after a disconnect.
async fn forward_media(mut rx: broadcast::Receiver<MediaFile>, photos: PhotoRetrieval) {
    loop {
        match rx.recv().await {
            Ok(file) => {
                let photos = photos.clone();
                tokio::spawn(async move {
                    let _ = photos.process(file).await;
                });
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                log::warn!("missed {n} new-media events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
