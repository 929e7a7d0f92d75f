use parking_lot::Mutex;
use sparkvoice_core::error::ServiceError;
use sparkvoice_core::types::{CameraMode, MediaFile, MediaType, TimelineAction};
use sparkvoice_engine::traits::{CameraService, FlightService, MediaChunk, MissionService};
use sparkvoice_engine::vehicle::VehicleHandle;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

// Hover height after an automatic takeoff.
const TAKEOFF_HOVER_M: f64 = 1.2;
const DEFAULT_CHUNK_SIZE: usize = 4096;

#[derive(Debug)]
struct AircraftState {
    flying: bool,
    altitude_m: f64,
    mode: CameraMode,
    photos: HashMap<String, Vec<u8>>,
    next_photo: u32,
    timeline: Vec<TimelineAction>,
    timeline_running: bool,
    timeline_generation: u64,
}

/// A simulated aircraft exposing flight, camera and mission services.
///
/// Refuses takeoff while airborne and landing while grounded, produces a JPEG media event per
/// capture, and serves media bytes in fixed-size chunks.
pub struct SimulatedAircraft {
    model: String,
    this: Weak<SimulatedAircraft>,
    state: Mutex<AircraftState>,
    media_tx: broadcast::Sender<MediaFile>,
    chunk_size: usize,
    step_delay: Duration,
}

impl SimulatedAircraft {
    pub fn new(model: impl Into<String>) -> Arc<Self> {
        Self::with_options(model, DEFAULT_CHUNK_SIZE, Duration::from_millis(200))
    }

    pub fn with_options(
        model: impl Into<String>,
        chunk_size: usize,
        step_delay: Duration,
    ) -> Arc<Self> {
        let model = model.into();
        let (media_tx, _) = broadcast::channel(16);
        Arc::new_cyclic(|this| Self {
            model,
            this: this.clone(),
            state: Mutex::new(AircraftState {
                flying: false,
                altitude_m: 0.0,
                mode: CameraMode::ShootPhoto,
                photos: HashMap::new(),
                next_photo: 1,
                timeline: Vec::new(),
                timeline_running: false,
                timeline_generation: 0,
            }),
            media_tx,
            chunk_size: chunk_size.max(1),
            step_delay,
        })
    }

    pub fn handle(self: &Arc<Self>) -> VehicleHandle {
        VehicleHandle::new(self.model.clone())
            .with_flight(self.clone())
            .with_camera(self.clone())
            .with_mission(self.clone())
    }

    pub fn is_flying(&self) -> bool {
        self.state.lock().flying
    }

    pub fn altitude(&self) -> f64 {
        self.state.lock().altitude_m
    }

    pub fn camera_mode(&self) -> CameraMode {
        self.state.lock().mode
    }

    pub fn scheduled_timeline(&self) -> Vec<TimelineAction> {
        self.state.lock().timeline.clone()
    }

    pub fn photo_bytes(&self, id: &str) -> Option<Vec<u8>> {
        self.state.lock().photos.get(id).cloned()
    }

    fn takeoff(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        if state.flying {
            return Err(ServiceError::new("aircraft is already in the air"));
        }
        state.flying = true;
        state.altitude_m = TAKEOFF_HOVER_M;
        Ok(())
    }

    fn capture(&self) -> Result<MediaFile, ServiceError> {
        let file = {
            let mut state = self.state.lock();
            if state.mode != CameraMode::ShootPhoto {
                return Err(ServiceError::new(format!(
                    "camera is in {:?} mode",
                    state.mode
                )));
            }
            let n = state.next_photo;
            state.next_photo += 1;

            let id = format!("DJI_{n:04}.JPG");
            let bytes = fake_jpeg(n);
            let file = MediaFile::new(id.clone(), MediaType::Jpeg).with_size_hint(bytes.len() as u64);
            state.photos.insert(id, bytes);
            file
        };

        // No subscribers is fine; nobody is downloading.
        let _ = self.media_tx.send(file.clone());
        Ok(file)
    }

    async fn run_timeline(self: Arc<Self>, generation: u64, actions: Vec<TimelineAction>) {
        for action in actions {
            tokio::time::sleep(self.step_delay).await;
            {
                let state = self.state.lock();
                if !state.timeline_running || state.timeline_generation != generation {
                    log::info!("[sim] timeline stopped");
                    return;
                }
            }

            let res = match action {
                TimelineAction::TakeOff => self.takeoff(),
                TimelineAction::GoToAltitude { meters } => {
                    self.state.lock().altitude_m = meters;
                    Ok(())
                }
                TimelineAction::ShootPhoto => {
                    self.state.lock().mode = CameraMode::ShootPhoto;
                    self.capture().map(|_| ())
                }
            };
            match res {
                Ok(()) => log::info!("[sim] timeline step done: {action:?}"),
                Err(e) => log::warn!("[sim] timeline step {action:?} failed: {e}"),
            }
        }

        let mut state = self.state.lock();
        if state.timeline_generation == generation {
            state.timeline_running = false;
        }
    }
}

fn fake_jpeg(n: u32) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0];
    bytes.extend((0..10_000u32).map(|i| (i.wrapping_mul(31).wrapping_add(n)) as u8));
    bytes.extend([0xFF, 0xD9]);
    bytes
}

#[async_trait::async_trait]
impl FlightService for SimulatedAircraft {
    async fn start_takeoff(&self) -> Result<(), ServiceError> {
        self.takeoff()?;
        log::info!("[sim] takeoff started");
        Ok(())
    }

    async fn start_landing(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        if !state.flying {
            return Err(ServiceError::new("aircraft is already on the ground"));
        }
        state.flying = false;
        state.altitude_m = 0.0;
        log::info!("[sim] landing started");
        Ok(())
    }

    fn current_altitude(&self) -> Option<f64> {
        Some(self.state.lock().altitude_m)
    }
}

#[async_trait::async_trait]
impl CameraService for SimulatedAircraft {
    async fn set_mode(&self, mode: CameraMode) -> Result<(), ServiceError> {
        self.state.lock().mode = mode;
        Ok(())
    }

    async fn get_mode(&self) -> Result<CameraMode, ServiceError> {
        Ok(self.state.lock().mode)
    }

    async fn start_capture(&self) -> Result<(), ServiceError> {
        let file = self.capture()?;
        log::info!("[sim] captured {}", file.id);
        Ok(())
    }

    async fn fetch_bytes(
        &self,
        file: &MediaFile,
        offset: u64,
    ) -> Result<mpsc::Receiver<MediaChunk>, ServiceError> {
        let bytes = self
            .photo_bytes(&file.id)
            .ok_or_else(|| ServiceError::new(format!("unknown media file: {}", file.id)))?;
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(bytes.len());

        let (tx, rx) = mpsc::channel(8);
        let chunk_size = self.chunk_size;
        tokio::spawn(async move {
            for chunk in bytes[start..].chunks(chunk_size) {
                if tx.send(MediaChunk::Data(chunk.to_vec())).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(MediaChunk::Complete).await;
        });
        Ok(rx)
    }

    fn subscribe_new_media(&self) -> broadcast::Receiver<MediaFile> {
        self.media_tx.subscribe()
    }
}

#[async_trait::async_trait]
impl MissionService for SimulatedAircraft {
    async fn stop_timeline(&self) {
        let mut state = self.state.lock();
        state.timeline_running = false;
    }

    async fn unschedule_all(&self) {
        self.state.lock().timeline.clear();
    }

    async fn schedule_actions(&self, actions: &[TimelineAction]) -> Result<(), ServiceError> {
        let mut state = self.state.lock();
        if state.timeline_running {
            return Err(ServiceError::new("timeline is running"));
        }
        state.timeline.extend_from_slice(actions);
        Ok(())
    }

    async fn start_timeline(&self) -> Result<(), ServiceError> {
        let (generation, actions) = {
            let mut state = self.state.lock();
            if state.timeline.is_empty() {
                return Err(ServiceError::new("no scheduled elements"));
            }
            state.timeline_running = true;
            state.timeline_generation += 1;
            (state.timeline_generation, state.timeline.clone())
        };

        let this = self
            .this
            .upgrade()
            .ok_or_else(|| ServiceError::new("aircraft released"))?;
        tokio::spawn(this.run_timeline(generation, actions));
        Ok(())
    }
}
