use parking_lot::RwLock;
use std::sync::Arc;

use crate::traits::{CameraService, FlightService, MissionService};

/// Services exposed by one connected product. Any of them may be missing.
#[derive(Clone)]
pub struct VehicleHandle {
    pub model: String,
    pub flight: Option<Arc<dyn FlightService>>,
    pub camera: Option<Arc<dyn CameraService>>,
    pub mission: Option<Arc<dyn MissionService>>,
}

impl VehicleHandle {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            flight: None,
            camera: None,
            mission: None,
        }
    }

    pub fn with_flight(mut self, flight: Arc<dyn FlightService>) -> Self {
        self.flight = Some(flight);
        self
    }

    pub fn with_camera(mut self, camera: Arc<dyn CameraService>) -> Self {
        self.camera = Some(camera);
        self
    }

    pub fn with_mission(mut self, mission: Arc<dyn MissionService>) -> Self {
        self.mission = Some(mission);
        self
    }
}

/// The currently connected vehicle, swapped by product connected/disconnected events.
///
/// Passed explicitly to every component that talks to the vehicle so tests can substitute
/// fakes.
#[derive(Clone, Default)]
pub struct VehicleLink {
    current: Arc<RwLock<Option<VehicleHandle>>>,
}

impl VehicleLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(handle: VehicleHandle) -> Self {
        let link = Self::new();
        link.connect(handle);
        link
    }

    pub fn connect(&self, handle: VehicleHandle) {
        log::info!("product connected: {}", handle.model);
        *self.current.write() = Some(handle);
    }

    pub fn disconnect(&self) {
        if let Some(prev) = self.current.write().take() {
            log::info!("product disconnected: {}", prev.model);
        }
    }

    pub fn is_connected(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn current(&self) -> Option<VehicleHandle> {
        self.current.read().clone()
    }

    pub fn model(&self) -> Option<String> {
        self.current.read().as_ref().map(|v| v.model.clone())
    }

    pub fn flight(&self) -> Option<Arc<dyn FlightService>> {
        self.current.read().as_ref().and_then(|v| v.flight.clone())
    }

    pub fn camera(&self) -> Option<Arc<dyn CameraService>> {
        self.current.read().as_ref().and_then(|v| v.camera.clone())
    }

    pub fn mission(&self) -> Option<Arc<dyn MissionService>> {
        self.current.read().as_ref().and_then(|v| v.mission.clone())
    }
}
