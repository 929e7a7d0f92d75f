pub mod camera_mode;
pub mod capture;
pub mod events;
pub mod orchestrator;
pub mod photos;
pub mod traits;
pub mod vehicle;
