pub mod controller;
pub mod detector;
pub mod loop_worker;
pub mod mood;
pub mod policy;
pub mod posture;
pub mod simulated;
pub mod types;

pub use controller::CameraController;
pub use simulated::{SimulatedCamera, SimulatedDetector, SimulatedScene};
pub use types::Mood;
