//! Capabilities the analysis loop consumes. Camera access and the pose/face
//! models live behind these traits; the loop never sees a concrete device.

use std::future::Future;

use anyhow::Result;

use super::types::{Frame, MoodSample, PoseSample};

/// Supplies frames on demand while the camera is enabled.
pub trait FrameSource: Send + 'static {
    /// Acquires the device. Fails when it is missing or access was denied.
    fn open(&mut self) -> Result<()>;

    fn grab(&mut self) -> Result<Frame>;

    /// Gives the device back. Must be safe to call on a closed source.
    fn release(&mut self);
}

/// Pose and expression inference over a single frame.
///
/// Implementations may fail or stall on any call; the caller decides what a
/// failure means. `warm_up` is invoked every time the camera is enabled and
/// should return quickly once the models are loaded.
pub trait PresenceDetector: Send + Sync + 'static {
    fn warm_up(&self) -> impl Future<Output = Result<()>> + Send;

    /// Keypoints of at most one subject.
    fn detect(&self, frame: &Frame) -> impl Future<Output = Result<PoseSample>> + Send;

    /// `None` when no face was found.
    fn detect_mood(&self, frame: &Frame) -> impl Future<Output = Result<Option<MoodSample>>> + Send;
}
