//! A camera and detector pair driven by a shared, mutable scene, so the
//! controller runs end to end without a webcam or a model.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use anyhow::{bail, Result};
use rand::Rng;
use tokio::time::Instant;

use super::{
    detector::{FrameSource, PresenceDetector},
    types::{Frame, Keypoint, Mood, MoodSample, PoseSample, LEFT_SHOULDER, NOSE, RIGHT_SHOULDER},
};

const FRAME_WIDTH: u32 = 640;
const FRAME_HEIGHT: u32 = 480;
const SLOUCH_OFFSET_PX: f32 = 45.0;

#[derive(Debug, Clone)]
struct Scene {
    present: bool,
    slouching: bool,
    mood: Mood,
    camera_denied: bool,
    models_broken: bool,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            present: true,
            slouching: false,
            mood: Mood::Neutral,
            camera_denied: false,
            models_broken: false,
        }
    }
}

/// What the simulated camera sees. Cloning shares the scene.
#[derive(Debug, Clone, Default)]
pub struct SimulatedScene {
    inner: Arc<Mutex<Scene>>,
}

impl SimulatedScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_present(&self, present: bool) {
        self.lock().present = present;
    }

    pub fn set_slouching(&self, slouching: bool) {
        self.lock().slouching = slouching;
    }

    pub fn set_mood(&self, mood: Mood) {
        self.lock().mood = mood;
    }

    pub fn deny_camera(&self, denied: bool) {
        self.lock().camera_denied = denied;
    }

    pub fn break_models(&self, broken: bool) {
        self.lock().models_broken = broken;
    }

    fn snapshot(&self) -> Scene {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Scene> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct SimulatedCamera {
    scene: SimulatedScene,
    open: bool,
    sequence: u64,
}

impl SimulatedCamera {
    pub fn new(scene: SimulatedScene) -> Self {
        Self {
            scene,
            open: false,
            sequence: 0,
        }
    }

}

impl FrameSource for SimulatedCamera {
    fn open(&mut self) -> Result<()> {
        if self.scene.snapshot().camera_denied {
            bail!("camera access denied");
        }
        self.open = true;
        Ok(())
    }

    fn grab(&mut self) -> Result<Frame> {
        if !self.open {
            bail!("camera is not open");
        }
        self.sequence += 1;
        Ok(Frame {
            sequence: self.sequence,
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            captured_at: Instant::now(),
        })
    }

    fn release(&mut self) {
        self.open = false;
    }
}

pub struct SimulatedDetector {
    scene: SimulatedScene,
    latency: Duration,
}

impl SimulatedDetector {
    pub fn new(scene: SimulatedScene, latency: Duration) -> Self {
        Self { scene, latency }
    }
}

impl PresenceDetector for SimulatedDetector {
    fn warm_up(&self) -> impl Future<Output = Result<()>> + Send {
        async move {
            tokio::time::sleep(self.latency * 10).await;
            if self.scene.snapshot().models_broken {
                bail!("model weights could not be loaded");
            }
            Ok(())
        }
    }

    fn detect(&self, frame: &Frame) -> impl Future<Output = Result<PoseSample>> + Send {
        let (width, height) = (frame.width as f32, frame.height as f32);
        async move {
            tokio::time::sleep(self.latency).await;
            let scene = self.scene.snapshot();
            if !scene.present {
                return Ok(PoseSample::empty());
            }
            Ok(synthesize_pose(&scene, width, height))
        }
    }

    fn detect_mood(&self, _frame: &Frame) -> impl Future<Output = Result<Option<MoodSample>>> + Send {
        async move {
            tokio::time::sleep(self.latency * 2).await;
            let scene = self.scene.snapshot();
            if !scene.present {
                return Ok(None);
            }
            Ok(Some(synthesize_mood(scene.mood)))
        }
    }
}

fn synthesize_pose(scene: &Scene, width: f32, height: f32) -> PoseSample {
    let mut rng = rand::thread_rng();
    let center_x = width / 2.0;
    let nose_y = height * 0.31;
    let eye_y = nose_y - 15.0;
    let left_y = height * 0.625 + rng.gen_range(-4.0f32..4.0);
    let right_y = if scene.slouching {
        left_y + SLOUCH_OFFSET_PX + rng.gen_range(0.0f32..6.0)
    } else {
        left_y + rng.gen_range(-8.0f32..8.0)
    };

    PoseSample::new(vec![
        Keypoint::new(NOSE, center_x, nose_y, rng.gen_range(0.8..0.99)),
        Keypoint::new("left_eye", center_x + 20.0, eye_y, rng.gen_range(0.7..0.95)),
        Keypoint::new("right_eye", center_x - 20.0, eye_y, rng.gen_range(0.7..0.95)),
        Keypoint::new(LEFT_SHOULDER, center_x + 90.0, left_y, rng.gen_range(0.6..0.95)),
        Keypoint::new(RIGHT_SHOULDER, center_x - 90.0, right_y, rng.gen_range(0.6..0.95)),
    ])
}

fn synthesize_mood(dominant: Mood) -> MoodSample {
    let mut rng = rand::thread_rng();
    let top: f32 = rng.gen_range(0.6..0.9);
    let rest = (1.0 - top) / (Mood::ALL.len() - 1) as f32;
    Mood::ALL.into_iter().fold(MoodSample::new(), |sample, mood| {
        sample.with(mood, if mood == dominant { top } else { rest })
    })
}
