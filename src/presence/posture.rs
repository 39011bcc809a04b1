//! Shoulder-tilt posture check.
//!
//! A level shoulder line is a cheap slouch proxy that works with any pose
//! model emitting named shoulders.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::settings::AnalysisSettings;

use super::types::{PoseSample, LEFT_SHOULDER, RIGHT_SHOULDER};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostureVerdict {
    Good,
    Bad,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostureReading {
    pub verdict: PostureVerdict,
    pub should_alert: bool,
    /// Vertical shoulder offset in pixels, when both shoulders were seen.
    pub tilt_px: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct PostureEvaluator {
    min_score: f32,
    tilt_threshold_px: f32,
    cooldown: Duration,
}

impl PostureEvaluator {
    pub fn new(min_score: f32, tilt_threshold_px: f32, cooldown: Duration) -> Self {
        Self {
            min_score,
            tilt_threshold_px,
            cooldown,
        }
    }

    pub fn from_settings(settings: &AnalysisSettings) -> Self {
        Self::new(
            settings.presence_threshold,
            settings.posture_tilt_threshold_px,
            settings.posture_alert_cooldown,
        )
    }

    /// Only a bad verdict consults the cooldown; the caller records `now` as
    /// the last alert time whenever `should_alert` comes back true.
    pub fn evaluate(
        &self,
        sample: &PoseSample,
        last_alert_at: Option<Instant>,
        now: Instant,
    ) -> PostureReading {
        let shoulders = (
            sample.reliable(LEFT_SHOULDER, self.min_score),
            sample.reliable(RIGHT_SHOULDER, self.min_score),
        );
        let (Some(left), Some(right)) = shoulders else {
            return PostureReading {
                verdict: PostureVerdict::Unknown,
                should_alert: false,
                tilt_px: None,
            };
        };

        let tilt = (left.y - right.y).abs();
        if tilt > self.tilt_threshold_px {
            let cooled_down = last_alert_at
                .map(|at| now.saturating_duration_since(at) > self.cooldown)
                .unwrap_or(true);
            PostureReading {
                verdict: PostureVerdict::Bad,
                should_alert: cooled_down,
                tilt_px: Some(tilt),
            }
        } else {
            PostureReading {
                verdict: PostureVerdict::Good,
                should_alert: false,
                tilt_px: Some(tilt),
            }
        }
    }
}

impl Default for PostureEvaluator {
    fn default() -> Self {
        Self::from_settings(&AnalysisSettings::default())
    }
}
