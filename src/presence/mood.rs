//! Edge-triggered mood check-ins.

use std::time::Duration;

use tokio::time::Instant;

use super::types::{Mood, MoodSample};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoodReading {
    pub mood: Mood,
    pub should_alert: bool,
}

/// Alerts when the dominant mood turns negative and differs from the mood
/// already acknowledged. The caller stores `reading.mood` as the new
/// acknowledged mood, so a neutral or positive sample re-arms the alert.
pub fn evaluate_mood(sample: &MoodSample, acknowledged: Mood) -> Option<MoodReading> {
    let mood = sample.dominant()?;
    Some(MoodReading {
        mood,
        should_alert: mood.is_negative() && mood != acknowledged,
    })
}

/// Mood inference is costlier than pose inference, so it is sampled at
/// most once per `interval`.
pub fn mood_sample_due(last_sample_at: Option<Instant>, now: Instant, interval: Duration) -> bool {
    last_sample_at
        .map(|at| now.saturating_duration_since(at) > interval)
        .unwrap_or(true)
}
