//! Detector inputs and outputs.

use std::{collections::BTreeMap, fmt, str::FromStr};

use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

pub const NOSE: &str = "nose";
pub const LEFT_SHOULDER: &str = "left_shoulder";
pub const RIGHT_SHOULDER: &str = "right_shoulder";

/// One captured frame as the detector sees it: geometry and timing. The
/// detector owns access to the pixels.
#[derive(Debug, Clone)]
pub struct Frame {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    /// Analysis results are stamped with this instant.
    pub captured_at: Instant,
}

/// A named landmark in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub score: f32,
}

impl Keypoint {
    pub fn new(name: impl Into<String>, x: f32, y: f32, score: f32) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            score,
        }
    }

    pub fn is_reliable(&self, threshold: f32) -> bool {
        self.score > threshold
    }
}

/// Keypoints of the single tracked subject; empty when nobody was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseSample {
    pub keypoints: Vec<Keypoint>,
}

impl PoseSample {
    pub fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn find(&self, name: &str) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.name == name)
    }

    /// The named keypoint, if it was observed above `threshold`.
    pub fn reliable(&self, name: &str, threshold: f32) -> Option<&Keypoint> {
        self.find(name).filter(|kp| kp.is_reliable(threshold))
    }

    /// Presence is anchored on the nose.
    pub fn is_present(&self, threshold: f32) -> bool {
        self.reliable(NOSE, threshold).is_some()
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    #[default]
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Surprised,
    Disgusted,
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Neutral,
        Mood::Happy,
        Mood::Sad,
        Mood::Angry,
        Mood::Fearful,
        Mood::Surprised,
        Mood::Disgusted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Neutral => "neutral",
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Angry => "angry",
            Mood::Fearful => "fearful",
            Mood::Surprised => "surprised",
            Mood::Disgusted => "disgusted",
        }
    }

    /// Moods worth a check-in.
    pub fn is_negative(&self) -> bool {
        matches!(self, Mood::Sad | Mood::Angry | Mood::Fearful)
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == wanted)
            .ok_or_else(|| anyhow!("unknown mood '{s}'"))
    }
}

/// Expression probabilities from one face inference. They need not sum to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoodSample {
    pub probabilities: BTreeMap<Mood, f32>,
}

impl MoodSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, mood: Mood, probability: f32) -> Self {
        self.probabilities.insert(mood, probability);
        self
    }

    /// Argmax label. Ties go to the earlier label in `Mood::ALL`; NaN
    /// probabilities never win.
    pub fn dominant(&self) -> Option<Mood> {
        let mut best: Option<(Mood, f32)> = None;
        for (&mood, &p) in &self.probabilities {
            if p.is_nan() {
                continue;
            }
            match best {
                Some((_, top)) if p <= top => {}
                _ => best = Some((mood, p)),
            }
        }
        best.map(|(mood, _)| mood)
    }
}

impl FromIterator<(Mood, f32)> for MoodSample {
    fn from_iter<I: IntoIterator<Item = (Mood, f32)>>(iter: I) -> Self {
        Self {
            probabilities: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_requires_confident_nose() {
        let threshold = 0.3;
        assert!(!PoseSample::empty().is_present(threshold));

        let no_nose = PoseSample::new(vec![Keypoint::new(LEFT_SHOULDER, 0.0, 0.0, 0.9)]);
        assert!(!no_nose.is_present(threshold));

        let weak = PoseSample::new(vec![Keypoint::new(NOSE, 0.0, 0.0, 0.3)]);
        assert!(!weak.is_present(threshold));

        let strong = PoseSample::new(vec![Keypoint::new(NOSE, 0.0, 0.0, 0.31)]);
        assert!(strong.is_present(threshold));
    }

    #[test]
    fn test_dominant_mood() {
        let sample = MoodSample::new()
            .with(Mood::Neutral, 0.2)
            .with(Mood::Sad, 0.7)
            .with(Mood::Happy, 0.1);
        assert_eq!(sample.dominant(), Some(Mood::Sad));
        assert_eq!(MoodSample::new().dominant(), None);
    }

    #[test]
    fn test_dominant_mood_tie_and_nan() {
        let tie: MoodSample = [(Mood::Angry, 0.5), (Mood::Happy, 0.5)].into_iter().collect();
        assert_eq!(tie.dominant(), Some(Mood::Happy));

        let nan = MoodSample::new().with(Mood::Sad, f32::NAN).with(Mood::Neutral, 0.1);
        assert_eq!(nan.dominant(), Some(Mood::Neutral));
    }

    #[test]
    fn test_mood_parsing() {
        assert_eq!("Fearful".parse::<Mood>().unwrap(), Mood::Fearful);
        assert!("bored".parse::<Mood>().is_err());
        assert!(Mood::Angry.is_negative());
        assert!(!Mood::Surprised.is_negative());
    }
}
