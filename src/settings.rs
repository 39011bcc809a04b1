use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock},
    time::Duration,
};

const SETTINGS_PATH_ENV: &str = "NEURA_SETTINGS";
const DEBUG_ENV: &str = "NEURA_DEBUG";
const DEFAULT_SETTINGS_FILE: &str = "neura-settings.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Keypoints at or below this confidence are treated as not observed.
    pub presence_threshold: f32,
    pub posture_tilt_threshold_px: f32,
    pub posture_alert_cooldown_secs: u64,
    pub mood_sample_interval_secs: u64,
    pub analysis_frame_rate_hz: u32,
    pub heartbeat_every_ticks: u32,
    pub default_session_minutes: f64,
    pub voice_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            presence_threshold: 0.3,
            posture_tilt_threshold_px: 30.0,
            posture_alert_cooldown_secs: 30,
            mood_sample_interval_secs: 2,
            analysis_frame_rate_hz: 60,
            heartbeat_every_ticks: 10,
            default_session_minutes: 25.0,
            voice_enabled: true,
        }
    }
}

/// The subset of settings the analysis loop reads, in loop units.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub presence_threshold: f32,
    pub posture_tilt_threshold_px: f32,
    pub posture_alert_cooldown: Duration,
    pub mood_sample_interval: Duration,
    pub frame_interval: Duration,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Settings::default().analysis()
    }
}

impl Settings {
    pub fn analysis(&self) -> AnalysisSettings {
        let hz = self.analysis_frame_rate_hz.max(1);
        AnalysisSettings {
            presence_threshold: self.presence_threshold,
            posture_tilt_threshold_px: self.posture_tilt_threshold_px,
            posture_alert_cooldown: Duration::from_secs(self.posture_alert_cooldown_secs),
            mood_sample_interval: Duration::from_secs(self.mood_sample_interval_secs),
            frame_interval: Duration::from_micros(1_000_000 / hz as u64),
        }
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<Settings>,
}

impl SettingsStore {
    /// Reads settings from `path`. A missing file yields defaults and a
    /// malformed one falls back to defaults with a warning.
    pub fn load(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("Ignoring malformed settings in {}: {err}", path.display());
                Settings::default()
            })
        } else {
            Settings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// `NEURA_SETTINGS` picks the file; `NEURA_DEBUG` makes the timer
    /// heartbeat fire on every tick.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(SETTINGS_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_FILE));
        let store = Self::load(path)?;

        if debug_mode(std::env::var(DEBUG_ENV).ok().as_deref()) {
            store.write().heartbeat_every_ticks = 1;
        }

        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> Settings {
        self.read().clone()
    }

    pub fn voice_enabled(&self) -> bool {
        self.read().voice_enabled
    }

    /// In-memory only; settings are never written back.
    pub fn set_voice_enabled(&self, enabled: bool) {
        self.write().voice_enabled = enabled;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Settings> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Settings> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn debug_mode(value: Option<&str>) -> bool {
    value
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}
