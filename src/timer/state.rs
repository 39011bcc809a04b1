use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Paused,
    Completed,
    Stopped,
}

/// How the last session left the running states. Both outcomes leave the
/// timer inactive; they differ only in what gets announced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionOutcome {
    Completed,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Inactive, paused, or already at zero.
    Skipped,
    Counted { remaining_seconds: u32 },
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseChange {
    Paused { manual: bool },
    Resumed { manual: bool },
    Unchanged,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimer {
    pub session_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub total_seconds: u32,
    /// Frozen at its last value whenever the timer is inactive.
    pub remaining_seconds: u32,
    pub active: bool,
    pub paused: bool,
    /// Only ever true together with `paused`.
    pub paused_by_user: bool,
    pub outcome: Option<SessionOutcome>,
}

/// Converts a requested duration to whole seconds. Non-finite, zero and
/// negative inputs, and anything that rounds down to no time at all, are
/// rejected.
pub fn session_seconds(minutes: f64) -> Option<u32> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return None;
    }
    let seconds = (minutes * 60.0).round();
    if seconds < 1.0 || seconds > u32::MAX as f64 {
        return None;
    }
    Some(seconds as u32)
}

/// `MM:SS`, minutes not wrapped at the hour.
pub fn format_remaining(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> TimerStatus {
        match (self.active, self.paused, self.outcome) {
            (true, true, _) => TimerStatus::Paused,
            (true, false, _) => TimerStatus::Running,
            (false, _, Some(SessionOutcome::Completed)) => TimerStatus::Completed,
            (false, _, Some(SessionOutcome::Stopped)) => TimerStatus::Stopped,
            (false, _, None) => TimerStatus::Idle,
        }
    }

    pub fn begin_session(
        &mut self,
        session_id: String,
        total_seconds: u32,
        started_at: DateTime<Utc>,
    ) {
        *self = Self {
            session_id: Some(session_id),
            started_at: Some(started_at),
            total_seconds,
            remaining_seconds: total_seconds,
            active: true,
            paused: false,
            paused_by_user: false,
            outcome: None,
        };
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.active || self.paused || self.remaining_seconds == 0 {
            return TickOutcome::Skipped;
        }

        self.remaining_seconds -= 1;
        if self.remaining_seconds == 0 {
            self.finish(SessionOutcome::Completed);
            TickOutcome::Completed
        } else {
            TickOutcome::Counted {
                remaining_seconds: self.remaining_seconds,
            }
        }
    }

    pub fn pause(&mut self, manual: bool) -> bool {
        if !self.active || self.paused {
            return false;
        }
        self.paused = true;
        self.paused_by_user = manual;
        true
    }

    /// Automatic resumes never clear a pause the user set.
    pub fn resume(&mut self, manual: bool) -> bool {
        if !self.active || !self.paused {
            return false;
        }
        if self.paused_by_user && !manual {
            return false;
        }
        self.paused = false;
        self.paused_by_user = false;
        true
    }

    pub fn toggle_pause(&mut self, manual: bool) -> PauseChange {
        if self.paused {
            if self.resume(manual) {
                PauseChange::Resumed { manual }
            } else {
                PauseChange::Unchanged
            }
        } else if self.pause(manual) {
            PauseChange::Paused { manual }
        } else {
            PauseChange::Unchanged
        }
    }

    pub fn stop(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.finish(SessionOutcome::Stopped);
        true
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn finish(&mut self, outcome: SessionOutcome) {
        self.active = false;
        self.paused = false;
        self.paused_by_user = false;
        self.outcome = Some(outcome);
    }
}
