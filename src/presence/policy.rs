//! Auto-pause/auto-resume policy for an active session.
//!
//! A manual pause is sticky: presence changes are ignored until the user
//! resumes explicitly.

use crate::{events::TimerEventKind, timer::SessionTimer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceTransition {
    /// Nobody in frame while running.
    AutoPaused,
    /// Back in frame after an automatic pause.
    AutoResumed,
}

impl PresenceTransition {
    pub fn event_kind(self) -> TimerEventKind {
        match self {
            PresenceTransition::AutoPaused => TimerEventKind::Paused,
            PresenceTransition::AutoResumed => TimerEventKind::Resumed,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            PresenceTransition::AutoPaused => "user missing",
            PresenceTransition::AutoResumed => "user detected",
        }
    }
}

pub fn apply_presence(timer: &mut SessionTimer, present: bool) -> Option<PresenceTransition> {
    if !timer.active {
        return None;
    }

    if !present {
        if !timer.paused && timer.pause(false) {
            return Some(PresenceTransition::AutoPaused);
        }
        return None;
    }

    if timer.paused && !timer.paused_by_user && timer.resume(false) {
        return Some(PresenceTransition::AutoResumed);
    }
    None
}
