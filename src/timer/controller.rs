use std::{sync::Arc, time::Duration};

use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    events::{EventBus, TimerEvent, TimerEventKind},
    presence::policy::{apply_presence, PresenceTransition},
};

use super::state::{
    format_remaining, session_seconds, PauseChange, SessionTimer, TickOutcome, TimerStatus,
};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const REASON_STARTED: &str = "session started";
const REASON_PAUSED_BY_USER: &str = "paused by user";
const REASON_PAUSED: &str = "paused";
const REASON_RESUMED_BY_USER: &str = "resumed by user";
const REASON_RESUMED: &str = "resumed";
const REASON_HEARTBEAT: &str = "tick";
const REASON_COMPLETED: &str = "session completed";
const REASON_STOPPED: &str = "session stopped";

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub display: String,
    pub timer: SessionTimer,
}

impl TimerSnapshot {
    fn of(timer: &SessionTimer) -> Self {
        Self {
            status: timer.status(),
            display: format_remaining(timer.remaining_seconds),
            timer: timer.clone(),
        }
    }
}

/// Owns the session timer. The one-second ticker, the user controls and the
/// presence loop all mutate it through the same lock.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<SessionTimer>>,
    events: EventBus,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl TimerController {
    pub fn new(events: EventBus, heartbeat_every_ticks: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionTimer::new())),
            events,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
            heartbeat_every_ticks: heartbeat_every_ticks.max(1),
        }
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        TimerSnapshot::of(&*self.state.lock().await)
    }

    /// Starts a fresh session, replacing any running one. Returns `None`
    /// without touching state when `minutes` is not a usable duration.
    pub async fn start_timer(&self, minutes: f64) -> Option<TimerSnapshot> {
        let Some(total_seconds) = session_seconds(minutes) else {
            log_warn!("ignoring start request with invalid duration {minutes}");
            return None;
        };

        self.cancel_ticker().await;

        let (event, snapshot) = {
            let mut state = self.state.lock().await;
            state.begin_session(Uuid::new_v4().to_string(), total_seconds, Utc::now());
            (
                timer_event(&state, TimerEventKind::Started, REASON_STARTED),
                TimerSnapshot::of(&state),
            )
        };

        self.spawn_ticker().await;

        log_info!(
            "session {} started for {}s",
            snapshot.timer.session_id.as_deref().unwrap_or("-"),
            total_seconds
        );
        self.events.emit(event);
        Some(snapshot)
    }

    /// Flips between running and paused. A manual toggle always wins; an
    /// automatic one cannot resume a pause the user set.
    pub async fn toggle_pause(&self, manual: bool) -> Option<TimerSnapshot> {
        let (event, snapshot) = {
            let mut state = self.state.lock().await;
            let (kind, reason) = match state.toggle_pause(manual) {
                PauseChange::Paused { manual: true } => {
                    (TimerEventKind::Paused, REASON_PAUSED_BY_USER)
                }
                PauseChange::Paused { manual: false } => (TimerEventKind::Paused, REASON_PAUSED),
                PauseChange::Resumed { manual: true } => {
                    (TimerEventKind::Resumed, REASON_RESUMED_BY_USER)
                }
                PauseChange::Resumed { manual: false } => {
                    (TimerEventKind::Resumed, REASON_RESUMED)
                }
                PauseChange::Unchanged => return None,
            };
            (timer_event(&state, kind, reason), TimerSnapshot::of(&state))
        };

        self.events.emit(event);
        Some(snapshot)
    }

    pub async fn stop_timer(&self) -> Option<TimerSnapshot> {
        let (event, snapshot) = {
            let mut state = self.state.lock().await;
            if !state.stop() {
                return None;
            }
            (
                timer_event(&state, TimerEventKind::Stopped, REASON_STOPPED),
                TimerSnapshot::of(&state),
            )
        };

        self.cancel_ticker().await;
        log_info!("session stopped with {}s left", snapshot.timer.remaining_seconds);
        self.events.emit(event);
        Some(snapshot)
    }

    /// Back to `Idle`. An active session is stopped (and announced) first.
    pub async fn reset_timer(&self) {
        self.stop_timer().await;
        self.state.lock().await.reset();
    }

    /// Applies one analysis cycle's presence verdict under the timer lock.
    pub async fn apply_presence(&self, present: bool) -> Option<PresenceTransition> {
        let (transition, event) = {
            let mut state = self.state.lock().await;
            let transition = apply_presence(&mut state, present)?;
            let event = timer_event(&state, transition.event_kind(), transition.reason());
            (transition, event)
        };

        log_info!("presence {:?}", transition);
        self.events.emit(event);
        Some(transition)
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let events = self.events.clone();
        let tick_interval = self.tick_interval;
        let heartbeat_every = self.heartbeat_every_ticks;
        let first_tick = Instant::now() + tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(first_tick, tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks: u32 = 0;

            loop {
                interval.tick().await;

                let (outcome, snapshot) = {
                    let mut guard = state.lock().await;
                    if !guard.active {
                        break;
                    }
                    let outcome = guard.tick();
                    (outcome, guard.clone())
                };

                match outcome {
                    TickOutcome::Completed => {
                        log_info!("session completed");
                        events.emit(timer_event(
                            &snapshot,
                            TimerEventKind::Completed,
                            REASON_COMPLETED,
                        ));
                        break;
                    }
                    TickOutcome::Counted { .. } => {
                        ticks = ticks.wrapping_add(1);
                        if ticks % heartbeat_every == 0 {
                            events.emit(timer_event(
                                &snapshot,
                                TimerEventKind::Heartbeat,
                                REASON_HEARTBEAT,
                            ));
                        }
                    }
                    TickOutcome::Skipped => {}
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}

fn timer_event(timer: &SessionTimer, kind: TimerEventKind, reason: &str) -> TimerEvent {
    TimerEvent {
        event: kind,
        reason: reason.to_string(),
        remaining_seconds: timer.remaining_seconds,
        total_seconds: timer.total_seconds,
        session_id: timer.session_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{drain, AppEvent};

    fn timer_kinds(events: &[AppEvent]) -> Vec<TimerEventKind> {
        events
            .iter()
            .filter_map(|event| match event {
                AppEvent::Timer(timer) => Some(timer.event),
                _ => None,
            })
            .collect()
    }

    fn count(kinds: &[TimerEventKind], kind: TimerEventKind) -> usize {
        kinds.iter().filter(|k| **k == kind).count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_minute_session_completes_once() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let timer = TimerController::new(bus, 10);

        let snapshot = timer.start_timer(1.0).await.unwrap();
        assert_eq!(snapshot.timer.remaining_seconds, 60);
        assert_eq!(snapshot.display, "01:00");

        time::sleep(Duration::from_secs(90)).await;

        let kinds = timer_kinds(&drain(&mut rx));
        assert_eq!(kinds.first(), Some(&TimerEventKind::Started));
        assert_eq!(count(&kinds, TimerEventKind::Completed), 1);
        assert_eq!(count(&kinds, TimerEventKind::Heartbeat), 5);

        let snapshot = timer.get_snapshot().await;
        assert_eq!(snapshot.status, TimerStatus::Completed);
        assert_eq!(snapshot.timer.remaining_seconds, 0);
        assert!(!snapshot.timer.active);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_start_is_silent_noop() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let timer = TimerController::new(bus, 10);

        assert!(timer.start_timer(0.0).await.is_none());
        assert!(timer.start_timer(-3.0).await.is_none());
        assert!(timer.start_timer(f64::NAN).await.is_none());

        assert!(drain(&mut rx).is_empty());
        assert_eq!(timer.get_snapshot().await.status, TimerStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_pause_freezes_countdown() {
        let timer = TimerController::new(EventBus::default(), 10);
        timer.start_timer(1.0).await.unwrap();

        time::sleep(Duration::from_millis(10_500)).await;
        assert_eq!(timer.get_snapshot().await.timer.remaining_seconds, 50);

        let paused = timer.toggle_pause(true).await.unwrap();
        assert_eq!(paused.status, TimerStatus::Paused);
        assert!(paused.timer.paused_by_user);

        time::sleep(Duration::from_secs(20)).await;
        assert_eq!(timer.get_snapshot().await.timer.remaining_seconds, 50);

        let resumed = timer.toggle_pause(true).await.unwrap();
        assert_eq!(resumed.status, TimerStatus::Running);

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(timer.get_snapshot().await.timer.remaining_seconds, 45);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_ticking() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let timer = TimerController::new(bus, 10);
        timer.start_timer(1.0).await.unwrap();

        time::sleep(Duration::from_millis(3_500)).await;
        let stopped = timer.stop_timer().await.unwrap();
        assert_eq!(stopped.status, TimerStatus::Stopped);
        assert_eq!(stopped.timer.remaining_seconds, 57);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(timer.get_snapshot().await.timer.remaining_seconds, 57);
        assert!(timer.stop_timer().await.is_none());

        let kinds = timer_kinds(&drain(&mut rx));
        assert_eq!(kinds, vec![TimerEventKind::Started, TimerEventKind::Stopped]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_running_session() {
        let timer = TimerController::new(EventBus::default(), 10);
        let first = timer.start_timer(1.0).await.unwrap();

        time::sleep(Duration::from_millis(5_500)).await;
        let second = timer.start_timer(2.0).await.unwrap();
        assert_ne!(first.timer.session_id, second.timer.session_id);
        assert_eq!(second.timer.remaining_seconds, 120);

        time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(timer.get_snapshot().await.timer.remaining_seconds, 119);
        time::sleep(Duration::from_secs(58)).await;
        assert_eq!(timer.get_snapshot().await.status, TimerStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_presence_never_resumes_manual_pause() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let timer = TimerController::new(bus, 10);
        timer.start_timer(5.0).await.unwrap();
        timer.toggle_pause(true).await.unwrap();

        for _ in 0..10 {
            assert_eq!(timer.apply_presence(true).await, None);
        }
        assert_eq!(timer.apply_presence(false).await, None);
        for _ in 0..10 {
            assert_eq!(timer.apply_presence(true).await, None);
        }

        let snapshot = timer.get_snapshot().await;
        assert!(snapshot.timer.paused);
        let kinds = timer_kinds(&drain(&mut rx));
        assert_eq!(count(&kinds, TimerEventKind::Resumed), 0);

        timer.toggle_pause(true).await.unwrap();
        assert!(!timer.get_snapshot().await.timer.paused);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_returns_to_idle() {
        let timer = TimerController::new(EventBus::default(), 10);
        timer.start_timer(1.0).await.unwrap();
        timer.reset_timer().await;
        assert_eq!(timer.get_snapshot().await.status, TimerStatus::Idle);
    }
}
