//! Typed events published by the timer and the presence loop.
//!
//! Producers never know who is listening: they push into a broadcast
//! channel and any number of sinks subscribe. A send with no subscribers is
//! not an error.

use serde::Serialize;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TimerEventKind {
    Started,
    Paused,
    Resumed,
    Heartbeat,
    Completed,
    Stopped,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerEvent {
    pub event: TimerEventKind,
    pub reason: String,
    pub remaining_seconds: u32,
    pub total_seconds: u32,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    PostureAlert,
    MoodAlert,
    /// Posture verdict changed between good and bad.
    PostureStatus,
    CameraOn,
    CameraOff,
    CameraError,
    AiStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub event: NotificationKind,
    pub message: String,
    /// Line to read aloud instead of `message`, when voice is on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech: Option<String>,
}

impl Notification {
    pub fn new(event: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            event,
            message: message.into(),
            speech: None,
        }
    }

    pub fn spoken(mut self, speech: impl Into<String>) -> Self {
        self.speech = Some(speech.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "channel", rename_all = "camelCase")]
pub enum AppEvent {
    Timer(TimerEvent),
    Notification(Notification),
}

impl From<TimerEvent> for AppEvent {
    fn from(event: TimerEvent) -> Self {
        AppEvent::Timer(event)
    }
}

impl From<Notification> for AppEvent {
    fn from(notification: Notification) -> Self {
        AppEvent::Notification(notification)
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: impl Into<AppEvent>) {
        let _ = self.tx.send(event.into());
    }
}

/// Everything already queued on `rx`, without waiting.
#[cfg(test)]
pub(crate) fn drain(rx: &mut broadcast::Receiver<AppEvent>) -> Vec<AppEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
