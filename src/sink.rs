//! Console sink: every event goes to stdout as one JSON line, and the
//! spoken line (if any) is voiced while voice is enabled.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    events::{AppEvent, TimerEventKind},
    settings::SettingsStore,
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

const REASON_RESUMED_BY_USER: &str = "resumed by user";

/// The line read aloud for `event`, if it has one.
pub fn speech_for(event: &AppEvent) -> Option<String> {
    match event {
        AppEvent::Notification(notification) => notification.speech.clone(),
        AppEvent::Timer(timer) => match timer.event {
            TimerEventKind::Started => Some(format!(
                "Workstation started for {} minutes.",
                spoken_minutes(timer.total_seconds)
            )),
            TimerEventKind::Completed => Some("Great work! Time for a break.".to_string()),
            TimerEventKind::Stopped => Some("Session cancelled.".to_string()),
            TimerEventKind::Resumed if timer.reason == REASON_RESUMED_BY_USER => {
                Some("Resuming session.".to_string())
            }
            TimerEventKind::Resumed => Some("Welcome back. Resuming timer.".to_string()),
            TimerEventKind::Paused | TimerEventKind::Heartbeat => None,
        },
    }
}

/// Whole minutes as-is, otherwise at most two decimals.
fn spoken_minutes(seconds: u32) -> String {
    let minutes = format!("{:.2}", seconds as f64 / 60.0);
    minutes.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Drains `rx` until the bus closes.
pub async fn run_console_sink(mut rx: broadcast::Receiver<AppEvent>, settings: Arc<SettingsStore>) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                log_warn!("console sink fell behind, {skipped} events dropped");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        match serde_json::to_string(&event) {
            Ok(line) => println!("{line}"),
            Err(err) => log_error!("failed to serialize event: {err}"),
        }

        if settings.voice_enabled() {
            if let Some(speech) = speech_for(&event) {
                speak(&speech);
            }
        }
    }
}

fn speak(line: &str) {
    log_info!("speak: {line}");
}
