//! Line commands from the console, forwarded to the timer, the camera and
//! the simulated scene.

use anyhow::{anyhow, bail, Result};

use crate::{presence::Mood, timer::TimerSnapshot, AppState};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `None` uses the configured default length.
    Start(Option<f64>),
    TogglePause,
    Stop,
    Status,
    Camera(bool),
    /// `false` makes the simulated camera refuse to open.
    CameraAccess(bool),
    /// `false` makes the simulated detector fail its warm-up.
    Models(bool),
    Voice(bool),
    Away,
    Back,
    Slouch,
    Straight,
    Mood(Mood),
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Reply(String),
    Quit,
}

pub const HELP: &str = "\
commands:
  start [minutes]   start a work session (default from settings)
  pause             pause or resume the session
  stop              cancel the session
  status            show the timer
  camera on|off     enable or disable presence monitoring
  camera deny|allow revoke or grant simulated camera access
  models break|fix  make the simulated detector fail or pass warm-up
  voice on|off      toggle spoken notifications
  away | back       step out of / into the simulated frame
  slouch | straight tilt or level the simulated shoulders
  mood <label>      set the simulated expression
  quit";

/// `Ok(None)` for blank lines.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match head.to_ascii_lowercase().as_str() {
        // Unparseable minutes still go through `start_timer`, which rejects them.
        "start" => Command::Start(arg.map(|m| m.parse().unwrap_or(f64::NAN))),
        "pause" | "resume" => Command::TogglePause,
        "stop" => Command::Stop,
        "status" => Command::Status,
        "camera" => match arg.map(str::to_ascii_lowercase).as_deref() {
            Some("deny") => Command::CameraAccess(false),
            Some("allow") => Command::CameraAccess(true),
            _ => Command::Camera(on_off(arg)?),
        },
        "models" => match arg.map(str::to_ascii_lowercase).as_deref() {
            Some("break") => Command::Models(false),
            Some("fix") => Command::Models(true),
            _ => bail!("expected 'break' or 'fix'"),
        },
        "voice" => Command::Voice(on_off(arg)?),
        "away" => Command::Away,
        "back" => Command::Back,
        "slouch" => Command::Slouch,
        "straight" => Command::Straight,
        "mood" => Command::Mood(arg.ok_or_else(|| anyhow!("mood needs a label"))?.parse()?),
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command '{other}', try 'help'"),
    };
    Ok(Some(command))
}

fn on_off(arg: Option<&str>) -> Result<bool> {
    match arg.map(|a| a.to_ascii_lowercase()).as_deref() {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => bail!("expected 'on' or 'off'"),
    }
}

pub async fn execute(state: &AppState, command: Command) -> Result<Outcome> {
    let reply = match command {
        Command::Start(minutes) => {
            let minutes = minutes.unwrap_or_else(|| state.settings.settings().default_session_minutes);
            match state.timer.start_timer(minutes).await {
                Some(snapshot) => describe(&snapshot),
                None => "ignored: minutes must be a positive number".to_string(),
            }
        }
        Command::TogglePause => match state.timer.toggle_pause(true).await {
            Some(snapshot) => describe(&snapshot),
            None => "no active session".to_string(),
        },
        Command::Stop => match state.timer.stop_timer().await {
            Some(snapshot) => describe(&snapshot),
            None => "no active session".to_string(),
        },
        Command::Status => {
            let snapshot = state.timer.get_snapshot().await;
            let camera = if state.camera.lock().await.is_enabled() { "on" } else { "off" };
            format!("{} | camera {camera}", describe(&snapshot))
        }
        Command::Camera(true) => {
            if state.camera.lock().await.enable_camera().await? {
                "camera on".to_string()
            } else {
                "camera already on".to_string()
            }
        }
        Command::Camera(false) => {
            if state.camera.lock().await.disable_camera().await? {
                "camera off".to_string()
            } else {
                "camera already off".to_string()
            }
        }
        Command::CameraAccess(allowed) => {
            state.scene.deny_camera(!allowed);
            format!("camera access {}", if allowed { "allowed" } else { "denied" })
        }
        Command::Models(working) => {
            state.scene.break_models(!working);
            format!("models {}", if working { "fixed" } else { "broken" })
        }
        Command::Voice(enabled) => {
            state.settings.set_voice_enabled(enabled);
            format!("voice {}", if enabled { "on" } else { "off" })
        }
        Command::Away => {
            state.scene.set_present(false);
            "you stepped away".to_string()
        }
        Command::Back => {
            state.scene.set_present(true);
            "you are back".to_string()
        }
        Command::Slouch => {
            state.scene.set_slouching(true);
            "slouching".to_string()
        }
        Command::Straight => {
            state.scene.set_slouching(false);
            "sitting straight".to_string()
        }
        Command::Mood(mood) => {
            state.scene.set_mood(mood);
            format!("looking {mood}")
        }
        Command::Help => HELP.to_string(),
        Command::Quit => return Ok(Outcome::Quit),
    };
    Ok(Outcome::Reply(reply))
}

fn describe(snapshot: &TimerSnapshot) -> String {
    let mut line = format!("{:?} {}", snapshot.status, snapshot.display);
    if snapshot.timer.paused_by_user {
        line.push_str(" (paused by you)");
    }
    line
}
