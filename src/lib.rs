mod commands;
mod events;
mod presence;
mod settings;
mod sink;
mod timer;
mod utils;

use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::Mutex,
};

use commands::Outcome;
use events::EventBus;
use presence::{CameraController, SimulatedCamera, SimulatedDetector, SimulatedScene};
use settings::SettingsStore;
use timer::TimerController;

pub use events::{AppEvent, Notification, NotificationKind, TimerEvent, TimerEventKind};

const DETECTOR_LATENCY: Duration = Duration::from_millis(12);

pub(crate) struct AppState {
    pub(crate) timer: TimerController,
    pub(crate) camera: Mutex<CameraController<SimulatedCamera, SimulatedDetector>>,
    pub(crate) scene: SimulatedScene,
    pub(crate) settings: Arc<SettingsStore>,
    pub(crate) events: EventBus,
}

impl AppState {
    /// Wires the timer and the camera controller to a simulated camera.
    pub(crate) fn simulated(settings: SettingsStore) -> Self {
        let current = settings.settings();
        let events = EventBus::default();
        let timer = TimerController::new(events.clone(), current.heartbeat_every_ticks);
        let scene = SimulatedScene::new();
        let camera = CameraController::new(
            SimulatedCamera::new(scene.clone()),
            SimulatedDetector::new(scene.clone(), DETECTOR_LATENCY),
            timer.clone(),
            events.clone(),
            current.analysis(),
        );

        Self {
            timer,
            camera: Mutex::new(camera),
            scene,
            settings: Arc::new(settings),
            events,
        }
    }

    async fn shutdown(&self) {
        if let Err(err) = self.camera.lock().await.disable_camera().await {
            log::warn!("camera did not shut down cleanly: {err:#}");
        }
        self.timer.reset_timer().await;
    }
}

/// Runs the console front end until `quit`, end of input or Ctrl-C.
pub async fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Neura Focus starting up...");

    let settings = SettingsStore::from_env()?;
    log::info!("Settings loaded from {}", settings.path().display());
    let state = AppState::simulated(settings);

    let sink = tokio::spawn(sink::run_console_sink(
        state.events.subscribe(),
        state.settings.clone(),
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let command = match commands::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{err}");
                continue;
            }
        };

        match commands::execute(&state, command).await {
            Ok(Outcome::Reply(reply)) => eprintln!("{reply}"),
            Ok(Outcome::Quit) => break,
            Err(err) => eprintln!("error: {err:#}"),
        }
    }

    state.shutdown().await;
    // Closes the bus once the last sender goes, letting the sink drain.
    drop(state);
    if let Err(err) = sink.await {
        log::warn!("console sink ended abnormally: {err}");
    }

    log::info!("Neura Focus stopped");
    Ok(())
}
