use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    events::{EventBus, Notification, NotificationKind},
    settings::AnalysisSettings,
    timer::TimerController,
};

use super::{
    detector::{FrameSource, PresenceDetector},
    loop_worker::{analysis_loop, ControllerState},
};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Starts and stops the analysis loop on camera enable/disable. Both
/// commands are idempotent.
///
/// If the loop task panics, the frame source it owned is lost and the
/// camera cannot be enabled again for the life of the controller.
pub struct CameraController<F, D>
where
    F: FrameSource,
    D: PresenceDetector,
{
    /// Parked here while the camera is off; owned by the loop while on.
    source: Option<F>,
    /// Same lending scheme as `source`.
    state: Option<ControllerState>,
    detector: Arc<D>,
    timer: TimerController,
    events: EventBus,
    settings: AnalysisSettings,
    handle: Option<JoinHandle<(F, ControllerState)>>,
    cancel_token: Option<CancellationToken>,
}

impl<F, D> CameraController<F, D>
where
    F: FrameSource,
    D: PresenceDetector,
{
    pub fn new(
        source: F,
        detector: D,
        timer: TimerController,
        events: EventBus,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            source: Some(source),
            state: Some(ControllerState::default()),
            detector: Arc::new(detector),
            timer,
            events,
            settings,
            handle: None,
            cancel_token: None,
        }
    }

    /// False once the loop has died, even before `disable_camera` reaps it.
    pub fn is_enabled(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Opens the frame source and spawns the analysis loop. Returns
    /// `Ok(false)` when the camera is already on. If the source cannot be
    /// opened the failure is announced and the loop never starts.
    pub async fn enable_camera(&mut self) -> Result<bool> {
        if self.is_enabled() {
            return Ok(false);
        }
        if self.handle.is_some() {
            self.cancel_token.take();
            self.join_loop().await?;
        }

        let Some(mut source) = self.source.take() else {
            bail!("frame source unavailable");
        };

        if let Err(err) = source.open() {
            source.release();
            self.source = Some(source);
            log_error!("camera failed to open: {err:#}");
            self.events.emit(
                Notification::new(NotificationKind::CameraError, "Camera access denied.")
                    .spoken("I could not access the camera."),
            );
            return Err(err.context("failed to open camera"));
        }

        self.events.emit(
            Notification::new(NotificationKind::CameraOn, "System: Camera Online")
                .spoken("Camera is on. I am analyzing your posture."),
        );

        let state = self.state.take().unwrap_or_default();
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(analysis_loop(
            source,
            self.detector.clone(),
            self.timer.clone(),
            self.events.clone(),
            self.settings.clone(),
            state,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        log_info!("camera enabled");
        Ok(true)
    }

    /// Stops scheduling cycles immediately, waits for the loop to hand the
    /// frame source back, and releases it. Returns `Ok(false)` when the
    /// camera is already off.
    pub async fn disable_camera(&mut self) -> Result<bool> {
        if self.handle.is_none() {
            return Ok(false);
        }

        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        let joined = self.join_loop().await;

        self.events.emit(
            Notification::new(NotificationKind::CameraOff, "System: Camera Offline")
                .spoken("Camera disabled."),
        );

        joined?;
        log_info!("camera disabled");
        Ok(true)
    }

    /// Waits for the loop and takes back what it borrowed.
    async fn join_loop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        match handle.await {
            Ok((mut source, state)) => {
                source.release();
                self.source = Some(source);
                self.state = Some(state);
                Ok(())
            }
            Err(err) => {
                log_error!("analysis loop died, frame source lost: {err}");
                Err(anyhow!(err)).context("analysis loop task failed to join")
            }
        }
    }
}
