use std::sync::Arc;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::{
    events::{EventBus, Notification, NotificationKind},
    settings::AnalysisSettings,
    timer::TimerController,
};

use super::{
    detector::{FrameSource, PresenceDetector},
    mood::{evaluate_mood, mood_sample_due},
    posture::{PostureEvaluator, PostureVerdict},
    types::{Mood, MoodSample, PoseSample},
};

// Per-cycle failures at display rate get noisy; flip off when not debugging.
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// Alert bookkeeping owned by the camera controller. It is lent to each
/// loop and handed back on shutdown, so cooldowns and the current mood
/// carry across camera toggles.
#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    pub last_posture_alert_at: Option<Instant>,
    pub last_mood_sample_at: Option<Instant>,
    pub current_mood: Mood,
    pub present_last_cycle: bool,
    pub posture_verdict: Option<PostureVerdict>,
}

/// What one cycle saw, before any of it touches state.
#[derive(Debug)]
struct Observation {
    at: Instant,
    pose: PoseSample,
    mood: MoodCheck,
}

#[derive(Debug)]
enum MoodCheck {
    Skipped,
    Sampled(Option<MoodSample>),
}

/// Runs analysis cycles until `cancel_token` fires, then hands the frame
/// source and the alert state back to the caller.
///
/// Cycles are strictly sequential: the next cadence tick is not awaited
/// until the current detector call has resolved and its result is applied.
/// A result that resolves after cancellation is dropped unapplied.
pub(crate) async fn analysis_loop<F, D>(
    mut source: F,
    detector: Arc<D>,
    timer: TimerController,
    events: EventBus,
    settings: AnalysisSettings,
    mut state: ControllerState,
    cancel_token: CancellationToken,
) -> (F, ControllerState)
where
    F: FrameSource,
    D: PresenceDetector,
{
    let ai_ready = tokio::select! {
        biased;
        _ = cancel_token.cancelled() => return (source, state),
        result = detector.warm_up() => match result {
            Ok(()) => {
                events.emit(Notification::new(NotificationKind::AiStatus, "Active"));
                true
            }
            Err(err) => {
                log_error!("detector warm-up failed, running degraded: {err:#}");
                events.emit(Notification::new(NotificationKind::AiStatus, "AI Failed"));
                false
            }
        }
    };

    let posture = PostureEvaluator::from_settings(&settings);
    let mut cadence = time::interval(settings.frame_interval);
    cadence.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycles: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = cadence.tick() => {}
        }

        let observation = tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_debug!("discarding in-flight analysis cycle");
                break;
            }
            observation = observe(&mut source, detector.as_ref(), ai_ready, &state, &settings) => observation,
        };

        if cancel_token.is_cancelled() {
            break;
        }

        apply_observation(observation, &mut state, &posture, &timer, &events, &settings).await;
        cycles += 1;
    }

    log_info!("analysis loop shutting down after {cycles} cycles");
    (source, state)
}

async fn observe<F, D>(
    source: &mut F,
    detector: &D,
    ai_ready: bool,
    state: &ControllerState,
    settings: &AnalysisSettings,
) -> Observation
where
    F: FrameSource,
    D: PresenceDetector,
{
    let at = Instant::now();
    let nothing = |at| Observation {
        at,
        pose: PoseSample::empty(),
        mood: MoodCheck::Skipped,
    };

    if !ai_ready {
        return nothing(at);
    }

    let frame = match source.grab() {
        Ok(frame) => frame,
        Err(err) => {
            log_warn!("frame grab failed: {err:#}");
            return nothing(at);
        }
    };

    let at = frame.captured_at;
    let pose = match detector.detect(&frame).await {
        Ok(pose) => pose,
        Err(err) => {
            log_warn!("pose detection failed on frame {}: {err:#}", frame.sequence);
            PoseSample::empty()
        }
    };

    let mood = if mood_sample_due(state.last_mood_sample_at, at, settings.mood_sample_interval) {
        match detector.detect_mood(&frame).await {
            Ok(sample) => MoodCheck::Sampled(sample),
            Err(err) => {
                log_warn!("mood detection failed on frame {}: {err:#}", frame.sequence);
                MoodCheck::Sampled(None)
            }
        }
    } else {
        MoodCheck::Skipped
    };

    Observation { at, pose, mood }
}

async fn apply_observation(
    observation: Observation,
    state: &mut ControllerState,
    posture: &PostureEvaluator,
    timer: &TimerController,
    events: &EventBus,
    settings: &AnalysisSettings,
) {
    let present = observation.pose.is_present(settings.presence_threshold);
    if present != state.present_last_cycle {
        log_debug!("subject {}", if present { "in frame" } else { "left frame" });
    }
    state.present_last_cycle = present;

    timer.apply_presence(present).await;

    if present {
        let reading = posture.evaluate(&observation.pose, state.last_posture_alert_at, observation.at);
        if reading.verdict != PostureVerdict::Unknown
            && state.posture_verdict != Some(reading.verdict)
        {
            state.posture_verdict = Some(reading.verdict);
            let label = match reading.verdict {
                PostureVerdict::Bad => "Sit Straight",
                _ => "Good",
            };
            events.emit(Notification::new(NotificationKind::PostureStatus, label));
        }
        if reading.should_alert {
            state.last_posture_alert_at = Some(observation.at);
            log_info!("posture alert, shoulder tilt {:?}px", reading.tilt_px);
            events.emit(
                Notification::new(NotificationKind::PostureAlert, "Posture Alert: sit straight")
                    .spoken("Please adjust your posture."),
            );
        }
    }

    if let MoodCheck::Sampled(sample) = observation.mood {
        state.last_mood_sample_at = Some(observation.at);
        let reading = sample
            .as_ref()
            .and_then(|sample| evaluate_mood(sample, state.current_mood));
        if let Some(reading) = reading {
            if reading.should_alert {
                log_info!("mood alert: {}", reading.mood);
                events.emit(
                    Notification::new(NotificationKind::MoodAlert, format!("Mood: {}", reading.mood))
                        .spoken(format!("You look {}. Take a deep breath.", reading.mood)),
                );
            }
            state.current_mood = reading.mood;
        }
    }
}
