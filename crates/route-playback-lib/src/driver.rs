//! PlaybackDriver - Fixed-cadence timer around a shared sequencer
//!
//! The driver spawns one tokio task per run. The task ticks the sequencer on a
//! `tokio::time::interval` and exits when the run completes, is stopped, or is
//! replaced. Every tick and every control call holds the sequencer lock for its
//! whole duration, so they never interleave.
//!
//! Cancellation is deterministic: `stop` aborts the task and then stops the
//! sequencer under the lock. A tick already waiting for that lock sees that its
//! run generation is gone and returns without touching the map or the voice.

use crate::{
    ManeuverStep, MapView, PlaybackError, PlaybackState, PlaybackStatus, Result, RouteGeometry,
    RoutePlaybackSequencer, SpeechOutput, TickOutcome,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

type SharedSequencer<M, S> = Arc<Mutex<RoutePlaybackSequencer<M, S>>>;

/// Owns the playback timer and publishes progress
pub struct PlaybackDriver<M, S>
where
    M: MapView + Send + 'static,
    S: SpeechOutput + Send + 'static,
{
    sequencer: SharedSequencer<M, S>,
    timer: Option<JoinHandle<()>>,
    status_tx: watch::Sender<PlaybackStatus>,
    tick_interval: Duration,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<M, S> PlaybackDriver<M, S>
where
    M: MapView + Send + 'static,
    S: SpeechOutput + Send + 'static,
{
    /// Wrap an idle sequencer; the tick cadence comes from its config
    pub fn new(sequencer: RoutePlaybackSequencer<M, S>) -> Self {
        let tick_interval = sequencer.config().tick_interval;
        let (status_tx, _) = watch::channel(sequencer.status());
        Self {
            sequencer: Arc::new(Mutex::new(sequencer)),
            timer: None,
            status_tx,
            tick_interval,
        }
    }

    /// Start a playback and schedule its ticks
    ///
    /// Must be called from within a tokio runtime. The first tick fires
    /// immediately after the vehicle marker has been placed.
    pub fn start(
        &mut self,
        geometry: Arc<RouteGeometry>,
        steps: Arc<[ManeuverStep]>,
    ) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| PlaybackError::NoRuntime)?;

        let generation = {
            let mut sequencer = lock_sequencer(&self.sequencer);
            sequencer.start(geometry, steps)?;
            self.status_tx.send_replace(sequencer.status());
            sequencer.run_generation()
        };
        let Some(generation) = generation else {
            return Ok(());
        };

        // A completed or stopped run's task has already exited; aborting is a no-op then.
        self.cancel_timer();
        self.timer = Some(runtime.spawn(run_timer(
            self.sequencer.clone(),
            self.status_tx.clone(),
            generation,
            self.tick_interval,
        )));
        Ok(())
    }

    /// Stop playback; no tick takes effect after this returns
    ///
    /// Idempotent and valid in every state.
    pub fn stop(&mut self) {
        self.cancel_timer();
        let mut sequencer = lock_sequencer(&self.sequencer);
        sequencer.stop();
        self.status_tx.send_replace(sequencer.status());
    }

    pub fn state(&self) -> PlaybackState {
        self.status_tx.borrow().state
    }

    pub fn status(&self) -> PlaybackStatus {
        *self.status_tx.borrow()
    }

    /// Receive a status update after every tick and control call
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status_tx.subscribe()
    }

    /// Wait until the current run leaves `Running`
    ///
    /// Returns `Completed` when the route was exhausted, `Idle` when stopped.
    pub async fn finished(&self) -> PlaybackState {
        let mut rx = self.subscribe();
        match rx
            .wait_for(|status| status.state != PlaybackState::Running)
            .await
        {
            Ok(status) => status.state,
            Err(_) => PlaybackState::Idle,
        }
    }

    /// Run a closure with the sequencer locked (e.g. to reach the map view)
    pub fn with_sequencer<R>(&self, f: impl FnOnce(&mut RoutePlaybackSequencer<M, S>) -> R) -> R {
        f(&mut lock_sequencer(&self.sequencer))
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<M, S> Drop for PlaybackDriver<M, S>
where
    M: MapView + Send + 'static,
    S: SpeechOutput + Send + 'static,
{
    fn drop(&mut self) {
        // Teardown: no timer may outlive the view
        self.stop();
    }
}

fn lock_sequencer<M, S>(
    sequencer: &Mutex<RoutePlaybackSequencer<M, S>>,
) -> MutexGuard<'_, RoutePlaybackSequencer<M, S>> {
    match sequencer.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Sequencer mutex poisoned; recovering");
            poisoned.into_inner()
        }
    }
}

async fn run_timer<M, S>(
    sequencer: SharedSequencer<M, S>,
    status_tx: watch::Sender<PlaybackStatus>,
    generation: u64,
    tick_interval: Duration,
) where
    M: MapView + Send + 'static,
    S: SpeechOutput + Send + 'static,
{
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let mut guard = lock_sequencer(&sequencer);
        if guard.run_generation() != Some(generation) {
            tracing::trace!("Timer for playback #{} superseded", generation);
            return;
        }

        #[cfg(feature = "profiling")]
        profiling::scope!("driver::tick");
        let outcome = guard.tick();
        status_tx.send_replace(guard.status());
        if outcome == TickOutcome::Completed {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::testing::{Effect, EffectLog, RecordingMap, RecordingSpeech};
    use crate::{MarkerId, PlaybackConfig, RoutePoint};

    const TICK: Duration = Duration::from_millis(300);

    fn driver(log: &EffectLog) -> PlaybackDriver<RecordingMap, RecordingSpeech> {
        let config = PlaybackConfig {
            tick_interval: TICK,
            ..PlaybackConfig::default()
        };
        PlaybackDriver::new(RoutePlaybackSequencer::new(
            log.map(),
            log.speech(),
            config,
        ))
    }

    fn route(n: usize) -> (Arc<RouteGeometry>, Arc<[ManeuverStep]>) {
        let geometry =
            RouteGeometry::new((0..n).map(|i| RoutePoint::new(i as f64 * 0.001, 0.0))).unwrap();
        let steps = vec![ManeuverStep::new("Go east", 111.0 * n as f64, [0, n - 1])];
        (Arc::new(geometry), steps.into())
    }

    /// Let spawned tasks run after the paused clock moves
    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_start_without_runtime_fails_cleanly() {
        let log = EffectLog::new();
        let mut driver = driver(&log);
        let (geometry, steps) = route(3);

        assert_eq!(driver.start(geometry, steps), Err(PlaybackError::NoRuntime));
        assert_eq!(driver.state(), PlaybackState::Idle);
        assert!(log.effects().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_to_completion() {
        let log = EffectLog::new();
        let mut driver = driver(&log);
        let (geometry, steps) = route(4);

        driver.start(geometry, steps).unwrap();
        assert_eq!(driver.state(), PlaybackState::Running);
        assert_eq!(driver.finished().await, PlaybackState::Completed);

        assert_eq!(
            log.count(|e| matches!(e, Effect::MoveMarker(MarkerId::VEHICLE, _))),
            4
        );
        assert_eq!(log.spoken(), vec!["Step 1: Go east, at 444 meters"]);
        assert_eq!(driver.status().runs_completed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_cadence() {
        let log = EffectLog::new();
        let mut driver = driver(&log);
        let (geometry, steps) = route(5);
        let moves = |log: &EffectLog| log.count(|e| matches!(e, Effect::MoveMarker(..)));

        driver.start(geometry, steps).unwrap();
        settle().await;
        assert_eq!(moves(&log), 1);

        tokio::time::advance(TICK / 2).await;
        settle().await;
        assert_eq!(moves(&log), 1);

        for expected in 2..=4 {
            tokio::time::advance(TICK / 2).await;
            settle().await;
            assert_eq!(moves(&log), expected);
            tokio::time::advance(TICK / 2).await;
            settle().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_ticks() {
        let log = EffectLog::new();
        let mut driver = driver(&log);
        let (geometry, steps) = route(3);

        driver.start(geometry, steps).unwrap();
        settle().await;
        tokio::time::advance(TICK).await;
        settle().await;
        assert_eq!(driver.status().cursor, Some(2));

        driver.stop();
        let after_stop = log.effects();
        assert_eq!(driver.state(), PlaybackState::Idle);
        assert!(after_stop.contains(&Effect::RemoveMarker(MarkerId::VEHICLE)));
        assert!(after_stop.contains(&Effect::CancelSpeech));

        tokio::time::advance(TICK * 10).await;
        settle().await;
        assert_eq!(log.effects(), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_twice_matches_stop_once() {
        let log = EffectLog::new();
        let mut driver = driver(&log);
        let (geometry, steps) = route(3);
        driver.start(geometry, steps).unwrap();
        settle().await;

        driver.stop();
        let once = driver.status();
        driver.stop();

        assert_eq!(driver.status(), once);
        assert_eq!(log.count(|e| matches!(e, Effect::RemoveMarker(_))), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_reports_stop() {
        let log = EffectLog::new();
        let mut driver = driver(&log);
        let (geometry, steps) = route(10);
        driver.start(geometry, steps).unwrap();
        let mut rx = driver.subscribe();

        driver.stop();

        let status = rx.wait_for(|s| s.state != PlaybackState::Running).await.unwrap();
        assert_eq!(status.state, PlaybackState::Idle);
        assert_eq!(driver.finished().await, PlaybackState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_completion_does_not_leak_timer() {
        let log = EffectLog::new();
        let mut driver = driver(&log);

        let (geometry, steps) = route(2);
        driver.start(geometry, steps).unwrap();
        assert_eq!(driver.finished().await, PlaybackState::Completed);

        let (geometry, steps) = route(3);
        driver.start(geometry, steps).unwrap();
        assert_eq!(driver.status().cursor, Some(0));
        assert_eq!(driver.finished().await, PlaybackState::Completed);

        assert_eq!(driver.status().runs_completed, 2);
        assert_eq!(log.count(|e| matches!(e, Effect::MoveMarker(..))), 5);
        assert_eq!(log.count(|e| matches!(e, Effect::RemoveMarker(_))), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_keeps_current_run() {
        let log = EffectLog::new();
        let mut driver = driver(&log);
        let (geometry, steps) = route(4);
        driver.start(geometry, steps).unwrap();
        settle().await;

        let (geometry, steps) = route(9);
        assert_eq!(
            driver.start(geometry, steps),
            Err(PlaybackError::AlreadyRunning)
        );

        assert_eq!(driver.finished().await, PlaybackState::Completed);
        assert_eq!(log.count(|e| matches!(e, Effect::MoveMarker(..))), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_tears_down_playback() {
        let log = EffectLog::new();
        let mut driver = driver(&log);
        let (geometry, steps) = route(5);
        driver.start(geometry, steps).unwrap();
        settle().await;

        drop(driver);
        let after_drop = log.effects();
        assert!(after_drop.contains(&Effect::RemoveMarker(MarkerId::VEHICLE)));

        tokio::time::advance(TICK * 10).await;
        settle().await;
        assert_eq!(log.effects(), after_drop);
    }
}
