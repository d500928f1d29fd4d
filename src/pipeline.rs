//! Detection loop controller and session lifecycle
//!
//! One session drives everything: load the model once, then run a strictly
//! sequential capture → preprocess → infer → decode → render cycle, re-armed
//! by a frame-rate-paced [`FramePacer`]. Cycle N+1 is never armed before
//! cycle N's render completed, so at most one input/output tensor pair is
//! alive at a time and the non-reentrant model runtime is never raced.
//!
//! There is no frame queue: the newest available frame is always used and
//! older unconsumed frames are implicitly dropped, so a slow forward pass
//! degrades the detection rate instead of queuing unbounded work.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::detector::InferenceEngine;
use crate::error::{DetectionError, Result};
use crate::model::{ArtifactStore, ModelHandle, ModelLoader};
use crate::overlay::{OverlayRenderer, OverlaySurface};
use crate::postprocessing::DetectionDecoder;
use crate::preprocessing::FramePreprocessor;
use crate::types::{PipelineConfig, RawFrame};

/// Cycles between periodic statistics log lines
const STATS_INTERVAL: u64 = 300;

/// Capture device boundary: hands out the most recent frame, if any
///
/// Non-blocking by contract. Returning `None` (device not producing yet) is
/// a normal no-op cycle, not an error.
pub trait FrameSource: Send + 'static {
    fn try_latest_frame(&mut self) -> Option<RawFrame>;
}

/// Frame-rate pacing capability: resolves when the next cycle should run
///
/// Conceptually "run again on the next display refresh". Hosts with a real
/// presentation surface supply a refresh-driven pacer; [`IntervalPacer`]
/// serves headless and test use.
pub trait FramePacer: Send + 'static {
    fn next_frame(&mut self) -> impl Future<Output = ()> + Send;
}

/// Fixed-interval pacer backed by a tokio interval
///
/// Missed ticks are skipped, matching the no-queue policy of the loop: when
/// a cycle overruns the frame interval the pacer does not replay the missed
/// ticks in a burst.
pub struct IntervalPacer {
    interval: tokio::time::Interval,
}

impl IntervalPacer {
    pub fn new(frame_interval: Duration) -> Self {
        let mut interval = tokio::time::interval(frame_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        Self { interval }
    }

    pub fn from_fps(fps: f32) -> Self {
        Self::new(Duration::from_secs_f32(1.0 / fps.max(1.0)))
    }
}

impl FramePacer for IntervalPacer {
    fn next_frame(&mut self) -> impl Future<Output = ()> + Send {
        async {
            self.interval.tick().await;
        }
    }
}

/// Observable lifecycle state of a detection session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Active,
    /// Terminal: the session ended; a new session requires a new `start()`
    Stopped,
    /// Terminal: the model never loaded; the loop never became active
    Failed(String),
}

/// Handle to a running detection session
///
/// Exactly one exists per session. Dropping it does not stop the session;
/// call [`LoopHandle::stop`].
pub struct LoopHandle {
    alive: Arc<AtomicBool>,
    stop_notify: Arc<Notify>,
    state: watch::Receiver<SessionState>,
    task: JoinHandle<()>,
}

impl LoopHandle {
    /// Request the session to stop
    ///
    /// Safe to call at any state, including mid-cycle. After this returns no
    /// new render call begins: a cycle already past the cancellation check
    /// completes its inference and discards the result instead of rendering.
    /// A loop parked waiting for its next frame is woken immediately; it does
    /// not wait for the pacer to tick again.
    pub fn stop(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            // notify_one stores a permit, so the wakeup is not lost if the
            // loop has not reached its park point yet
            self.stop_notify.notify_one();
            log::info!("detection session stop requested");
        }
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), SessionState::Active)
    }

    /// Wait until the session becomes active
    ///
    /// Returns the load failure if the model never became ready, or
    /// [`DetectionError::Canceled`] if the session was stopped first.
    pub async fn wait_active(&mut self) -> Result<()> {
        loop {
            match &*self.state.borrow_and_update() {
                SessionState::Active => return Ok(()),
                SessionState::Failed(msg) => return Err(DetectionError::model_load(msg.clone())),
                SessionState::Stopped => return Err(DetectionError::Canceled),
                SessionState::Idle | SessionState::Loading => {}
            }
            if self.state.changed().await.is_err() {
                return Err(DetectionError::Canceled);
            }
        }
    }

    /// Wait for the session task to finish (after a stop or load failure)
    pub async fn stopped(self) {
        let _ = self.task.await;
    }
}

/// What one armed cycle did
enum CycleOutcome {
    /// Rendered this many detections
    Rendered(usize),
    /// Capture device had no frame; nothing was invoked
    NoFrame,
    /// Session was stopped mid-cycle; output discarded, loop exits
    Discarded,
}

/// Owns the cooperative detection loop and all pipeline components
///
/// `start()` consumes the controller and moves it onto a session task;
/// per-session state lives behind the returned [`LoopHandle`]. A stopped
/// session is terminal: restarting means building a new controller, which
/// re-acquires the model rather than reusing a released handle.
pub struct DetectionController<S, E, V, P, A>
where
    S: FrameSource,
    E: InferenceEngine,
    V: OverlaySurface,
    P: FramePacer,
    A: ArtifactStore,
{
    config: PipelineConfig,
    loader: ModelLoader<A>,
    source: S,
    engine: E,
    surface: V,
    pacer: P,
}

impl<S, E, V, P, A> DetectionController<S, E, V, P, A>
where
    S: FrameSource,
    E: InferenceEngine,
    V: OverlaySurface,
    P: FramePacer,
    A: ArtifactStore,
{
    pub fn new(config: PipelineConfig, store: A, source: S, engine: E, surface: V, pacer: P) -> Self {
        let loader = ModelLoader::new(store, config.artifact_id.clone(), config.input_shape);
        Self {
            config,
            loader,
            source,
            engine,
            surface,
            pacer,
        }
    }

    /// Start the detection session
    ///
    /// Transitions `Idle → Loading`, acquires the model, then arms the first
    /// cycle. A load failure surfaces through the handle's state as
    /// [`SessionState::Failed`] and the loop never becomes active.
    pub fn start(self) -> LoopHandle {
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let alive = Arc::new(AtomicBool::new(true));
        let stop_notify = Arc::new(Notify::new());

        let task = tokio::spawn(self.run(state_tx, alive.clone(), stop_notify.clone()));

        LoopHandle {
            alive,
            stop_notify,
            state: state_rx,
            task,
        }
    }

    async fn run(
        mut self,
        state: watch::Sender<SessionState>,
        alive: Arc<AtomicBool>,
        stop: Arc<Notify>,
    ) {
        let _ = state.send(SessionState::Loading);

        let handle = match self.loader.load().await {
            Ok(handle) => handle,
            Err(e) => {
                let _ = state.send(SessionState::Failed(e.to_string()));
                return;
            }
        };

        // Teardown raced the load: abandon the session before the first
        // cycle, releasing the freshly loaded handle
        if !alive.load(Ordering::SeqCst) {
            log::info!("session stopped before model became ready");
            let _ = state.send(SessionState::Stopped);
            return;
        }

        let preprocessor = FramePreprocessor::new(handle.input_shape());
        let decoder = DetectionDecoder::new(
            self.config.confidence_threshold,
            self.config.iou_threshold,
            self.config.max_detections,
        );
        let renderer = OverlayRenderer::new();

        let _ = state.send(SessionState::Active);
        log::info!("detection session active (engine: {})", self.engine.name());

        let mut cycles: u64 = 0;
        let mut rendered: u64 = 0;
        let mut no_frame: u64 = 0;
        let mut failed: u64 = 0;

        loop {
            // A stop() must wake the loop even while it is parked here; a
            // stalled pacer never delays the shutdown
            tokio::select! {
                _ = self.pacer.next_frame() => {}
                _ = stop.notified() => {}
            }
            if !alive.load(Ordering::SeqCst) {
                break;
            }
            cycles += 1;

            // Every per-cycle failure is caught here; nothing may stop the
            // loop from re-arming except an explicit stop()
            match self.cycle(&handle, &preprocessor, &decoder, &renderer, &alive) {
                Ok(CycleOutcome::Rendered(count)) => {
                    rendered += 1;
                    log::debug!("cycle {cycles}: rendered {count} detections");
                }
                Ok(CycleOutcome::NoFrame) => no_frame += 1,
                Ok(CycleOutcome::Discarded) => break,
                Err(DetectionError::ShapeMismatch { expected, actual }) => {
                    failed += 1;
                    log::debug!(
                        "cycle {cycles}: skipping frame, shape {actual:?} vs expected {expected:?}"
                    );
                }
                Err(e) => {
                    failed += 1;
                    log::warn!("cycle {cycles}: {e}");
                }
            }

            if cycles % STATS_INTERVAL == 0 {
                log::info!(
                    "pipeline stats: {rendered} rendered, {no_frame} idle, {failed} failed of {cycles} cycles"
                );
            }
        }

        let _ = state.send(SessionState::Stopped);
        log::info!("detection session stopped after {cycles} cycles");
        // ModelHandle and its runtime resources are released here
    }

    /// One capture → preprocess → infer → decode → render cycle
    fn cycle(
        &mut self,
        handle: &ModelHandle,
        preprocessor: &FramePreprocessor,
        decoder: &DetectionDecoder,
        renderer: &OverlayRenderer,
        alive: &AtomicBool,
    ) -> Result<CycleOutcome> {
        let Some(frame) = self.source.try_latest_frame() else {
            return Ok(CycleOutcome::NoFrame);
        };

        let input = preprocessor.preprocess(&frame)?;
        let output = self.engine.run(handle, &input)?;
        // The input tensor must not outlive its inference call
        drop(input);

        let detections = decoder.decode(&output)?;

        // Liveness check: results computed after a stop() are discarded, so
        // nothing renders onto a torn-down surface
        if !alive.load(Ordering::SeqCst) {
            return Ok(CycleOutcome::Discarded);
        }

        let count = detections.len();
        renderer.render(&detections, &mut self.surface)?;
        Ok(CycleOutcome::Rendered(count))
    }
}
