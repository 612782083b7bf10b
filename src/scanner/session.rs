//! Scan sessions.
//!
//! A session owns one camera acquisition and one frame pipeline and moves
//! through a small state machine:
//!
//! ```text
//! Idle ──► AwaitingPermission ──► Active ──► Completed
//!   │              │                │   └──► Cancelled
//!   └──────────────┴────────────────┴──────► Failed / Cancelled
//! ```
//!
//! Terminal states are final. Every path into a terminal state goes through a
//! single compare-and-swap on the state word, so when a detection and a
//! cancel race, exactly one of them wins. Only the winner releases the camera
//! and talks to the caller.

use crate::error::{ScanError, ScanResult};
use crate::scanner::debounce::Debouncer;
use crate::scanner::pipeline::{DetectionHandler, FramePipeline, PipelineConfig, PipelineStats};
use crate::scanner::traits::{
    CameraHandle, CameraProvider, Decoder, DetectionEvent, DetectionFeedback, DetectionResult,
    PermissionGate, ScanOptions, SessionMode,
};
use crate::types::SessionId;
use futures::Stream;
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, info, trace, warn};

/// Lifecycle of a [`ScanSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    AwaitingPermission = 1,
    Active = 2,
    Completed = 3,
    Cancelled = 4,
    Failed = 5,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::AwaitingPermission,
            2 => Self::Active,
            3 => Self::Completed,
            4 => Self::Cancelled,
            _ => Self::Failed,
        }
    }

    /// Whether no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingPermission => write!(f, "awaiting-permission"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Session tuning.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// Repeat-suppression window for continuous sessions.
    pub debounce_window: chrono::Duration,
    pub pipeline: PipelineConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_window: chrono::Duration::milliseconds(Debouncer::DEFAULT_WINDOW_MS),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// The outside world a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub camera: Arc<dyn CameraProvider>,
    pub decoder: Arc<dyn Decoder>,
    pub permissions: Arc<dyn PermissionGate>,
    pub feedback: Arc<dyn DetectionFeedback>,
}

impl Collaborators {
    pub fn new(
        camera: Arc<dyn CameraProvider>,
        decoder: Arc<dyn Decoder>,
        permissions: Arc<dyn PermissionGate>,
        feedback: Arc<dyn DetectionFeedback>,
    ) -> Self {
        Self {
            camera,
            decoder,
            permissions,
            feedback,
        }
    }
}

enum Delivery {
    Once(oneshot::Sender<ScanResult<DetectionResult>>),
    Stream(mpsc::UnboundedSender<DetectionResult>),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    id: SessionId,
    mode: SessionMode,
    options: ScanOptions,
    state: AtomicU8,
    camera: Arc<dyn CameraProvider>,
    feedback: Arc<dyn DetectionFeedback>,
    handle: Mutex<Option<CameraHandle>>,
    pipeline: Mutex<Option<FramePipeline>>,
    debouncer: Mutex<Debouncer>,
    delivery: Mutex<Option<Delivery>>,
    ended: Notify,
}

impl Shared {
    fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `to` if the current state is one of `from`.
    ///
    /// Returns the state left on success, the state found on failure.
    fn transition(&self, from: &[SessionState], to: SessionState) -> Result<SessionState, SessionState> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let found = SessionState::from_u8(current);
            if !from.contains(&found) {
                return Err(found);
            }
            match self
                .state
                .compare_exchange(current, to as u8, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    trace!(session = %self.id.short(), from = %found, to = %to, "Session transition");
                    return Ok(found);
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn release_camera(&self) {
        let handle = lock(&self.handle).take();
        if let Some(handle) = handle {
            self.camera.release(handle);
            debug!(session = %self.id.short(), camera = handle.id(), "Released camera");
        }
    }

    /// Tear down after a terminal transition. Repeating it is harmless.
    fn shut_down(&self) {
        if let Some(pipeline) = lock(&self.pipeline).as_ref() {
            pipeline.close();
        }
        self.release_camera();
        lock(&self.debouncer).reset();
        self.ended.notify_waiters();
    }

    fn stats(&self) -> PipelineStats {
        lock(&self.pipeline)
            .as_ref()
            .map(FramePipeline::stats)
            .unwrap_or_default()
    }

    fn take_delivery(&self) -> Option<Delivery> {
        lock(&self.delivery).take()
    }

    fn result_for(&self, event: DetectionEvent) -> DetectionResult {
        DetectionResult::from_event(self.id, &self.options, event)
    }

    fn give_feedback(&self, result: &DetectionResult) {
        if self.options.vibrate_on_detect {
            self.feedback.detected(result);
        }
    }

    fn on_detection(&self, event: DetectionEvent) {
        if self.state() != SessionState::Active {
            return;
        }
        match self.mode {
            SessionMode::SingleShot => self.complete(event),
            SessionMode::Continuous => self.emit(event),
        }
    }

    fn complete(&self, event: DetectionEvent) {
        if self.transition(&[SessionState::Active], SessionState::Completed).is_err() {
            trace!(session = %self.id.short(), "Detection lost the race to a terminal transition");
            return;
        }
        self.shut_down();

        let result = self.result_for(event);
        info!(
            session = %self.id.short(),
            format = %result.format,
            "Scan completed"
        );
        self.give_feedback(&result);
        if let Some(Delivery::Once(tx)) = self.take_delivery() {
            let _ = tx.send(Ok(result));
        }
    }

    fn emit(&self, event: DetectionEvent) {
        if !lock(&self.debouncer).accept(&event) {
            trace!(session = %self.id.short(), value = %event.raw_value, "Suppressed repeated detection");
            return;
        }
        let result = self.result_for(event);

        // State is re-checked under the delivery lock so nothing is sent after close.
        let delivery = lock(&self.delivery);
        if self.state() != SessionState::Active {
            return;
        }
        if let Some(Delivery::Stream(tx)) = delivery.as_ref() {
            debug!(
                session = %self.id.short(),
                value = %result.text,
                format = %result.format,
                "Detection delivered"
            );
            self.give_feedback(&result);
            let _ = tx.send(result);
        }
    }

    fn cancel(&self) -> bool {
        let live = [
            SessionState::Idle,
            SessionState::AwaitingPermission,
            SessionState::Active,
        ];
        if self.transition(&live, SessionState::Cancelled).is_err() {
            return false;
        }
        self.shut_down();
        if let Some(Delivery::Once(tx)) = self.take_delivery() {
            let _ = tx.send(Err(ScanError::CancelledByUser));
        }
        info!(session = %self.id.short(), "Scan cancelled");
        true
    }

    fn close(&self) -> bool {
        if self.mode == SessionMode::SingleShot {
            return self.cancel();
        }
        if self.transition(&[SessionState::Active], SessionState::Completed).is_err() {
            return false;
        }
        self.shut_down();
        drop(self.take_delivery());
        info!(session = %self.id.short(), "Continuous scan closed");
        true
    }

    fn fail(&self, error: ScanError) -> ScanError {
        let live = [
            SessionState::Idle,
            SessionState::AwaitingPermission,
            SessionState::Active,
        ];
        match self.transition(&live, SessionState::Failed) {
            Ok(_) => {
                self.shut_down();
                if let Some(Delivery::Once(tx)) = self.take_delivery() {
                    let _ = tx.send(Err(error.clone()));
                }
                warn!(session = %self.id.short(), error = %error, "Scan failed");
                error
            }
            Err(found) => interrupted(found),
        }
    }
}

/// Error for a session that reached a terminal state while starting.
fn interrupted(found: SessionState) -> ScanError {
    match found {
        SessionState::Cancelled => ScanError::CancelledByUser,
        other => ScanError::InvalidState(other.to_string(), "idle"),
    }
}

/// Cloneable control handle for a running session.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    /// Cancel the session. Returns `false` if it had already ended.
    ///
    /// A pending single-shot scan resolves to [`ScanError::CancelledByUser`].
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// End a continuous session normally. Returns `false` if it was not active.
    ///
    /// On a single-shot session this is the same as [`cancel`](Self::cancel).
    pub fn close(&self) -> bool {
        self.shared.close()
    }

    /// Frame pipeline counters, including decode failures that are never
    /// reported as errors. All zero before the camera starts.
    pub fn stats(&self) -> PipelineStats {
        self.shared.stats()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("id", &self.shared.id)
            .field("state", &self.shared.state())
            .finish()
    }
}

/// One scan, single-shot or continuous.
pub struct ScanSession {
    shared: Arc<Shared>,
    decoder: Arc<dyn Decoder>,
    permissions: Arc<dyn PermissionGate>,
    config: SessionConfig,
}

impl ScanSession {
    pub fn new(
        options: ScanOptions,
        mode: SessionMode,
        collaborators: Collaborators,
        config: SessionConfig,
    ) -> Self {
        let id = SessionId::new();
        debug!(session = %id.short(), mode = %mode, scan_mode = %options.mode, "Created scan session");
        let shared = Arc::new(Shared {
            id,
            mode,
            options,
            state: AtomicU8::new(SessionState::Idle as u8),
            camera: collaborators.camera,
            feedback: collaborators.feedback,
            handle: Mutex::new(None),
            pipeline: Mutex::new(None),
            debouncer: Mutex::new(Debouncer::with_window(config.debounce_window)),
            delivery: Mutex::new(None),
            ended: Notify::new(),
        });
        Self {
            shared,
            decoder: collaborators.decoder,
            permissions: collaborators.permissions,
            config,
        }
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Run a single-shot scan to its one outcome.
    ///
    /// Resolves with the first accepted detection, or with the error that
    /// ended the session. The camera has been released by the time this returns.
    pub async fn scan_once(self) -> ScanResult<DetectionResult> {
        if self.shared.mode != SessionMode::SingleShot {
            return Err(ScanError::InvalidState(self.shared.mode.to_string(), "single-shot"));
        }
        let (tx, mut rx) = oneshot::channel();
        *lock(&self.shared.delivery) = Some(Delivery::Once(tx));

        // start() always runs to the end so a camera handle that arrives late
        // is still released. Whatever ended the session has already sent its
        // outcome, which wins over the error start() reports.
        if let Err(e) = self.start().await {
            return rx.try_recv().unwrap_or(Err(e));
        }
        rx.await.unwrap_or(Err(ScanError::CancelledByUser))
    }

    /// Start a continuous scan and return its detections as a stream.
    ///
    /// The stream ends when the session is closed or cancelled. Dropping the
    /// stream closes the session.
    pub async fn start_stream(self) -> ScanResult<DetectionStream> {
        if self.shared.mode != SessionMode::Continuous {
            return Err(ScanError::InvalidState(self.shared.mode.to_string(), "continuous"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.shared.delivery) = Some(Delivery::Stream(tx));

        self.start().await?;
        Ok(DetectionStream {
            rx,
            handle: self.handle(),
        })
    }

    async fn start(&self) -> ScanResult<()> {
        let shared = &self.shared;

        if !self.permissions.is_granted() {
            // Registered before the transition so an early cancel still wakes us.
            let ended = shared.ended.notified();
            tokio::pin!(ended);
            ended.as_mut().enable();

            shared
                .transition(&[SessionState::Idle], SessionState::AwaitingPermission)
                .map_err(interrupted)?;
            info!(session = %shared.id.short(), "Requesting camera permission");
            let granted = tokio::select! {
                granted = self.permissions.request() => granted,
                _ = &mut ended => return Err(interrupted(shared.state())),
            };
            if !granted {
                return Err(shared.fail(ScanError::PermissionDenied));
            }
        }

        shared
            .transition(
                &[SessionState::Idle, SessionState::AwaitingPermission],
                SessionState::Active,
            )
            .map_err(interrupted)?;

        let weak = Arc::downgrade(shared);
        let handler: DetectionHandler = Arc::new(move |event| {
            if let Some(shared) = weak.upgrade() {
                shared.on_detection(event);
            }
        });
        let pipeline = FramePipeline::spawn(
            Arc::clone(&self.decoder),
            shared.options.mode,
            self.config.pipeline,
            handler,
        );
        let sink = pipeline.sink();
        *lock(&shared.pipeline) = Some(pipeline);

        match shared.camera.acquire(&shared.options, sink).await {
            Ok(handle) => {
                *lock(&shared.handle) = Some(handle);
                if shared.state() != SessionState::Active {
                    // Ended while the camera was opening; nobody else will release it.
                    shared.shut_down();
                    return Err(interrupted(shared.state()));
                }
                info!(
                    session = %shared.id.short(),
                    camera = handle.id(),
                    facing = %shared.options.camera_facing,
                    "Camera acquired, scanning"
                );
                Ok(())
            }
            Err(e) => {
                let reason = match e {
                    ScanError::CameraUnavailable(reason) => reason,
                    other => other.to_string(),
                };
                Err(shared.fail(ScanError::CameraUnavailable(reason)))
            }
        }
    }
}

/// Detections from a continuous session.
pub struct DetectionStream {
    rx: mpsc::UnboundedReceiver<DetectionResult>,
    handle: SessionHandle,
}

impl DetectionStream {
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Close the session. Results already delivered stay readable.
    pub fn close(&self) -> bool {
        self.handle.close()
    }
}

impl Stream for DetectionStream {
    type Item = DetectionResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for DetectionStream {
    fn drop(&mut self) {
        self.handle.close();
    }
}
