//! Scripted collaborators for engine tests.
//!
//! Frames are 1x1 grayscale images whose single byte is a tag; the scripted
//! decoder maps tags to detections.

use crate::error::{DecodeError, ScanError};
use crate::scanner::frame::{Frame, FrameImage};
use crate::scanner::pipeline::FrameSink;
use crate::scanner::traits::{
    CameraHandle, CameraProvider, Decoder, DetectionEvent, DetectionFeedback, DetectionResult,
    PermissionGate, ScanOptions,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

/// Upper bound on any wait in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Build a tagged frame that bumps `closes` when closed.
pub fn tagged_frame(tag: u8, closes: &Arc<AtomicUsize>) -> Frame {
    let closes = Arc::clone(closes);
    Frame::new(FrameImage::luma(1, 1, vec![tag]), 0).on_close(move || {
        closes.fetch_add(1, Ordering::SeqCst);
    })
}

/// Wait on `notify` until `done` holds.
async fn wait_until(notify: &Notify, done: impl Fn() -> bool) {
    let wait = async {
        loop {
            let notified = notify.notified();
            if done() {
                return;
            }
            notified.await;
        }
    };
    tokio::time::timeout(TEST_TIMEOUT, wait)
        .await
        .expect("timed out waiting for test condition");
}

enum Scripted {
    Events(Vec<DetectionEvent>),
    Fail(String),
}

/// Decoder that answers per frame tag and records what it saw.
#[derive(Default)]
pub struct ScriptedDecoder {
    script: Mutex<HashMap<u8, Scripted>>,
    seen: Mutex<Vec<u8>>,
    calls: AtomicUsize,
    called: Notify,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every decode waits for a permit from `gate`.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn on(self, tag: u8, events: Vec<DetectionEvent>) -> Self {
        self.script.lock().unwrap().insert(tag, Scripted::Events(events));
        self
    }

    pub fn fail_on(self, tag: u8, reason: &str) -> Self {
        self.script.lock().unwrap().insert(tag, Scripted::Fail(reason.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<u8> {
        self.seen.lock().unwrap().clone()
    }

    /// Wait until `n` decodes have started.
    pub async fn wait_for_calls(&self, n: usize) {
        wait_until(&self.called, || self.calls() >= n).await;
    }
}

#[async_trait]
impl Decoder for ScriptedDecoder {
    async fn decode(
        &self,
        image: &FrameImage,
        _rotation_degrees: u32,
    ) -> Result<Vec<DetectionEvent>, DecodeError> {
        let tag = image.data[0];
        self.seen.lock().unwrap().push(tag);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.called.notify_waiters();

        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        match self.script.lock().unwrap().get(&tag) {
            Some(Scripted::Events(events)) => Ok(events.clone()),
            Some(Scripted::Fail(reason)) => Err(DecodeError(reason.clone())),
            None => Ok(Vec::new()),
        }
    }
}

/// Camera that hands its frame sink to the test.
#[derive(Default)]
pub struct MockCamera {
    sink: Mutex<Option<FrameSink>>,
    acquired: Notify,
    acquires: AtomicUsize,
    releases: AtomicUsize,
    released: Mutex<Vec<CameraHandle>>,
    next_id: AtomicU64,
    unavailable: Option<String>,
    acquire_delay: Option<Duration>,
    warmup_frame: Option<u8>,
}

impl MockCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every acquire fails with `reason`.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            unavailable: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// Acquire takes `delay` to complete.
    pub fn slow(delay: Duration) -> Self {
        Self {
            acquire_delay: Some(delay),
            ..Self::default()
        }
    }

    /// Push a frame tagged `tag` as soon as acquire starts, before any delay.
    pub fn with_warmup_frame(mut self, tag: u8) -> Self {
        self.warmup_frame = Some(tag);
        self
    }

    pub fn acquires(&self) -> usize {
        self.acquires.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> Vec<CameraHandle> {
        self.released.lock().unwrap().clone()
    }

    /// Wait for an acquire and return the sink it received.
    pub async fn sink(&self) -> FrameSink {
        wait_until(&self.acquired, || self.sink.lock().unwrap().is_some()).await;
        self.sink.lock().unwrap().clone().unwrap()
    }
}

#[async_trait]
impl CameraProvider for MockCamera {
    async fn acquire(
        &self,
        _options: &ScanOptions,
        frames: FrameSink,
    ) -> Result<CameraHandle, ScanError> {
        self.acquires.fetch_add(1, Ordering::SeqCst);
        if let Some(tag) = self.warmup_frame {
            frames.submit(tagged_frame(tag, &Arc::new(AtomicUsize::new(0))));
        }
        if let Some(delay) = self.acquire_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = &self.unavailable {
            return Err(ScanError::CameraUnavailable(reason.clone()));
        }
        *self.sink.lock().unwrap() = Some(frames);
        self.acquired.notify_waiters();
        Ok(CameraHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn release(&self, handle: CameraHandle) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        self.released.lock().unwrap().push(handle);
    }
}

/// Permission gate with a fixed answer.
pub struct MockPermissions {
    granted: bool,
    answer: bool,
    requests: AtomicUsize,
    hold: Option<Arc<Notify>>,
}

impl MockPermissions {
    /// Not yet granted; a request resolves to `answer`.
    pub fn prompting(answer: bool) -> Self {
        Self {
            granted: false,
            answer,
            requests: AtomicUsize::new(0),
            hold: None,
        }
    }

    /// Not yet granted; a request blocks until `release` is notified.
    pub fn held(answer: bool, release: Arc<Notify>) -> Self {
        Self {
            hold: Some(release),
            ..Self::prompting(answer)
        }
    }

    pub fn already_granted() -> Self {
        Self {
            granted: true,
            ..Self::prompting(true)
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionGate for MockPermissions {
    fn is_granted(&self) -> bool {
        self.granted
    }

    async fn request(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.answer
    }
}

/// Records delivered results.
#[derive(Default)]
pub struct RecordingFeedback {
    pub results: Mutex<Vec<DetectionResult>>,
}

impl DetectionFeedback for RecordingFeedback {
    fn detected(&self, result: &DetectionResult) {
        self.results.lock().unwrap().push(result.clone());
    }
}
