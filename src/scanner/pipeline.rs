//! Keep-only-latest frame pipeline.
//!
//! The camera pushes frames into a single-slot mailbox through a
//! [`FrameSink`]. One worker task drains the slot and decodes. A frame that
//! arrives while another is pending replaces it, so decoding always works on
//! the newest frame and memory stays bounded whatever the camera rate.
//!
//! Every frame is closed exactly once: decoded frames after decoding,
//! superseded frames when replaced and pending frames when the pipeline
//! closes.

use crate::scanner::frame::Frame;
use crate::scanner::rate_limiter::RateLimiter;
use crate::scanner::traits::{Decoder, DetectionEvent, ScanMode};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Called on the worker task with the first accepted detection of a frame.
pub type DetectionHandler = Arc<dyn Fn(DetectionEvent) + Send + Sync>;

/// Pipeline tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum decodes per second. Zero means unlimited.
    pub max_decode_rate: u32,
}

/// Counters since the pipeline started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_submitted: u64,
    pub frames_superseded: u64,
    pub frames_decoded: u64,
    pub decode_failures: u64,
    pub detections: u64,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicU64,
    superseded: AtomicU64,
    decoded: AtomicU64,
    failures: AtomicU64,
    detections: AtomicU64,
}

#[derive(Default)]
struct Slot {
    pending: Mutex<Option<Frame>>,
    ready: Notify,
    closed: AtomicBool,
    counters: Counters,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Slot {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn take(&self) -> Option<Frame> {
        lock(&self.pending).take()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        drop(self.take());
        self.ready.notify_one();
    }
}

/// Camera-facing end of the pipeline.
#[derive(Clone)]
pub struct FrameSink {
    slot: Arc<Slot>,
}

impl FrameSink {
    /// Offer a frame for decoding.
    ///
    /// Replaces (and closes) any frame still pending. Returns `false` if the
    /// pipeline is closed, in which case the frame is closed immediately.
    pub fn submit(&self, frame: Frame) -> bool {
        if self.slot.is_closed() {
            return false;
        }
        self.slot.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let previous = lock(&self.slot.pending).replace(frame);
        if previous.is_some() {
            self.slot.counters.superseded.fetch_add(1, Ordering::Relaxed);
            trace!("Superseded pending frame");
        }
        drop(previous);

        // close() may have drained the slot between the check and the insert.
        if self.slot.is_closed() {
            drop(self.slot.take());
            return false;
        }
        self.slot.ready.notify_one();
        true
    }

    /// Whether the pipeline has stopped accepting frames.
    pub fn is_closed(&self) -> bool {
        self.slot.is_closed()
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSink")
            .field("closed", &self.slot.is_closed())
            .finish()
    }
}

/// A running decode worker and its mailbox.
pub struct FramePipeline {
    slot: Arc<Slot>,
    worker: Option<JoinHandle<()>>,
}

impl FramePipeline {
    /// Spawn the decode worker on the current runtime.
    pub fn spawn(
        decoder: Arc<dyn Decoder>,
        mode: ScanMode,
        config: PipelineConfig,
        on_detection: DetectionHandler,
    ) -> Self {
        let slot = Arc::new(Slot::default());
        let limiter = RateLimiter::new(config.max_decode_rate);
        debug!(
            mode = %mode,
            max_decode_rate = config.max_decode_rate,
            "Starting frame pipeline"
        );

        let worker = tokio::spawn(run_worker(
            Arc::clone(&slot),
            decoder,
            mode,
            limiter,
            on_detection,
        ));

        Self {
            slot,
            worker: Some(worker),
        }
    }

    /// Handle for the camera to push frames into.
    pub fn sink(&self) -> FrameSink {
        FrameSink {
            slot: Arc::clone(&self.slot),
        }
    }

    /// Stop accepting frames and close the pending one.
    ///
    /// A decode already in flight finishes, but its detection is discarded.
    pub fn close(&self) {
        if !self.slot.closed.swap(true, Ordering::AcqRel) {
            debug!("Closing frame pipeline");
        }
        self.slot.close();
    }

    pub fn is_closed(&self) -> bool {
        self.slot.is_closed()
    }

    pub fn stats(&self) -> PipelineStats {
        let c = &self.slot.counters;
        PipelineStats {
            frames_submitted: c.submitted.load(Ordering::Relaxed),
            frames_superseded: c.superseded.load(Ordering::Relaxed),
            frames_decoded: c.decoded.load(Ordering::Relaxed),
            decode_failures: c.failures.load(Ordering::Relaxed),
            detections: c.detections.load(Ordering::Relaxed),
        }
    }

    /// Close and wait for the worker to exit.
    pub async fn shutdown(mut self) {
        self.close();
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.slot.close();
    }
}

async fn run_worker(
    slot: Arc<Slot>,
    decoder: Arc<dyn Decoder>,
    mode: ScanMode,
    limiter: Option<RateLimiter>,
    on_detection: DetectionHandler,
) {
    loop {
        let Some(mut frame) = slot.take() else {
            if slot.is_closed() {
                break;
            }
            slot.ready.notified().await;
            continue;
        };

        if let Some(limiter) = &limiter {
            limiter.wait().await;
            // Prefer anything newer that arrived while waiting.
            if let Some(newer) = slot.take() {
                slot.counters.superseded.fetch_add(1, Ordering::Relaxed);
                frame = newer;
            }
        }

        if slot.is_closed() {
            break;
        }

        let Some(image) = frame.image().cloned() else {
            trace!("Frame carried no image data");
            continue;
        };

        let events = match decoder.decode(&image, frame.rotation_degrees()).await {
            Ok(events) => events,
            Err(e) => {
                slot.counters.failures.fetch_add(1, Ordering::Relaxed);
                debug!(error = %e, "Frame decode failed");
                continue;
            }
        };
        slot.counters.decoded.fetch_add(1, Ordering::Relaxed);

        let Some(event) = events.into_iter().find(|e| mode.accepts(e.format)) else {
            continue;
        };

        if slot.is_closed() {
            trace!("Pipeline closed during decode, dropping detection");
            break;
        }

        slot.counters.detections.fetch_add(1, Ordering::Relaxed);
        trace!(format = %event.format, "Frame produced a detection");
        on_detection(event);
        frame.close();
    }

    drop(slot.take());
    debug!("Frame pipeline stopped");
}
