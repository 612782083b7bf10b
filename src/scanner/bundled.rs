//! Collaborators that ship with the crate.
//!
//! [`ImageSequenceCamera`] replays still images as a frame feed, which is
//! enough to drive a full session from the command line or from tests.

use crate::error::ScanError;
use crate::scanner::frame::{Frame, FrameImage};
use crate::scanner::pipeline::FrameSink;
use crate::scanner::traits::{
    CameraHandle, CameraProvider, DetectionFeedback, DetectionResult, PermissionGate, ScanOptions,
};
use async_trait::async_trait;
use console::Term;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Camera that feeds a fixed list of images at a steady interval.
pub struct ImageSequenceCamera {
    frames: Arc<[FrameImage]>,
    interval: Duration,
    looping: bool,
    next_id: AtomicU64,
    running: Mutex<HashMap<u64, JoinHandle<()>>>,
}

impl ImageSequenceCamera {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

    pub fn new(frames: Vec<FrameImage>) -> Self {
        Self {
            frames: frames.into(),
            interval: Self::DEFAULT_INTERVAL,
            looping: false,
            next_id: AtomicU64::new(1),
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Load and convert image files in order.
    pub fn open<P: AsRef<Path>>(paths: &[P]) -> Result<Self, image::ImageError> {
        let frames = paths
            .iter()
            .map(|p| {
                let image = image::open(p.as_ref())?;
                debug!(path = %p.as_ref().display(), width = image.width(), height = image.height(), "Loaded frame image");
                Ok(FrameImage::from_dynamic(&image))
            })
            .collect::<Result<Vec<_>, image::ImageError>>()?;
        Ok(Self::new(frames))
    }

    /// Time between frames.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start over after the last image instead of going quiet.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Number of acquisitions not yet released.
    pub fn active(&self) -> usize {
        lock(&self.running).len()
    }
}

async fn replay(frames: Arc<[FrameImage]>, interval: Duration, looping: bool, sink: FrameSink) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        for (index, image) in frames.iter().enumerate() {
            ticker.tick().await;
            trace!(frame = index, "Replaying frame");
            if !sink.submit(Frame::new(image.clone(), 0)) {
                return;
            }
        }
        if !looping {
            debug!("Image sequence exhausted");
            return;
        }
    }
}

#[async_trait]
impl CameraProvider for ImageSequenceCamera {
    async fn acquire(
        &self,
        options: &ScanOptions,
        frames: FrameSink,
    ) -> Result<CameraHandle, ScanError> {
        if self.frames.is_empty() {
            return Err(ScanError::CameraUnavailable("no images to replay".to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let task = tokio::spawn(replay(
            Arc::clone(&self.frames),
            self.interval,
            self.looping,
            frames,
        ));
        lock(&self.running).insert(id, task);

        debug!(
            camera = id,
            facing = %options.camera_facing,
            frames = self.frames.len(),
            interval_ms = self.interval.as_millis() as u64,
            looping = self.looping,
            "Image sequence camera started"
        );
        Ok(CameraHandle::new(id))
    }

    fn release(&self, handle: CameraHandle) {
        let task = lock(&self.running).remove(&handle.id());
        match task {
            Some(task) => {
                task.abort();
                debug!(camera = handle.id(), "Image sequence camera stopped");
            }
            None => trace!(camera = handle.id(), "Camera already released"),
        }
    }
}

/// Permission gate for environments without a prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysGranted;

#[async_trait]
impl PermissionGate for AlwaysGranted {
    fn is_granted(&self) -> bool {
        true
    }

    async fn request(&self) -> bool {
        true
    }
}

/// Ignores detections.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl DetectionFeedback for NoFeedback {
    fn detected(&self, _result: &DetectionResult) {}
}

/// Rings the terminal bell on each detection.
#[derive(Debug, Clone)]
pub struct TerminalBell {
    term: Term,
}

impl TerminalBell {
    pub fn stderr() -> Self {
        Self { term: Term::stderr() }
    }
}

impl DetectionFeedback for TerminalBell {
    fn detected(&self, _result: &DetectionResult) {
        if self.term.is_term() {
            let _ = self.term.write_str("\x07");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::pipeline::{DetectionHandler, FramePipeline, PipelineConfig};
    use crate::scanner::testing::ScriptedDecoder;
    use crate::scanner::traits::ScanMode;

    fn frames(tags: &[u8]) -> Vec<FrameImage> {
        tags.iter().map(|&t| FrameImage::luma(1, 1, vec![t])).collect()
    }

    fn idle_pipeline(decoder: Arc<ScriptedDecoder>) -> FramePipeline {
        let handler: DetectionHandler = Arc::new(|_| {});
        FramePipeline::spawn(decoder, ScanMode::Qr, PipelineConfig::default(), handler)
    }

    #[tokio::test]
    async fn test_replays_frames_in_order() {
        let decoder = Arc::new(ScriptedDecoder::new());
        let pipeline = idle_pipeline(decoder.clone());
        let camera = ImageSequenceCamera::new(frames(&[1, 2, 3])).with_interval(Duration::from_millis(20));

        let handle = camera.acquire(&ScanOptions::default(), pipeline.sink()).await.unwrap();
        decoder.wait_for_calls(3).await;
        assert_eq!(decoder.seen(), vec![1, 2, 3]);

        camera.release(handle);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_looping_replays_again() {
        let decoder = Arc::new(ScriptedDecoder::new());
        let pipeline = idle_pipeline(decoder.clone());
        let camera = ImageSequenceCamera::new(frames(&[5]))
            .with_interval(Duration::from_millis(10))
            .looping(true);

        let handle = camera.acquire(&ScanOptions::default(), pipeline.sink()).await.unwrap();
        decoder.wait_for_calls(3).await;
        camera.release(handle);
        pipeline.shutdown().await;
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let decoder = Arc::new(ScriptedDecoder::new());
        let pipeline = idle_pipeline(decoder);
        let camera = ImageSequenceCamera::new(frames(&[1])).looping(true);

        let handle = camera.acquire(&ScanOptions::default(), pipeline.sink()).await.unwrap();
        assert_eq!(camera.active(), 1);
        camera.release(handle);
        camera.release(handle);
        camera.release(CameraHandle::new(999));
        assert_eq!(camera.active(), 0);
    }

    #[tokio::test]
    async fn test_no_images_is_unavailable() {
        let decoder = Arc::new(ScriptedDecoder::new());
        let pipeline = idle_pipeline(decoder);
        let camera = ImageSequenceCamera::new(Vec::new());

        let err = camera.acquire(&ScanOptions::default(), pipeline.sink()).await.unwrap_err();
        assert!(matches!(err, ScanError::CameraUnavailable(_)));
    }

    #[tokio::test]
    async fn test_open_loads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        image::RgbaImage::from_pixel(4, 3, image::Rgba([0, 0, 0, 255])).save(&path).unwrap();

        let camera = ImageSequenceCamera::open(&[&path]).unwrap();
        assert_eq!(camera.frame_count(), 1);
        assert!(ImageSequenceCamera::open(&[dir.path().join("missing.png")]).is_err());
    }

    #[tokio::test]
    async fn test_always_granted() {
        assert!(AlwaysGranted.is_granted());
        assert!(AlwaysGranted.request().await);
    }
}
