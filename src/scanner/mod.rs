//! Scan engine - drives camera frames through a decoder into results.
//!
//! A [`ScanSession`] acquires a camera through a [`CameraProvider`], feeds
//! its frames into a keep-only-latest [`FramePipeline`] and hands accepted
//! detections to the caller, either once ([`ScanSession::scan_once`]) or as a
//! de-duplicated stream ([`ScanSession::start_stream`]).

pub mod bundled;
pub mod debounce;
pub mod frame;
pub mod pipeline;
pub mod rate_limiter;
pub mod rqrr_decoder;
pub mod session;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use bundled::{AlwaysGranted, ImageSequenceCamera, NoFeedback, TerminalBell};
pub use debounce::Debouncer;
pub use frame::{Frame, FrameImage, PixelLayout};
pub use pipeline::{FramePipeline, FrameSink, PipelineConfig, PipelineStats};
pub use rate_limiter::RateLimiter;
pub use rqrr_decoder::RqrrDecoder;
pub use session::{
    Collaborators, DetectionStream, ScanSession, SessionConfig, SessionHandle, SessionState,
};
pub use traits::{
    CameraFacing, CameraHandle, CameraProvider, Decoder, DetectionEvent, DetectionFeedback,
    DetectionResult, PermissionGate, ScanMode, ScanOptions, SessionMode, Template,
};
