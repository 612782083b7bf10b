//! Scan options, detection payloads and the collaborator traits.
//!
//! The session engine never talks to hardware directly. Cameras, decoders,
//! permission prompts and haptics are reached through the traits below,
//! which keeps the engine testable with in-memory implementations.

use crate::error::{DecodeError, ScanError};
use crate::scanner::frame::FrameImage;
use crate::scanner::pipeline::FrameSink;
use crate::types::{BarcodeFormat, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which symbologies a session looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// QR codes only.
    #[default]
    Qr,
    /// One-dimensional and non-QR two-dimensional barcodes.
    Barcode,
    /// Every supported symbology (live preview).
    All,
}

impl ScanMode {
    /// Whether detections of `format` are reported in this mode.
    pub fn accepts(self, format: BarcodeFormat) -> bool {
        match self {
            Self::Qr => format == BarcodeFormat::QrCode,
            Self::Barcode => format != BarcodeFormat::QrCode && format != BarcodeFormat::Unknown,
            Self::All => format != BarcodeFormat::Unknown,
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qr => write!(f, "qr"),
            Self::Barcode => write!(f, "barcode"),
            Self::All => write!(f, "all"),
        }
    }
}

/// Overlay template requested by the caller. Rendering is left to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Simple,
    Fullscreen,
    Credential,
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple => write!(f, "simple"),
            Self::Fullscreen => write!(f, "fullscreen"),
            Self::Credential => write!(f, "credential"),
        }
    }
}

/// Camera to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Front,
    #[default]
    Back,
}

impl fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Front => write!(f, "front"),
            Self::Back => write!(f, "back"),
        }
    }
}

impl FromStr for CameraFacing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "front" | "user" => Ok(Self::Front),
            "back" | "rear" | "environment" => Ok(Self::Back),
            _ => Err(format!("unknown camera facing: {}", s)),
        }
    }
}

/// Whether a session stops on its first hit or keeps streaming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Deliver exactly one result, then release the camera.
    SingleShot,
    /// Stream de-duplicated results until closed.
    Continuous,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleShot => write!(f, "single-shot"),
            Self::Continuous => write!(f, "continuous"),
        }
    }
}

/// Options fixed at session creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    pub mode: ScanMode,
    pub template: Template,
    pub camera_facing: CameraFacing,
    pub flashlight_enabled: bool,
    pub vibrate_on_detect: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            mode: ScanMode::Qr,
            template: Template::Simple,
            camera_facing: CameraFacing::Back,
            flashlight_enabled: true,
            vibrate_on_detect: true,
        }
    }
}

impl ScanOptions {
    /// Options for the given scan mode, other fields at their defaults.
    pub fn new(mode: ScanMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Set the overlay template.
    pub fn with_template(mut self, template: Template) -> Self {
        self.template = template;
        self
    }

    /// Set the camera to open.
    pub fn with_camera(mut self, facing: CameraFacing) -> Self {
        self.camera_facing = facing;
        self
    }

    /// Enable or disable the flashlight control.
    pub fn with_flashlight(mut self, enabled: bool) -> Self {
        self.flashlight_enabled = enabled;
        self
    }

    /// Enable or disable detection feedback.
    pub fn with_vibration(mut self, enabled: bool) -> Self {
        self.vibrate_on_detect = enabled;
        self
    }
}

/// A single decoder hit, before de-duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionEvent {
    pub raw_value: String,
    pub format: BarcodeFormat,
    pub raw_bytes: Option<Vec<u8>>,
    pub observed_at: DateTime<Utc>,
}

impl DetectionEvent {
    /// Create an event observed now.
    pub fn new(raw_value: impl Into<String>, format: BarcodeFormat) -> Self {
        Self {
            raw_value: raw_value.into(),
            format,
            raw_bytes: None,
            observed_at: Utc::now(),
        }
    }

    /// Override the observation time.
    pub fn at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    /// Attach the undecoded payload bytes.
    pub fn with_raw_bytes(mut self, raw_bytes: Vec<u8>) -> Self {
        self.raw_bytes = Some(raw_bytes);
        self
    }
}

/// What a caller receives for an accepted detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Session that produced this result.
    pub session: SessionId,
    /// Decoded text.
    pub text: String,
    /// Symbology.
    pub format: BarcodeFormat,
    /// Undecoded payload, Base64 in serialized form.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes"
    )]
    pub raw_bytes: Option<Vec<u8>>,
    /// Overlay template, reported for QR scans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<Template>,
    /// When the decoder observed the code.
    pub detected_at: DateTime<Utc>,
}

impl DetectionResult {
    /// Build a result for `event` under the given session options.
    pub fn from_event(session: SessionId, options: &ScanOptions, event: DetectionEvent) -> Self {
        Self {
            session,
            text: event.raw_value,
            format: event.format,
            raw_bytes: event.raw_bytes,
            template: (options.mode == ScanMode::Qr).then_some(options.template),
            detected_at: event.observed_at,
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Opaque token for an acquired camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CameraHandle(u64);

impl CameraHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

/// Turns frame images into detections.
///
/// Results are ordered by decoder preference; the pipeline only looks at the
/// first one the session's [`ScanMode`] accepts.
#[async_trait]
pub trait Decoder: Send + Sync {
    /// Decode one frame.
    async fn decode(
        &self,
        image: &FrameImage,
        rotation_degrees: u32,
    ) -> Result<Vec<DetectionEvent>, DecodeError>;
}

/// Opens and closes the camera.
///
/// `acquire` hands the provider a [`FrameSink`]; the provider pushes frames
/// into it until the handle is released.
#[async_trait]
pub trait CameraProvider: Send + Sync {
    /// Open a camera. Fails with [`ScanError::CameraUnavailable`].
    async fn acquire(&self, options: &ScanOptions, frames: FrameSink)
        -> Result<CameraHandle, ScanError>;

    /// Stop the camera. Must be safe on an already-released handle.
    fn release(&self, handle: CameraHandle);
}

/// Camera permission prompt.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Whether access is already granted.
    fn is_granted(&self) -> bool;

    /// Ask the user. Resolves to `true` when granted.
    async fn request(&self) -> bool;
}

/// Notified for each delivered result when `vibrate_on_detect` is set.
pub trait DetectionFeedback: Send + Sync {
    fn detected(&self, result: &DetectionResult);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_mode_accepts() {
        assert!(ScanMode::Qr.accepts(BarcodeFormat::QrCode));
        assert!(!ScanMode::Qr.accepts(BarcodeFormat::Ean13));
        assert!(ScanMode::Barcode.accepts(BarcodeFormat::Ean13));
        assert!(ScanMode::Barcode.accepts(BarcodeFormat::DataMatrix));
        assert!(!ScanMode::Barcode.accepts(BarcodeFormat::QrCode));
        assert!(BarcodeFormat::ALL.iter().all(|f| ScanMode::All.accepts(*f)));
        assert!(!ScanMode::All.accepts(BarcodeFormat::Unknown));
    }

    #[test]
    fn test_camera_facing_from_str() {
        assert_eq!("front".parse::<CameraFacing>().unwrap(), CameraFacing::Front);
        assert_eq!("Back".parse::<CameraFacing>().unwrap(), CameraFacing::Back);
        assert!("side".parse::<CameraFacing>().is_err());
    }

    #[test]
    fn test_result_template_only_for_qr() {
        let session = SessionId::new();
        let event = DetectionEvent::new("X", BarcodeFormat::QrCode);

        let qr = ScanOptions::new(ScanMode::Qr).with_template(Template::Credential);
        let result = DetectionResult::from_event(session, &qr, event.clone());
        assert_eq!(result.template, Some(Template::Credential));

        let barcode = ScanOptions::new(ScanMode::Barcode);
        assert_eq!(DetectionResult::from_event(session, &barcode, event).template, None);
    }

    #[test]
    fn test_result_json_shape() {
        let event = DetectionEvent::new("HELLO", BarcodeFormat::QrCode).with_raw_bytes(vec![0x0a, 0xff]);
        let result = DetectionResult::from_event(SessionId::new(), &ScanOptions::default(), event);

        let json: serde_json::Value = serde_json::to_value(&result).unwrap();
        assert_eq!(json["text"], "HELLO");
        assert_eq!(json["format"], "QR_CODE");
        assert_eq!(json["raw_bytes"], "Cv8=");
        assert_eq!(json["template"], "simple");

        let parsed: DetectionResult = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, result);
    }

    #[test]
    fn test_result_rejects_malformed_bytes() {
        let mut json = serde_json::to_value(DetectionResult::from_event(
            SessionId::new(),
            &ScanOptions::default(),
            DetectionEvent::new("x", BarcodeFormat::QrCode),
        ))
        .unwrap();
        json["raw_bytes"] = serde_json::Value::from("not base64!");
        assert!(serde_json::from_value::<DetectionResult>(json).is_err());
    }

    #[test]
    fn test_result_json_omits_missing_bytes() {
        let event = DetectionEvent::new("4006381333931", BarcodeFormat::Ean13);
        let result = DetectionResult::from_event(SessionId::new(), &ScanOptions::new(ScanMode::Barcode), event);
        let json = serde_json::to_string(&result).unwrap();
        assert!(!json.contains("raw_bytes"));
        assert!(!json.contains("template"));
    }
}
