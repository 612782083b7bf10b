//! QR code generation.
//!
//! Turns an [`EncodeRequest`] into a PNG image in four steps: build the module
//! matrix, draw it at the requested pixel size, composite an optional center
//! logo, and serialize. The encoder holds no state, so concurrent calls are
//! independent.
//!
//! ## Logo risk
//!
//! A logo overwrites the center of the symbol. Whether the code still scans
//! depends on the chosen error-correction level absorbing that damage. The
//! encoder never re-decodes its output, and it does not fail in this case.

mod matrix;
mod raster;

pub use matrix::ModuleMatrix;
pub use raster::LOGO_PADDING_PX;

use crate::error::{EncodeError, EncodeResult};
use crate::types::Color;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

/// QR error-correction level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum ErrorCorrection {
    /// ~7% of codewords recoverable.
    L,
    /// ~15% of codewords recoverable.
    #[default]
    M,
    /// ~25% of codewords recoverable.
    Q,
    /// ~30% of codewords recoverable.
    H,
}

impl From<ErrorCorrection> for qrcode::EcLevel {
    fn from(level: ErrorCorrection) -> Self {
        match level {
            ErrorCorrection::L => qrcode::EcLevel::L,
            ErrorCorrection::M => qrcode::EcLevel::M,
            ErrorCorrection::Q => qrcode::EcLevel::Q,
            ErrorCorrection::H => qrcode::EcLevel::H,
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::L => "L",
            Self::M => "M",
            Self::Q => "Q",
            Self::H => "H",
        };
        f.write_str(s)
    }
}

impl FromStr for ErrorCorrection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L" => Ok(Self::L),
            "M" => Ok(Self::M),
            "Q" => Ok(Self::Q),
            "H" => Ok(Self::H),
            _ => Err(format!("unknown error correction level: {}", s)),
        }
    }
}

/// Parameters for a single encode call.
///
/// Colors are kept as text and validated by [`encode`], so a malformed color
/// surfaces as [`EncodeError::InvalidColor`].
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    /// Text to encode.
    pub data: String,
    /// Output side length in pixels.
    pub size_px: u32,
    /// Dark module color.
    pub foreground: String,
    /// Light module and margin color.
    pub background: String,
    /// Encoded image (PNG, JPEG, ...) to place in the center.
    pub logo: Option<Vec<u8>>,
    /// Error-correction level.
    pub error_correction: ErrorCorrection,
}

impl EncodeRequest {
    /// Default output size in pixels.
    pub const DEFAULT_SIZE_PX: u32 = 300;

    /// Create a request with black-on-white defaults.
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            size_px: Self::DEFAULT_SIZE_PX,
            foreground: Color::BLACK.to_string(),
            background: Color::WHITE.to_string(),
            logo: None,
            error_correction: ErrorCorrection::default(),
        }
    }

    /// Set the output size.
    pub fn with_size(mut self, size_px: u32) -> Self {
        self.size_px = size_px;
        self
    }

    /// Set the dark module color.
    pub fn with_foreground(mut self, color: impl Into<String>) -> Self {
        self.foreground = color.into();
        self
    }

    /// Set the background color.
    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background = color.into();
        self
    }

    /// Attach a center logo.
    pub fn with_logo(mut self, logo: Vec<u8>) -> Self {
        self.logo = Some(logo);
        self
    }

    /// Set the error-correction level.
    pub fn with_error_correction(mut self, level: ErrorCorrection) -> Self {
        self.error_correction = level;
        self
    }
}

/// Container format of an [`EncodedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
        }
    }
}

/// A rendered code. Owned entirely by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    format: ImageKind,
    size_px: u32,
}

impl EncodedImage {
    /// Serialized image bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Take ownership of the serialized bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn format(&self) -> ImageKind {
        self.format
    }

    /// Side length in pixels.
    pub fn size_px(&self) -> u32 {
        self.size_px
    }
}

/// Render `request` into a PNG image.
pub fn encode(request: &EncodeRequest) -> EncodeResult<EncodedImage> {
    if request.data.is_empty() {
        return Err(EncodeError::InvalidInput("data is empty".to_string()));
    }
    if request.size_px == 0 {
        return Err(EncodeError::InvalidInput("size must be greater than zero".to_string()));
    }

    let foreground = parse_color(&request.foreground)?;
    let background = parse_color(&request.background)?;

    let matrix = ModuleMatrix::build(&request.data, request.error_correction)?;
    let mut img = raster::rasterize(&matrix, request.size_px, foreground, background)?;

    if let Some(logo_bytes) = request.logo.as_deref().filter(|b| !b.is_empty()) {
        match image::load_from_memory(logo_bytes) {
            Ok(logo) => raster::composite_logo(&mut img, &logo),
            Err(e) => warn!(error = %e, "Logo could not be decoded, rendering without it"),
        }
    }

    let bytes = raster::to_png(img)?;

    debug!(
        modules = matrix.dimension(),
        size_px = request.size_px,
        level = %request.error_correction,
        bytes = bytes.len(),
        "Encoded QR code"
    );

    Ok(EncodedImage {
        bytes,
        format: ImageKind::Png,
        size_px: request.size_px,
    })
}

/// Run [`encode`] on the blocking worker pool.
pub async fn encode_async(request: EncodeRequest) -> EncodeResult<EncodedImage> {
    tokio::task::spawn_blocking(move || encode(&request))
        .await
        .map_err(|e| EncodeError::Render(format!("encoder worker failed: {}", e)))?
}

fn parse_color(value: &str) -> EncodeResult<Color> {
    value
        .parse()
        .map_err(|e: crate::types::ColorError| EncodeError::InvalidColor(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    /// Decode every QR symbol in a PNG with `rqrr`.
    fn decode_png(bytes: &[u8]) -> Vec<String> {
        let img = image::load_from_memory(bytes).unwrap().to_luma8();
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            img.width() as usize,
            img.height() as usize,
            |x, y| img.get_pixel(x as u32, y as u32)[0],
        );
        prepared
            .detect_grids()
            .into_iter()
            .filter_map(|grid| grid.decode().ok())
            .map(|(_, content)| content)
            .collect()
    }

    fn png_logo(color: [u8; 4]) -> Vec<u8> {
        let logo = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba(color)));
        let mut bytes = Vec::new();
        logo.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_hello_roundtrip() {
        let request = EncodeRequest::new("HELLO")
            .with_size(300)
            .with_error_correction(ErrorCorrection::M);
        let image = encode(&request).unwrap();

        assert_eq!(image.format(), ImageKind::Png);
        assert_eq!(image.size_px(), 300);
        assert_eq!(decode_png(image.bytes()), vec!["HELLO".to_string()]);
    }

    #[test]
    fn test_roundtrip_every_level() {
        let data = "https://example.com/pay?id=42&note=coffee";
        for level in [
            ErrorCorrection::L,
            ErrorCorrection::M,
            ErrorCorrection::Q,
            ErrorCorrection::H,
        ] {
            let request = EncodeRequest::new(data)
                .with_size(400)
                .with_error_correction(level);
            let image = encode(&request).unwrap();
            assert_eq!(decode_png(image.bytes()), vec![data.to_string()], "level {}", level);
        }
    }

    #[test]
    fn test_output_dimensions() {
        let image = encode(&EncodeRequest::new("dimensions").with_size(257)).unwrap();
        let decoded = image::load_from_memory(image.bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (257, 257));
    }

    #[test]
    fn test_empty_data_rejected() {
        let err = encode(&EncodeRequest::new("").with_size(300)).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidInput(_)));
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = encode(&EncodeRequest::new("HELLO").with_size(0)).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_colors_rejected() {
        let err = encode(&EncodeRequest::new("HELLO").with_foreground("notacolor")).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidColor(_)));

        let err = encode(&EncodeRequest::new("HELLO").with_background("#12")).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidColor(_)));
    }

    #[test]
    fn test_custom_colors_applied() {
        let request = EncodeRequest::new("HELLO")
            .with_size(300)
            .with_foreground("#123456")
            .with_background("yellow");
        let image = encode(&request).unwrap();
        let rgba = image::load_from_memory(image.bytes()).unwrap().to_rgba8();

        assert_eq!(rgba.get_pixel(0, 0).0, [0xFF, 0xFF, 0x00, 0xFF]);
        assert_eq!(rgba.get_pixel(13, 13).0, [0x12, 0x34, 0x56, 0xFF]);
    }

    #[test]
    fn test_logo_composited_in_center() {
        let request = EncodeRequest::new("HELLO")
            .with_size(300)
            .with_error_correction(ErrorCorrection::H)
            .with_logo(png_logo([0, 200, 0, 255]));
        let image = encode(&request).unwrap();
        let rgba = image::load_from_memory(image.bytes()).unwrap().to_rgba8();

        assert_eq!(rgba.get_pixel(150, 150).0, [0, 200, 0, 255]);
        assert_eq!(rgba.get_pixel(110, 150).0, Color::WHITE.to_rgba());
    }

    #[test]
    fn test_undecodable_logo_is_skipped() {
        let plain = encode(&EncodeRequest::new("HELLO")).unwrap();
        let with_junk = encode(&EncodeRequest::new("HELLO").with_logo(vec![1, 2, 3, 4])).unwrap();
        assert_eq!(plain, with_junk);
    }

    #[test]
    fn test_encode_is_deterministic() {
        let request = EncodeRequest::new("same input");
        assert_eq!(encode(&request).unwrap(), encode(&request).unwrap());
    }

    #[test]
    fn test_error_correction_from_str() {
        assert_eq!("h".parse::<ErrorCorrection>().unwrap(), ErrorCorrection::H);
        assert_eq!(ErrorCorrection::default(), ErrorCorrection::M);
        assert!("X".parse::<ErrorCorrection>().is_err());
    }

    #[tokio::test]
    async fn test_encode_async_concurrent() {
        let tasks: Vec<_> = (0..4)
            .map(|i| tokio::spawn(encode_async(EncodeRequest::new(format!("item-{}", i)))))
            .collect();

        for (i, task) in tasks.into_iter().enumerate() {
            let image = task.await.unwrap().unwrap();
            assert_eq!(decode_png(image.bytes()), vec![format!("item-{}", i)]);
        }
    }
}
