//! QR decoding with `rqrr`.

use crate::error::DecodeError;
use crate::scanner::frame::FrameImage;
use crate::scanner::traits::{Decoder, DetectionEvent};
use crate::types::BarcodeFormat;
use async_trait::async_trait;
use rqrr::PreparedImage;
use tracing::{debug, trace};

/// Pure-Rust QR decoder. Reports [`BarcodeFormat::QrCode`] only.
///
/// Grid detection is orientation independent, so the frame rotation is not
/// needed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode synchronously. Grids that are found but fail to decode are skipped.
    pub fn decode_blocking(image: &FrameImage) -> Result<Vec<DetectionEvent>, DecodeError> {
        if image.width == 0 || image.height == 0 {
            return Err(DecodeError("empty frame".to_string()));
        }
        if !image.is_well_formed() {
            return Err(DecodeError(format!(
                "frame buffer holds {} bytes, expected {}",
                image.data.len(),
                image.expected_len()
            )));
        }

        let mut prepared = PreparedImage::prepare_from_greyscale(
            image.width as usize,
            image.height as usize,
            |x, y| image.luma_at(x, y),
        );
        let grids = prepared.detect_grids();
        trace!(grids = grids.len(), "Detected QR grids");

        let mut events = Vec::with_capacity(grids.len());
        for grid in grids {
            let mut raw = Vec::new();
            match grid.decode_to(&mut raw) {
                Ok(_) => {
                    let text = String::from_utf8_lossy(&raw).into_owned();
                    events.push(DetectionEvent::new(text, BarcodeFormat::QrCode).with_raw_bytes(raw));
                }
                Err(e) => debug!(error = %e, "Skipping undecodable QR grid"),
            }
        }
        Ok(events)
    }
}

#[async_trait]
impl Decoder for RqrrDecoder {
    async fn decode(
        &self,
        image: &FrameImage,
        _rotation_degrees: u32,
    ) -> Result<Vec<DetectionEvent>, DecodeError> {
        let image = image.clone();
        tokio::task::spawn_blocking(move || Self::decode_blocking(&image))
            .await
            .map_err(|e| DecodeError(format!("decoder task failed: {}", e)))?
    }
}
