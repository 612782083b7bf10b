//! Camera frames.
//!
//! A [`Frame`] owns whatever the camera needs back once the frame has been
//! looked at. That cleanup runs exactly once, when the frame is dropped,
//! whichever path (decoded, superseded, discarded on close) the frame took.

use image::DynamicImage;
use std::fmt;
use std::sync::Arc;

/// Pixel layout of [`FrameImage::data`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// One byte of luminance per pixel.
    Luma8,
    /// Four bytes per pixel, RGBA order.
    Rgba8,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Luma8 => 1,
            Self::Rgba8 => 4,
        }
    }
}

/// Immutable frame pixels. Clones share the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub data: Arc<[u8]>,
}

impl FrameImage {
    /// Grayscale pixels, row-major.
    pub fn luma(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            layout: PixelLayout::Luma8,
            data: data.into(),
        }
    }

    /// RGBA pixels, row-major.
    pub fn rgba(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            width,
            height,
            layout: PixelLayout::Rgba8,
            data: data.into(),
        }
    }

    /// Grayscale copy of a decoded image.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        Self::luma(width, height, gray.into_raw())
    }

    /// Number of bytes `data` must hold for the declared size and layout.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.layout.bytes_per_pixel()
    }

    /// Whether the buffer matches the declared size.
    pub fn is_well_formed(&self) -> bool {
        self.data.len() == self.expected_len()
    }

    /// Luminance at `(x, y)`. Caller guarantees bounds and a well-formed buffer.
    pub fn luma_at(&self, x: usize, y: usize) -> u8 {
        let idx = y * self.width as usize + x;
        match self.layout {
            PixelLayout::Luma8 => self.data[idx],
            PixelLayout::Rgba8 => {
                let px = &self.data[idx * 4..idx * 4 + 3];
                // ITU-R BT.601 weights, integer form
                ((u32::from(px[0]) * 299 + u32::from(px[1]) * 587 + u32::from(px[2]) * 114) / 1000) as u8
            }
        }
    }
}

type CloseFn = Box<dyn FnOnce() + Send>;

/// One camera frame plus its release callback.
pub struct Frame {
    image: Option<FrameImage>,
    rotation_degrees: u32,
    on_close: Option<CloseFn>,
}

impl Frame {
    /// A frame carrying pixels.
    pub fn new(image: FrameImage, rotation_degrees: u32) -> Self {
        Self {
            image: Some(image),
            rotation_degrees,
            on_close: None,
        }
    }

    /// A frame without pixel data. It is closed without decoding.
    pub fn empty(rotation_degrees: u32) -> Self {
        Self {
            image: None,
            rotation_degrees,
            on_close: None,
        }
    }

    /// Run `f` when this frame is closed.
    pub fn on_close(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(f));
        self
    }

    pub fn image(&self) -> Option<&FrameImage> {
        self.image.as_ref()
    }

    pub fn rotation_degrees(&self) -> u32 {
        self.rotation_degrees
    }

    /// Hand the frame back to the camera.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(close) = self.on_close.take() {
            close();
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("image", &self.image.as_ref().map(|i| (i.width, i.height, i.layout)))
            .field("rotation_degrees", &self.rotation_degrees)
            .finish()
    }
}
