//! Pixel rendering of a module matrix, logo compositing and PNG serialization.

use super::matrix::ModuleMatrix;
use crate::error::{EncodeError, EncodeResult};
use crate::types::Color;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// White border drawn around the logo, in pixels.
pub const LOGO_PADDING_PX: u32 = 4;

/// Draw `matrix` directly at `size_px × size_px`.
///
/// Each module becomes a `size_px / dimension` pixel block. The symbol is
/// centered and any remainder is left as background.
pub fn rasterize(
    matrix: &ModuleMatrix,
    size_px: u32,
    foreground: Color,
    background: Color,
) -> EncodeResult<RgbaImage> {
    let dimension = matrix.dimension() as u32;
    let scale = size_px / dimension;
    if scale == 0 {
        return Err(EncodeError::InvalidInput(format!(
            "size {}px is smaller than the {}-module symbol",
            size_px, dimension
        )));
    }
    let offset = (size_px - dimension * scale) / 2;

    let mut img = RgbaImage::from_pixel(size_px, size_px, Rgba(background.to_rgba()));
    let dark = Rgba(foreground.to_rgba());

    for my in 0..dimension {
        for mx in 0..dimension {
            if !matrix.is_dark(mx as usize, my as usize) {
                continue;
            }
            let left = offset + mx * scale;
            let top = offset + my * scale;
            for y in top..top + scale {
                for x in left..left + scale {
                    img.put_pixel(x, y, dark);
                }
            }
        }
    }

    Ok(img)
}

/// Overwrite the center of `img` with a padded white square holding `logo`.
///
/// The logo area is a quarter of the image side. The result is not checked for
/// decodability.
pub fn composite_logo(img: &mut RgbaImage, logo: &DynamicImage) {
    let size = img.width().min(img.height());
    let logo_size = size / 4;
    if logo_size == 0 {
        return;
    }
    let origin = (size - logo_size) / 2;

    let pad_start = origin.saturating_sub(LOGO_PADDING_PX);
    let pad_end = (origin + logo_size + LOGO_PADDING_PX).min(size);
    let white = Rgba(Color::WHITE.to_rgba());
    for y in pad_start..pad_end {
        for x in pad_start..pad_end {
            img.put_pixel(x, y, white);
        }
    }

    let scaled = imageops::resize(&logo.to_rgba8(), logo_size, logo_size, FilterType::Triangle);
    imageops::overlay(img, &scaled, i64::from(origin), i64::from(origin));
}

/// Serialize to lossless PNG bytes.
pub fn to_png(img: RgbaImage) -> EncodeResult<Vec<u8>> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| EncodeError::Render(e.to_string()))?;
    Ok(bytes)
}
