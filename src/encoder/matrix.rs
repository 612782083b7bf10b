//! Module matrix construction.
//!
//! Wraps the `qrcode` symbol builder and lays the symbol out inside a fixed
//! one-module quiet zone, so the rasterizer only ever sees a complete square grid.

use super::ErrorCorrection;
use crate::error::{EncodeError, EncodeResult};
use qrcode::QrCode;

/// Square grid of dark/light modules, quiet zone included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMatrix {
    dimension: usize,
    modules: Vec<bool>,
}

impl ModuleMatrix {
    /// Width of the blank border around the symbol, in modules.
    pub const QUIET_ZONE: usize = 1;

    /// Encode `data` as UTF-8 bytes at the given error-correction level.
    pub fn build(data: &str, level: ErrorCorrection) -> EncodeResult<Self> {
        let code = QrCode::with_error_correction_level(data.as_bytes(), level.into())
            .map_err(|e| EncodeError::InvalidInput(format!("cannot encode data: {}", e)))?;

        let symbol_width = code.width();
        let dimension = symbol_width + 2 * Self::QUIET_ZONE;
        let mut modules = vec![false; dimension * dimension];

        for (i, color) in code.to_colors().into_iter().enumerate() {
            let x = i % symbol_width + Self::QUIET_ZONE;
            let y = i / symbol_width + Self::QUIET_ZONE;
            modules[y * dimension + x] = color == qrcode::Color::Dark;
        }

        Ok(Self { dimension, modules })
    }

    /// Side length in modules, quiet zone included.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Whether the module at `(x, y)` is dark. Out-of-range coordinates are light.
    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.dimension && y < self.dimension && self.modules[y * self.dimension + x]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_one_dimension() {
        let matrix = ModuleMatrix::build("HELLO", ErrorCorrection::M).unwrap();
        // Version 1 is 21 modules wide, plus one quiet module per side.
        assert_eq!(matrix.dimension(), 23);
    }

    #[test]
    fn test_quiet_zone_is_light() {
        let matrix = ModuleMatrix::build("HELLO", ErrorCorrection::M).unwrap();
        let last = matrix.dimension() - 1;
        for i in 0..matrix.dimension() {
            assert!(!matrix.is_dark(i, 0));
            assert!(!matrix.is_dark(0, i));
            assert!(!matrix.is_dark(i, last));
            assert!(!matrix.is_dark(last, i));
        }
    }

    #[test]
    fn test_finder_corner_is_dark() {
        let matrix = ModuleMatrix::build("HELLO", ErrorCorrection::M).unwrap();
        assert!(matrix.is_dark(1, 1));
        assert!(matrix.is_dark(matrix.dimension() - 2, 1));
        assert!(matrix.is_dark(1, matrix.dimension() - 2));
    }

    #[test]
    fn test_higher_level_never_shrinks() {
        let data = "https://example.com/some/longer/path?with=query&and=more";
        let low = ModuleMatrix::build(data, ErrorCorrection::L).unwrap();
        let high = ModuleMatrix::build(data, ErrorCorrection::H).unwrap();
        assert!(high.dimension() >= low.dimension());
    }

    #[test]
    fn test_data_too_long() {
        let data = "x".repeat(8000);
        let err = ModuleMatrix::build(&data, ErrorCorrection::H).unwrap_err();
        assert!(matches!(err, EncodeError::InvalidInput(_)));
    }
}
