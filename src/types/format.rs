//! Barcode symbologies reported by decoders.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Symbology of a decoded code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BarcodeFormat {
    QrCode,
    #[serde(rename = "EAN_8")]
    Ean8,
    #[serde(rename = "EAN_13")]
    Ean13,
    UpcA,
    UpcE,
    #[serde(rename = "CODE_39")]
    Code39,
    #[serde(rename = "CODE_93")]
    Code93,
    #[serde(rename = "CODE_128")]
    Code128,
    #[serde(rename = "PDF_417")]
    Pdf417,
    Aztec,
    Itf,
    DataMatrix,
    Unknown,
}

impl BarcodeFormat {
    /// Every known symbology, `Unknown` excluded.
    pub const ALL: [BarcodeFormat; 12] = [
        Self::QrCode,
        Self::Ean8,
        Self::Ean13,
        Self::UpcA,
        Self::UpcE,
        Self::Code39,
        Self::Code93,
        Self::Code128,
        Self::Pdf417,
        Self::Aztec,
        Self::Itf,
        Self::DataMatrix,
    ];

    /// Canonical upper-case name, e.g. `"QR_CODE"`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QrCode => "QR_CODE",
            Self::Ean8 => "EAN_8",
            Self::Ean13 => "EAN_13",
            Self::UpcA => "UPC_A",
            Self::UpcE => "UPC_E",
            Self::Code39 => "CODE_39",
            Self::Code93 => "CODE_93",
            Self::Code128 => "CODE_128",
            Self::Pdf417 => "PDF_417",
            Self::Aztec => "AZTEC",
            Self::Itf => "ITF",
            Self::DataMatrix => "DATA_MATRIX",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether this is a two-dimensional symbology.
    pub const fn is_2d(self) -> bool {
        matches!(
            self,
            Self::QrCode | Self::Pdf417 | Self::Aztec | Self::DataMatrix
        )
    }
}

impl fmt::Display for BarcodeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BarcodeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if upper == "UNKNOWN" {
            return Ok(Self::Unknown);
        }
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == upper)
            .ok_or_else(|| format!("unknown barcode format: {}", s))
    }
}
