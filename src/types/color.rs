//! RGBA colors parsed from hex strings or well-known names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An 8-bit-per-channel RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const WHITE: Color = Color::rgb(0xFF, 0xFF, 0xFF);

    /// Create an opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    /// Channels in RGBA order, ready for an `image::Rgba` pixel.
    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    fn from_name(name: &str) -> Option<Self> {
        let color = match name.to_ascii_lowercase().as_str() {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "red" => Self::rgb(0xFF, 0x00, 0x00),
            "green" => Self::rgb(0x00, 0xFF, 0x00),
            "blue" => Self::rgb(0x00, 0x00, 0xFF),
            "yellow" => Self::rgb(0xFF, 0xFF, 0x00),
            "cyan" | "aqua" => Self::rgb(0x00, 0xFF, 0xFF),
            "magenta" | "fuchsia" => Self::rgb(0xFF, 0x00, 0xFF),
            "gray" | "grey" => Self::rgb(0x88, 0x88, 0x88),
            "lightgray" | "lightgrey" => Self::rgb(0xCC, 0xCC, 0xCC),
            "darkgray" | "darkgrey" => Self::rgb(0x44, 0x44, 0x44),
            "lime" => Self::rgb(0x00, 0xFF, 0x00),
            "maroon" => Self::rgb(0x80, 0x00, 0x00),
            "navy" => Self::rgb(0x00, 0x00, 0x80),
            "olive" => Self::rgb(0x80, 0x80, 0x00),
            "purple" => Self::rgb(0x80, 0x00, 0x80),
            "silver" => Self::rgb(0xC0, 0xC0, 0xC0),
            "teal" => Self::rgb(0x00, 0x80, 0x80),
            _ => return None,
        };
        Some(color)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 0xFF {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02X}{:02X}{:02X}{:02X}", self.a, self.r, self.g, self.b)
        }
    }
}

/// Error type for color parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized color: '{0}'")]
pub struct ColorError(pub String);

impl FromStr for Color {
    type Err = ColorError;

    /// Accepts `#RRGGBB`, `#AARRGGBB` or a color name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let Some(hex) = trimmed.strip_prefix('#') else {
            return Self::from_name(trimmed).ok_or_else(|| ColorError(s.to_string()));
        };

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError(s.to_string()));
        }
        let value = u32::from_str_radix(hex, 16).map_err(|_| ColorError(s.to_string()))?;
        let [b3, b2, b1, b0] = value.to_be_bytes();

        match hex.len() {
            6 => Ok(Self::rgb(b2, b1, b0)),
            8 => Ok(Self {
                a: b3,
                r: b2,
                g: b1,
                b: b0,
            }),
            _ => Err(ColorError(s.to_string())),
        }
    }
}

impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
