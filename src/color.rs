//! Tint colors and the per-pixel recoloring rule.
//!
//! Stamps are usually dark ink on a white or transparent background. Tinting
//! recolors the ink while keeping its relative darkness, and leaves
//! near-white pixels (paper, page numbers inside a stamp) untouched.

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::NEAR_WHITE_THRESHOLD;

/// An opaque RGB tint, written as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TintColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl TintColor {
    /// The "no tint" color. Annotations tinted with it render unmodified.
    pub const DEFAULT: TintColor = TintColor::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Whether this is the default color, which means "no tint".
    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }

    /// Hex representation (`#RRGGBB`, uppercase).
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for TintColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Error returned when a color string is not `#RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}', expected #RRGGBB")]
pub struct ParseColorError(String);

impl FromStr for TintColor {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().strip_prefix('#').unwrap_or(s.trim());
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseColorError(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ParseColorError(s.to_string()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for TintColor {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TintColor> for String {
    fn from(color: TintColor) -> Self {
        color.to_hex()
    }
}

/// Returns the tint to actually apply, treating `None` and the default color alike.
pub fn effective_tint(tint: Option<TintColor>) -> Option<TintColor> {
    tint.filter(|t| !t.is_default())
}

/// Recolor a single pixel.
///
/// Transparent and near-white pixels are returned unchanged. Other pixels
/// take the tint color scaled by `1 - 0.5 * darkness`, where darkness is
/// `1 - mean(R, G, B) / 255`. Alpha is preserved.
pub fn tint_pixel(pixel: Rgba<u8>, tint: TintColor) -> Rgba<u8> {
    let [r, g, b, a] = pixel.0;
    if a == 0 {
        return pixel;
    }
    if r > NEAR_WHITE_THRESHOLD && g > NEAR_WHITE_THRESHOLD && b > NEAR_WHITE_THRESHOLD {
        return pixel;
    }

    let mean = (r as f32 + g as f32 + b as f32) / 3.0;
    let darkness = 1.0 - mean / 255.0;
    let factor = 1.0 - 0.5 * darkness;
    let scale = |channel: u8| (channel as f32 * factor).round().clamp(0.0, 255.0) as u8;

    Rgba([scale(tint.r), scale(tint.g), scale(tint.b), a])
}

/// Apply [`tint_pixel`] to every pixel of an image in place.
pub fn apply_tint(image: &mut RgbaImage, tint: TintColor) {
    for pixel in image.pixels_mut() {
        *pixel = tint_pixel(*pixel, tint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: TintColor = TintColor::new(255, 0, 0);

    #[test]
    fn test_parse_hex() {
        assert_eq!("#FF0000".parse::<TintColor>().unwrap(), RED);
        assert_eq!("#00ff7f".parse::<TintColor>().unwrap(), TintColor::new(0, 255, 127));
        assert_eq!("0000FF".parse::<TintColor>().unwrap(), TintColor::new(0, 0, 255));
        assert!("#FFF".parse::<TintColor>().is_err());
        assert!("#GG0000".parse::<TintColor>().is_err());
        assert!("".parse::<TintColor>().is_err());
    }

    #[test]
    fn test_hex_roundtrip_uppercase() {
        let color: TintColor = "#1a2b3c".parse().unwrap();
        assert_eq!(color.to_hex(), "#1A2B3C");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&RED).unwrap();
        assert_eq!(json, "\"#FF0000\"");
        let parsed: TintColor = serde_json::from_str("\"#ff0000\"").unwrap();
        assert_eq!(parsed, RED);
        assert!(serde_json::from_str::<TintColor>("\"red\"").is_err());
    }

    #[test]
    fn test_black_pixel_blends_toward_tint() {
        let out = tint_pixel(Rgba([0, 0, 0, 255]), RED);
        assert_eq!(out, Rgba([128, 0, 0, 255]));
        assert_ne!(out, Rgba([0, 0, 0, 255]));
        assert_ne!(out, Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_white_pixel_unchanged() {
        let white = Rgba([255, 255, 255, 255]);
        assert_eq!(tint_pixel(white, RED), white);
        let near_white = Rgba([241, 250, 245, 255]);
        assert_eq!(tint_pixel(near_white, RED), near_white);
    }

    #[test]
    fn test_transparent_pixel_unchanged() {
        let clear = Rgba([10, 20, 30, 0]);
        assert_eq!(tint_pixel(clear, RED), clear);
    }

    #[test]
    fn test_alpha_preserved() {
        let out = tint_pixel(Rgba([100, 100, 100, 77]), TintColor::new(0, 0, 200));
        assert_eq!(out[3], 77);
        assert_eq!(out[0], 0);
        assert!(out[2] > 100);
    }

    #[test]
    fn test_effective_tint() {
        assert_eq!(effective_tint(None), None);
        assert_eq!(effective_tint(Some(TintColor::DEFAULT)), None);
        assert_eq!(effective_tint(Some(RED)), Some(RED));
    }
}
