//! Color Parsing and Blending Utilities
//!
//! Colors enter the app as `#rrggbb` strings from the control surface and are
//! kept as 8-bit sRGB. Blending happens directly in gamma space, which is what
//! a 2D canvas does.

use std::fmt;
use std::str::FromStr;

use image::Rgba;

use crate::error::ControlError;

/// An opaque 8-bit sRGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (case-insensitive). The short `#rgb` form is accepted too,
    /// since some color pickers emit it.
    pub fn from_hex(hex: &str) -> Result<Self, ControlError> {
        let invalid = || ControlError::InvalidColor(hex.to_owned());
        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if !digits.is_ascii() {
            return Err(invalid());
        }

        match digits.len() {
            6 => {
                let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).map_err(|_| invalid());
                Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
            }
            3 => {
                let channel = |i: usize| {
                    u8::from_str_radix(&digits[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|_| invalid())
                };
                Ok(Self::new(channel(0)?, channel(1)?, channel(2)?))
            }
            _ => Err(invalid()),
        }
    }

    /// Lowercase `#rrggbb`
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Linear interpolation between two colors, `t` clamped to 0.0-1.0
    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl FromStr for Rgb {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Composite `src` over `dst` with the given source alpha (0.0-1.0).
///
/// Straight (non-premultiplied) alpha on both sides, matching how RGBA8
/// canvas pixels are stored.
#[inline]
pub fn blend_over(dst: &mut Rgba<u8>, src: Rgb, alpha: f32) {
    let sa = alpha.clamp(0.0, 1.0);
    if sa <= 0.0 {
        return;
    }

    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        *dst = Rgba([0, 0, 0, 0]);
        return;
    }

    let mix = |s: u8, d: u8| {
        let v = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        v.round().clamp(0.0, 255.0) as u8
    };
    *dst = Rgba([
        mix(src.r, dst[0]),
        mix(src.g, dst[1]),
        mix(src.b, dst[2]),
        (out_a * 255.0).round() as u8,
    ]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(Rgb::from_hex("#ff0000").unwrap(), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_hex("#A302DE").unwrap(), Rgb::new(163, 2, 222));
        assert_eq!(Rgb::from_hex("#fff").unwrap(), Rgb::WHITE);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Rgb::from_hex("ff0000").is_err());
        assert!(Rgb::from_hex("#ff00").is_err());
        assert!(Rgb::from_hex("#gg0000").is_err());
        assert!(Rgb::from_hex("#ffé000").is_err());
    }

    #[test]
    fn test_hex_is_lowercase() {
        assert_eq!(Rgb::new(244, 243, 239).to_hex(), "#f4f3ef");
    }

    #[test]
    fn test_lerp_endpoints() {
        let red = Rgb::new(255, 0, 0);
        assert_eq!(red.lerp(Rgb::WHITE, 0.0), red);
        assert_eq!(red.lerp(Rgb::WHITE, 1.0), Rgb::WHITE);
        assert_eq!(red.lerp(Rgb::WHITE, 0.5), Rgb::new(255, 128, 128));
    }

    #[test]
    fn test_blend_opaque_replaces() {
        let mut px = Rgba([255, 255, 255, 255]);
        blend_over(&mut px, Rgb::new(10, 20, 30), 1.0);
        assert_eq!(px, Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_blend_half_alpha_on_white() {
        let mut px = Rgba([255, 255, 255, 255]);
        blend_over(&mut px, Rgb::BLACK, 0.5);
        // Result stays opaque, channels land halfway
        assert_eq!(px[3], 255);
        assert!((px[0] as i32 - 128).abs() <= 1);
    }

    #[test]
    fn test_blend_onto_transparent_keeps_source_color() {
        let mut px = Rgba([0, 0, 0, 0]);
        blend_over(&mut px, Rgb::new(200, 100, 50), 0.25);
        assert_eq!(&px.0[..3], &[200, 100, 50]);
        assert_eq!(px[3], 64);
    }
}
