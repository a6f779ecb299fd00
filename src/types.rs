// Core value types shared by the mapper, stroke model and compositor.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A position in raster-intrinsic pixel space (never display space).
/// Pixel `(i, j)` covers `[i, i+1) x [j, j+1)`, so its center is at `+0.5`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Opaque stroke color.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Fully opaque `0xAARRGGBB`.
    #[inline]
    pub fn to_argb(self) -> u32 {
        pack_argb(0xFF, self.r, self.g, self.b)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("color must start with '#'")]
    MissingHash,
    #[error("color must have 3 or 6 hex digits, got {0}")]
    BadLength(usize),
    #[error("invalid hex digit in color")]
    BadDigit,
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    /// Accepts `#rrggbb` and the short `#rgb` form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().strip_prefix('#').ok_or(ColorParseError::MissingHash)?;
        if !hex.is_ascii() {
            return Err(ColorParseError::BadDigit);
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| ColorParseError::BadDigit);
        match hex.len() {
            6 => Ok(Self::new(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                // "#abc" == "#aabbcc"
                let short = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
                Ok(Self::new(short(0)?, short(1)?, short(2)?))
            }
            n => Err(ColorParseError::BadLength(n)),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[inline]
pub fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Returns `[a, r, g, b]`.
#[inline]
pub fn unpack_argb(px: u32) -> [u8; 4] {
    [(px >> 24) as u8, (px >> 16) as u8, (px >> 8) as u8, px as u8]
}

/// A raster the size of the base image. Each entry is `0xAARRGGBB`;
/// minifb ignores the alpha byte when presenting.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl FrameBuffer {
    /// Transparent black buffer.
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height, pixels: vec![0u32; width * height] }
    }

    /// True for the 0x0 buffer held before any base image is loaded.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }

    /// Overwrite this buffer with `src`, reusing the allocation when sizes match.
    pub fn copy_from(&mut self, src: &FrameBuffer) {
        self.width = src.width;
        self.height = src.height;
        self.pixels.clear();
        self.pixels.extend_from_slice(&src.pixels);
    }

    pub fn from_rgba(img: &RgbaImage) -> Self {
        let (w, h) = img.dimensions();
        let pixels = img
            .pixels()
            .map(|p| pack_argb(p[3], p[0], p[1], p[2]))
            .collect();
        Self { width: w as usize, height: h as usize, pixels }
    }

    /// Fails when `pixels` does not hold exactly `width * height` entries.
    pub fn to_rgba_image(&self) -> Result<RgbaImage, Error> {
        let mismatch = || Error::FrameSize {
            width: self.width,
            height: self.height,
            len: self.pixels.len(),
        };
        let (Ok(w), Ok(h)) = (u32::try_from(self.width), u32::try_from(self.height)) else {
            return Err(mismatch());
        };
        // from_raw also accepts an oversized buffer; both directions are a mismatch.
        if self.width.checked_mul(self.height) != Some(self.pixels.len()) {
            return Err(mismatch());
        }
        let mut raw = Vec::with_capacity(self.pixels.len() * 4);
        for &px in &self.pixels {
            let [a, r, g, b] = unpack_argb(px);
            raw.extend_from_slice(&[r, g, b, a]);
        }
        RgbaImage::from_raw(w, h, raw).ok_or_else(mismatch)
    }
}

/// Coverage in [0,1] over a rectangular window of a FrameBuffer.
/// One mask is built per stroke, spanning only that stroke's bounds.
pub struct Mask {
    pub x0: usize,       // left edge of the window in buffer pixels
    pub y0: usize,       // top edge of the window in buffer pixels
    pub width: usize,
    pub height: usize,
    pub alpha: Vec<f32>, // length = width * height
}

impl Mask {
    pub fn new(x0: usize, y0: usize, width: usize, height: usize) -> Self {
        Self { x0, y0, width, height, alpha: vec![0.0; width * height] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_long_and_short_hex() {
        assert_eq!("#ef4444".parse::<Rgb>(), Ok(Rgb::new(0xef, 0x44, 0x44)));
        assert_eq!("#fff".parse::<Rgb>(), Ok(Rgb::new(255, 255, 255)));
        assert_eq!(" #3B82F6 ".parse::<Rgb>(), Ok(Rgb::new(0x3b, 0x82, 0xf6)));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!("ef4444".parse::<Rgb>(), Err(ColorParseError::MissingHash));
        assert_eq!("#ef44".parse::<Rgb>(), Err(ColorParseError::BadLength(4)));
        assert_eq!("#gg0000".parse::<Rgb>(), Err(ColorParseError::BadDigit));
        assert_eq!("#é00".parse::<Rgb>(), Err(ColorParseError::BadDigit));
    }

    #[test]
    fn rgba_image_conversion_keeps_alpha() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([1, 2, 3, 4]));
        img.put_pixel(1, 0, image::Rgba([250, 251, 252, 255]));

        let fb = FrameBuffer::from_rgba(&img);
        assert_eq!(fb.pixel(0, 0), Some(0x04_01_02_03));
        assert_eq!(fb.pixel(1, 0), Some(0xFF_FA_FB_FC));
        assert_eq!(fb.to_rgba_image().expect("consistent"), img);
    }

    #[test]
    fn inconsistent_buffer_is_an_error() {
        let mut fb = FrameBuffer::new(3, 2);
        fb.pixels.pop();
        let err = fb.to_rgba_image().unwrap_err();
        assert!(matches!(err, Error::FrameSize { width: 3, height: 2, len: 5 }), "{err:?}");

        fb.pixels.extend([0, 0]);
        assert!(matches!(fb.to_rgba_image(), Err(Error::FrameSize { len: 7, .. })));
    }
}
