// sRGB <-> linear lookup tables. Stroke edges are blended in linear light so
// anti-aliased rims do not come out darker than the stroke or the photo.

use crate::types::{pack_argb, unpack_argb, Rgb};

pub struct GammaLut {
    // sRGB(0..255) -> linear (0..1)
    srgb_to_linear: [f32; 256],
    // linear(0..1) -> sRGB(0..255), index = (linear * 4095).round()
    linear_to_srgb: [u8; 4096],
}

impl Default for GammaLut {
    fn default() -> Self {
        Self::new()
    }
}

impl GammaLut {
    /// Build both tables. Done once per session.
    pub fn new() -> Self {
        let mut s2l = [0.0f32; 256];
        for (v, slot) in s2l.iter_mut().enumerate() {
            let c = v as f32 / 255.0;
            *slot = if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) };
        }

        let mut l2s = [0u8; 4096];
        for (i, slot) in l2s.iter_mut().enumerate() {
            let l = i as f32 / 4095.0;
            let s = if l <= 0.003_130_8 { 12.92 * l } else { 1.055 * l.powf(1.0 / 2.4) - 0.055 };
            *slot = (s * 255.0).round().clamp(0.0, 255.0) as u8;
        }

        Self { srgb_to_linear: s2l, linear_to_srgb: l2s }
    }

    #[inline]
    pub fn srgb_u8_to_linear(&self, v: u8) -> f32 {
        self.srgb_to_linear[v as usize]
    }

    #[inline]
    pub fn linear_to_srgb_u8(&self, l: f32) -> u8 {
        let idx = (l.clamp(0.0, 1.0) * 4095.0).round() as usize;
        self.linear_to_srgb[idx]
    }

    /// Source-over of an opaque `color` with coverage `a` onto a straight-alpha
    /// `0xAARRGGBB` pixel. `a <= 0` leaves `dst` untouched, `a >= 1` replaces it.
    pub fn blend_over(&self, dst: u32, color: Rgb, a: f32) -> u32 {
        if a <= 0.0 {
            return dst;
        }
        if a >= 1.0 {
            return color.to_argb();
        }
        let [da, dr, dg, db] = unpack_argb(dst);
        let dst_a = da as f32 / 255.0;
        let under = dst_a * (1.0 - a);
        let out_a = a + under;

        let mix = |src: u8, dst: u8| {
            let l = (self.srgb_u8_to_linear(src) * a + self.srgb_u8_to_linear(dst) * under) / out_a;
            self.linear_to_srgb_u8(l)
        };
        let alpha = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        pack_argb(alpha, mix(color.r, dr), mix(color.g, dg), mix(color.b, db))
    }
}
