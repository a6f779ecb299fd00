// Software compositor: base image + every stroke, oldest first.
// Each stroke is rasterized into a coverage Mask (union of round-capped
// segments, so joins and caps come out round) and then blended once, which
// keeps overlapping segments of the same stroke from double-darkening.
use crate::gamma::GammaLut;
use crate::strokes::{Stroke, StrokeHistory};
use crate::types::{FrameBuffer, Mask, Point, Rgb};

/// Full redraw of `dst` from `base` and `history`. `dst` is resized to the base.
pub fn composite_into(dst: &mut FrameBuffer, base: &FrameBuffer, history: &StrokeHistory, lut: &GammaLut) {
    dst.copy_from(base);
    for stroke in history.strokes() {
        if let Some(mask) = stroke_mask(stroke, dst.width, dst.height) {
            blend_mask(dst, &mask, stroke.color(), lut);
        }
    }
}

/// Allocating variant of [`composite_into`].
pub fn composite(base: &FrameBuffer, history: &StrokeHistory, lut: &GammaLut) -> FrameBuffer {
    let mut out = FrameBuffer::default();
    composite_into(&mut out, base, history, lut);
    out
}

/// Coverage of one stroke over a `width` x `height` raster, clipped to it.
/// `None` when the stroke lies entirely outside the raster.
///
/// A stroke with a single point covers a disc of diameter `stroke.width()`.
pub fn stroke_mask(stroke: &Stroke, width: usize, height: usize) -> Option<Mask> {
    let points = stroke.points();
    let first = *points.first()?;
    let r = stroke.width() * 0.5;

    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    let (x0, x1) = clip_span(min_x - r - 1.0, max_x + r + 1.0, width)?;
    let (y0, y1) = clip_span(min_y - r - 1.0, max_y + r + 1.0, height)?;

    let mut mask = Mask::new(x0, y0, x1 - x0, y1 - y0);
    if points.len() == 1 {
        dab_segment(&mut mask, first, first, r);
    } else {
        for seg in points.windows(2) {
            dab_segment(&mut mask, seg[0], seg[1], r);
        }
    }
    Some(mask)
}

/// Half-open pixel range `[lo, hi)` of `[a, b]` inside `0..limit`.
fn clip_span(a: f32, b: f32, limit: usize) -> Option<(usize, usize)> {
    let lo = a.floor().max(0.0);
    let hi = b.ceil().min(limit as f32);
    if !(lo < hi) {
        return None;
    }
    Some((lo as usize, hi as usize))
}

/// Distance from `p` to the segment `a..b` (a point when `a == b`).
fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len2 = dx * dx + dy * dy;
    let t = if len2 > 0.0 {
        (((p.x - a.x) * dx + (p.y - a.y) * dy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (cx, cy) = (a.x + dx * t, a.y + dy * t);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

/// Max one capsule (segment swept by a disc of radius `r`) into the mask.
/// Edge pixels get fractional coverage over a one-pixel ramp.
fn dab_segment(mask: &mut Mask, a: Point, b: Point, r: f32) {
    let reach = r + 1.0;
    let lo_x = (a.x.min(b.x) - reach).floor().max(mask.x0 as f32) as usize;
    let lo_y = (a.y.min(b.y) - reach).floor().max(mask.y0 as f32) as usize;
    let hi_x = ((a.x.max(b.x) + reach).ceil() as usize).min(mask.x0 + mask.width);
    let hi_y = ((a.y.max(b.y) + reach).ceil() as usize).min(mask.y0 + mask.height);

    for y in lo_y..hi_y {
        for x in lo_x..hi_x {
            let center = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            let cover = (r + 0.5 - distance_to_segment(center, a, b)).clamp(0.0, 1.0);
            if cover <= 0.0 {
                continue;
            }
            let idx = (y - mask.y0) * mask.width + (x - mask.x0);
            if cover > mask.alpha[idx] {
                mask.alpha[idx] = cover;
            }
        }
    }
}

/// Blend `color` into `fb` wherever the mask has coverage.
pub fn blend_mask(fb: &mut FrameBuffer, mask: &Mask, color: Rgb, lut: &GammaLut) {
    for my in 0..mask.height {
        let y = mask.y0 + my;
        if y >= fb.height {
            break;
        }
        for mx in 0..mask.width {
            let x = mask.x0 + mx;
            if x >= fb.width {
                break;
            }
            let a = mask.alpha[my * mask.width + mx];
            if a <= 0.0 {
                continue;
            }
            let idx = y * fb.width + x;
            fb.pixels[idx] = lut.blend_over(fb.pixels[idx], color, a);
        }
    }
}
