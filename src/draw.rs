// Window + software overlay drawing for the desktop host.
// 1) A resizable window that shows the composite stretched to its current size.
// 2) Mouse/key polling, turned into pointer actions for the session.
// 3) A crosshair and a tiny 5x7 bitmap-font HUD, drawn on a display copy only.

use crate::error::Error;
use crate::mapper::{ClientPoint, PointerEvent, SurfaceRect};
use crate::session::PointerAction;
use crate::types::FrameBuffer;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, ScaleMode, Window, WindowOptions};

const PALETTE_KEYS: [Key; 9] = [
    Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5,
    Key::Key6, Key::Key7, Key::Key8, Key::Key9,
];

pub struct Drawer {
    window: Window,
}

impl Drawer {
    /// Open a window of the given *display* size. Buffers of any size are
    /// stretched to fill it.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self, Error> {
        let options = WindowOptions {
            resize: true,
            scale_mode: ScaleMode::Stretch,
            ..WindowOptions::default()
        };
        let mut window = Window::new(title, width, height, options)
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self { window })
    }

    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<(), Error> {
        self.window
            .update_with_buffer(&framebuffer.pixels, framebuffer.width, framebuffer.height)
            .map_err(|e| Error::WindowUpdate(e.to_string()))
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Where the buffer is shown right now, in window pixels. Queried every frame.
    pub fn surface_rect(&self) -> SurfaceRect {
        let (w, h) = self.window.get_size();
        SurfaceRect::sized(w as f32, h as f32)
    }

    /// Cursor in window pixels; `None` while it is outside the window.
    pub fn pointer_position(&self) -> Option<ClientPoint> {
        self.window
            .get_unscaled_mouse_pos(MouseMode::Discard)
            .map(|(x, y)| ClientPoint::new(x, y))
    }

    pub fn left_mouse_down(&self) -> bool {
        self.window.get_mouse_down(MouseButton::Left)
    }

    /// `1`..`9` select palette entries 0..8.
    pub fn palette_key_pressed(&self) -> Option<usize> {
        PALETTE_KEYS
            .iter()
            .position(|&key| self.window.is_key_pressed(key, KeyRepeat::No))
    }

    /// `[` shrinks, `]` grows.
    pub fn brush_step(&self) -> isize {
        let mut step = 0;
        if self.window.is_key_pressed(Key::LeftBracket, KeyRepeat::No) { step -= 1; }
        if self.window.is_key_pressed(Key::RightBracket, KeyRepeat::No) { step += 1; }
        step
    }

    /// `U`, or `Ctrl+Z`.
    pub fn undo_pressed(&self) -> bool {
        let ctrl = self.window.is_key_down(Key::LeftCtrl) || self.window.is_key_down(Key::RightCtrl);
        self.window.is_key_pressed(Key::U, KeyRepeat::No)
            || (ctrl && self.window.is_key_pressed(Key::Z, KeyRepeat::No))
    }

    pub fn clear_pressed(&self) -> bool {
        self.window.is_key_pressed(Key::C, KeyRepeat::No)
    }
}

/* ---------- Mouse polling -> pointer actions ---------- */

#[derive(Copy, Clone, Debug, PartialEq)]
enum Track {
    Released,
    Drawing { last: ClientPoint },
    /// Button held, but the press started (or the cursor ended up) outside.
    /// Nothing is drawn until the button is released.
    HeldOutside,
}

/// Edge-detects the polled mouse state the way DOM pointer events would arrive.
pub struct MouseTracker {
    track: Track,
}

impl Default for MouseTracker {
    fn default() -> Self {
        Self { track: Track::Released }
    }
}

impl MouseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame of mouse state. Repeated identical positions yield no move.
    pub fn poll(&mut self, down: bool, position: Option<ClientPoint>) -> Option<PointerAction> {
        let (next, action) = match (self.track, down, position) {
            (Track::Released, true, Some(p)) => {
                (Track::Drawing { last: p }, Some(PointerAction::Down(PointerEvent::Mouse(p))))
            }
            (Track::Released, true, None) => (Track::HeldOutside, None),
            (Track::Drawing { last }, true, Some(p)) if p == last => (self.track, None),
            (Track::Drawing { .. }, true, Some(p)) => {
                (Track::Drawing { last: p }, Some(PointerAction::Move(PointerEvent::Mouse(p))))
            }
            (Track::Drawing { .. }, true, None) => (Track::HeldOutside, Some(PointerAction::Leave)),
            (Track::Drawing { .. }, false, _) => (Track::Released, Some(PointerAction::Up)),
            (_, false, _) => (Track::Released, None),
            (Track::HeldOutside, true, _) => (Track::HeldOutside, None),
        };
        self.track = next;
        action
    }
}

/* ---------- Software drawing: pixels, crosshair, tiny bitmap font ---------- */

#[inline]
fn put_pixel(fb: &mut FrameBuffer, x: i32, y: i32, color: u32) {
    if x < 0 || y < 0 {
        return;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= fb.width || y >= fb.height {
        return;
    }
    let idx = y * fb.width + x;
    fb.pixels[idx] = color;
}

/// `scale` x `scale` block whose top-left is (x,y).
fn fill_block(fb: &mut FrameBuffer, x: i32, y: i32, scale: i32, color: u32) {
    for dy in 0..scale {
        for dx in 0..scale {
            put_pixel(fb, x + dx, y + dy, color);
        }
    }
}

/// Bresenham line, `thickness` pixels square.
fn draw_line(fb: &mut FrameBuffer, x0: i32, y0: i32, x1: i32, y1: i32, thickness: i32, color: u32) {
    let (mut x0, mut y0) = (x0, y0);
    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let half = thickness / 2;
    loop {
        fill_block(fb, x0 - half, y0 - half, thickness, color);
        if x0 == x1 && y0 == y1 { break; }
        let e2 = 2 * err;
        if e2 >= dy { err += dy; x0 += sx; }
        if e2 <= dx { err += dx; y0 += sy; }
    }
}

/// A "+" with a gap at the center. `scale` thickens it for downscaled displays.
pub fn draw_crosshair(fb: &mut FrameBuffer, cx: i32, cy: i32, size: i32, scale: i32, color: u32) {
    let gap = 2 * scale;
    draw_line(fb, cx - size, cy, cx - gap, cy, scale, color);
    draw_line(fb, cx + gap, cy, cx + size, cy, scale, color);
    draw_line(fb, cx, cy - size, cx, cy - gap, scale, color);
    draw_line(fb, cx, cy + gap, cx, cy + size, scale, color);
    fill_block(fb, cx - scale / 2, cy - scale / 2, scale, color);
}

/// 5x7 glyph rows; the low 5 bits are pixels (bit 4 = leftmost).
/// Lowercase is drawn as uppercase; unknown characters are blank.
fn glyph5x7(ch: char) -> Option<[u8; 7]> {
    macro_rules! g { ($a:expr,$b:expr,$c:expr,$d:expr,$e:expr,$f:expr,$g:expr) => {
        Some([$a,$b,$c,$d,$e,$f,$g])
    }; }

    match ch.to_ascii_uppercase() {
        '0' => g!(0b01110,0b10001,0b10011,0b10101,0b11001,0b10001,0b01110),
        '1' => g!(0b00100,0b01100,0b00100,0b00100,0b00100,0b00100,0b01110),
        '2' => g!(0b01110,0b10001,0b00001,0b00010,0b00100,0b01000,0b11111),
        '3' => g!(0b11110,0b00001,0b00001,0b01110,0b00001,0b00001,0b11110),
        '4' => g!(0b00010,0b00110,0b01010,0b10010,0b11111,0b00010,0b00010),
        '5' => g!(0b11111,0b10000,0b11110,0b00001,0b00001,0b10001,0b01110),
        '6' => g!(0b00110,0b01000,0b10000,0b11110,0b10001,0b10001,0b01110),
        '7' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b01000,0b01000),
        '8' => g!(0b01110,0b10001,0b10001,0b01110,0b10001,0b10001,0b01110),
        '9' => g!(0b01110,0b10001,0b10001,0b01111,0b00001,0b00010,0b01100),

        'A' => g!(0b01110,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'B' => g!(0b11110,0b10001,0b10001,0b11110,0b10001,0b10001,0b11110),
        'C' => g!(0b01110,0b10001,0b10000,0b10000,0b10000,0b10001,0b01110),
        'D' => g!(0b11100,0b10010,0b10001,0b10001,0b10001,0b10010,0b11100),
        'E' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b11111),
        'F' => g!(0b11111,0b10000,0b10000,0b11110,0b10000,0b10000,0b10000),
        'G' => g!(0b01110,0b10001,0b10000,0b10111,0b10001,0b10001,0b01111),
        'H' => g!(0b10001,0b10001,0b10001,0b11111,0b10001,0b10001,0b10001),
        'I' => g!(0b01110,0b00100,0b00100,0b00100,0b00100,0b00100,0b01110),
        'J' => g!(0b00111,0b00010,0b00010,0b00010,0b00010,0b10010,0b01100),
        'K' => g!(0b10001,0b10010,0b10100,0b11000,0b10100,0b10010,0b10001),
        'L' => g!(0b10000,0b10000,0b10000,0b10000,0b10000,0b10000,0b11111),
        'M' => g!(0b10001,0b11011,0b10101,0b10101,0b10001,0b10001,0b10001),
        'N' => g!(0b10001,0b10001,0b11001,0b10101,0b10011,0b10001,0b10001),
        'O' => g!(0b01110,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'P' => g!(0b11110,0b10001,0b10001,0b11110,0b10000,0b10000,0b10000),
        'Q' => g!(0b01110,0b10001,0b10001,0b10001,0b10101,0b10010,0b01101),
        'R' => g!(0b11110,0b10001,0b10001,0b11110,0b10100,0b10010,0b10001),
        'S' => g!(0b01111,0b10000,0b10000,0b01110,0b00001,0b00001,0b11110),
        'T' => g!(0b11111,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        'U' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b10001,0b01110),
        'V' => g!(0b10001,0b10001,0b10001,0b10001,0b10001,0b01010,0b00100),
        'W' => g!(0b10001,0b10001,0b10001,0b10101,0b10101,0b10101,0b01010),
        'X' => g!(0b10001,0b10001,0b01010,0b00100,0b01010,0b10001,0b10001),
        'Y' => g!(0b10001,0b10001,0b01010,0b00100,0b00100,0b00100,0b00100),
        'Z' => g!(0b11111,0b00001,0b00010,0b00100,0b01000,0b10000,0b11111),

        ' ' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00000,0b00000),
        '|' => g!(0b00100,0b00100,0b00100,0b00100,0b00100,0b00100,0b00100),
        ':' => g!(0b00000,0b00100,0b00000,0b00000,0b00100,0b00000,0b00000),
        '.' => g!(0b00000,0b00000,0b00000,0b00000,0b00000,0b00100,0b00000),
        '-' => g!(0b00000,0b00000,0b00000,0b11111,0b00000,0b00000,0b00000),
        '#' => g!(0b01010,0b01010,0b11111,0b01010,0b11111,0b01010,0b01010),
        '[' => g!(0b01110,0b01000,0b01000,0b01000,0b01000,0b01000,0b01110),
        ']' => g!(0b01110,0b00010,0b00010,0b00010,0b00010,0b00010,0b01110),
        '+' => g!(0b00000,0b00100,0b00100,0b11111,0b00100,0b00100,0b00000),

        _ => None,
    }
}

/// One glyph with a 1-cell black shadow for contrast.
fn draw_char_5x7(fb: &mut FrameBuffer, x: i32, y: i32, scale: i32, ch: char, color: u32) {
    let Some(rows) = glyph5x7(ch) else { return };
    for (offset, ink) in [(scale, 0xFF00_0000), (0, color)] {
        for (ry, rowbits) in rows.iter().enumerate() {
            for rx in 0..5 {
                if (rowbits & (1 << (4 - rx))) != 0 {
                    let px = x + rx * scale + offset;
                    let py = y + ry as i32 * scale + offset;
                    fill_block(fb, px, py, scale, ink);
                }
            }
        }
    }
}

/// Text in 5x7 glyphs with one cell of spacing; each cell is `scale` pixels.
pub fn draw_text_5x7(fb: &mut FrameBuffer, mut x: i32, y: i32, scale: i32, text: &str, color: u32) {
    for ch in text.chars() {
        draw_char_5x7(fb, x, y, scale, ch, color);
        x += 6 * scale;
    }
}
