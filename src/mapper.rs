// Display-space to raster-space coordinate mapping.
//
// The host shows the composite stretched to whatever size its layout picks, so
// pointer positions arrive in display (client) space. Each event is mapped on
// its own with the surface rectangle current at that moment; nothing here is
// cached, because the window can be resized between two events.

use crate::types::Point;

/// A position in client (display) space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClientPoint {
    pub x: f32,
    pub y: f32,
}

impl ClientPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// On-screen bounding rectangle of the drawing surface, in client space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SurfaceRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }

    /// Surface anchored at the client origin.
    pub const fn sized(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }
}

/// Raw input at the host boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum PointerEvent {
    Mouse(ClientPoint),
    /// Every active touch; only the first one draws.
    Touch(Vec<ClientPoint>),
}

impl PointerEvent {
    /// Collapse either variant to the single position that drives drawing.
    pub fn client_position(&self) -> Option<ClientPoint> {
        match self {
            PointerEvent::Mouse(p) => Some(*p),
            PointerEvent::Touch(touches) => touches.first().copied(),
        }
    }
}

/// Map a client-space position into the raster's intrinsic pixel space.
///
/// Returns `None` while the surface is unsized (either intrinsic or displayed
/// extent is zero). Positions outside the rectangle are not clamped; the
/// compositor clips.
pub fn to_raster(
    client: ClientPoint,
    intrinsic: (usize, usize),
    rect: SurfaceRect,
) -> Option<Point> {
    let (iw, ih) = intrinsic;
    if iw == 0 || ih == 0 {
        return None;
    }
    if !(rect.width > 0.0 && rect.height > 0.0) {
        return None;
    }
    let sx = iw as f32 / rect.width;
    let sy = ih as f32 / rect.height;
    Some(Point::new((client.x - rect.left) * sx, (client.y - rect.top) * sy))
}

/// Normalize and map in one step.
pub fn map_event(event: &PointerEvent, intrinsic: (usize, usize), rect: SurfaceRect) -> Option<Point> {
    to_raster(event.client_position()?, intrinsic, rect)
}
