// Freehand annotation over a photo: strokes in, flattened PNG out.
//
// Modules, leaves first:
// • types       : Point, Rgb, packed-ARGB FrameBuffer and coverage Mask
// • error       : the crate-wide Error
// • gamma       : sRGB <-> linear tables and source-over blending
// • base_image  : the decoded photo plus its original bytes and MIME tag
// • config      : palette, brush sizes and window bounds from TOML
// • mapper      : pointer position in display space -> raster pixel space
// • strokes     : append-only stroke history with undo/clear
// • compositor  : base image + strokes -> FrameBuffer (full redraw)
// • export      : forced recomposite -> PNG, or "no annotation"
// • session     : pointer state machine that owns all of the above
// • draw        : minifb window + HUD used by the desktop binary
// • camera      : webcam snapshot as a base image (feature "camera")

pub mod base_image;
#[cfg(feature = "camera")]
pub mod camera;
pub mod compositor;
pub mod config;
pub mod draw;
pub mod error;
pub mod export;
pub mod gamma;
pub mod mapper;
pub mod session;
pub mod strokes;
pub mod types;

pub use base_image::BaseImage;
pub use config::Config;
pub use error::Error;
pub use export::{AnnotationResult, AnnotationSink, FlattenedImage};
pub use mapper::{ClientPoint, PointerEvent, SurfaceRect};
pub use session::{AnnotationSession, InputState, PointerAction, SessionState};
pub use strokes::{Stroke, StrokeHistory};
pub use types::{FrameBuffer, Point, Rgb};
