// Export gate: what the host receives after every stroke end, undo and clear.
//
// Exporting always recomposites synchronously before encoding, so the PNG
// reflects the stroke history exactly as it is at the moment of the call.
// An empty history exports as `AnnotationResult::Unannotated` rather than
// as a copy of the base image.

use std::io::Cursor;

use image::ImageFormat;

use crate::compositor::composite_into;
use crate::error::Error;
use crate::gamma::GammaLut;
use crate::strokes::StrokeHistory;
use crate::types::FrameBuffer;

/// The only output encoding.
pub const PNG_MIME: &str = "image/png";

/// Base image with all strokes burned in, PNG encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlattenedImage {
    bytes: Vec<u8>,
}

impl FlattenedImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
    pub fn mime(&self) -> &'static str {
        PNG_MIME
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationResult {
    Annotated(FlattenedImage),
    /// No strokes: the host should use the base image unmodified.
    Unannotated,
}

impl AnnotationResult {
    pub fn is_annotated(&self) -> bool {
        matches!(self, AnnotationResult::Annotated(_))
    }
}

/// Receives every export. Closures work directly.
pub trait AnnotationSink {
    fn on_annotation_change(&mut self, result: AnnotationResult);
}

impl<F: FnMut(AnnotationResult)> AnnotationSink for F {
    fn on_annotation_change(&mut self, result: AnnotationResult) {
        self(result)
    }
}

/// Collects results in order.
impl AnnotationSink for Vec<AnnotationResult> {
    fn on_annotation_change(&mut self, result: AnnotationResult) {
        self.push(result);
    }
}

pub fn encode_png(fb: &FrameBuffer) -> Result<Vec<u8>, Error> {
    let mut out = Cursor::new(Vec::new());
    fb.to_rgba_image()?
        .write_to(&mut out, ImageFormat::Png)
        .map_err(Error::Encode)?;
    Ok(out.into_inner())
}

/// Recomposite `base` + `history` into `buffer`, then encode it.
///
/// `buffer` is left holding the fresh composite so the caller can keep
/// displaying it. With an empty history nothing is encoded.
pub fn export_into(
    buffer: &mut FrameBuffer,
    base: &FrameBuffer,
    history: &StrokeHistory,
    lut: &GammaLut,
) -> Result<AnnotationResult, Error> {
    composite_into(buffer, base, history, lut);
    if history.is_empty() {
        return Ok(AnnotationResult::Unannotated);
    }
    let bytes = encode_png(buffer)?;
    Ok(AnnotationResult::Annotated(FlattenedImage { bytes }))
}

/// Stateless export.
pub fn export(base: &FrameBuffer, history: &StrokeHistory, lut: &GammaLut) -> Result<AnnotationResult, Error> {
    let mut scratch = FrameBuffer::default();
    export_into(&mut scratch, base, history, lut)
}
