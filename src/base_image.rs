// The photo being annotated: encoded bytes, their MIME tag, and the decoded raster.

use std::path::Path;

use image::{ImageFormat, RgbaImage};

use crate::error::Error;
use crate::export::{encode_png, PNG_MIME};
use crate::types::FrameBuffer;

/// Immutable for the lifetime of an annotation session.
#[derive(Clone, Debug)]
pub struct BaseImage {
    bytes: Vec<u8>,
    mime: String,
    raster: FrameBuffer,
}

impl BaseImage {
    /// Decode `bytes` using the format named by `mime` (e.g. `"image/jpeg"`).
    pub fn decode(bytes: Vec<u8>, mime: &str) -> Result<Self, Error> {
        let format = ImageFormat::from_mime_type(mime)
            .ok_or_else(|| Error::UnsupportedMime(mime.to_owned()))?;
        let decoded = image::load_from_memory_with_format(&bytes, format).map_err(Error::Decode)?;
        let raster = raster_of(&decoded.to_rgba8())?;
        Ok(Self { bytes, mime: mime.to_owned(), raster })
    }

    /// Sniff the format from the leading bytes and derive the MIME tag from it.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Error> {
        let format = image::guess_format(&bytes).map_err(Error::Decode)?;
        let mime = format.to_mime_type();
        Self::decode(bytes, mime)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| Error::Read { path: path.to_owned(), source })?;
        log::debug!("read {} bytes from {}", bytes.len(), path.display());
        Self::from_bytes(bytes)
    }

    /// Wrap an already-decoded raster, keeping a PNG encoding of it as the bytes.
    pub fn from_rgba(img: &RgbaImage) -> Result<Self, Error> {
        let raster = raster_of(img)?;
        let bytes = encode_png(&raster)?;
        Ok(Self { bytes, mime: PNG_MIME.to_owned(), raster })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
    pub fn mime(&self) -> &str {
        &self.mime
    }
    pub fn raster(&self) -> &FrameBuffer {
        &self.raster
    }
    /// Intrinsic `(width, height)` in pixels.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.raster.width, self.raster.height)
    }
}

fn raster_of(img: &RgbaImage) -> Result<FrameBuffer, Error> {
    if img.width() == 0 || img.height() == 0 {
        return Err(Error::EmptyImage);
    }
    Ok(FrameBuffer::from_rgba(img))
}
