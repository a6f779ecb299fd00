// Crate-wide error type. Every variant states *where* things went wrong.
// Pointer handling never produces one of these: dropped events are no-ops.
use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("window init error: {0}")]
    WindowInit(String),
    #[error("window update error: {0}")]
    WindowUpdate(String),
    #[error("camera init error: {0}")]
    CameraInit(String),
    #[error("camera frame error: {0}")]
    CameraFrame(String),

    #[error("no decoder for mime type {0:?}")]
    UnsupportedMime(String),
    #[error("image decode error")]
    Decode(#[source] image::ImageError),
    #[error("base image has zero size")]
    EmptyImage,
    #[error("frame buffer is {width}x{height} but holds {len} pixels")]
    FrameSize { width: usize, height: usize, len: usize },
    #[error("png encode error")]
    Encode(#[source] image::ImageError),

    #[error("could not read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error in {}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    ConfigInvalid(String),
}
