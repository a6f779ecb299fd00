// Webcam snapshot as a base image (build with `--features camera`).
// Opens the device, lets auto-exposure settle for a few frames, keeps one.

use crate::base_image::BaseImage;
use crate::error::Error;

use image::DynamicImage;
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};

/// Frames thrown away before the snapshot; the first ones are often dark.
const WARMUP_FRAMES: usize = 5;

pub struct CameraCapture {
    cam: Camera,
}

impl CameraCapture {
    /// Open camera `index`, asking for roughly `width` x `height`.
    pub fn new(index: u32, width: u32, height: u32) -> Result<Self, Error> {
        let fmt = CameraFormat::new(Resolution::new(width, height), FrameFormat::YUYV, 30);
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

        let mut cam = Camera::new(CameraIndex::Index(index), req)
            .map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;
        cam.open_stream()
            .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;

        let actual = cam.resolution();
        log::info!("camera {index} streaming at {}x{}", actual.width(), actual.height());
        Ok(Self { cam })
    }

    /// Grab one frame and wrap it as a PNG-tagged base image.
    pub fn snapshot(&mut self) -> Result<BaseImage, Error> {
        for _ in 0..WARMUP_FRAMES {
            self.cam
                .frame()
                .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;
        }
        let frame = self
            .cam
            .frame()
            .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;
        let rgb = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

        let rgba = DynamicImage::ImageRgb8(rgb).to_rgba8();
        BaseImage::from_rgba(&rgba)
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        if let Err(e) = self.cam.stop_stream() {
            log::warn!("camera stop failed: {e}");
        }
    }
}
