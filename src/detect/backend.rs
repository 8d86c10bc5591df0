use anyhow::Result;
use image::RgbImage;

use crate::detect::result::RawDetection;

/// Object-detection backend.
///
/// `detect` receives the pixels to inspect (usually a lane-zone crop) and
/// returns boxes in the coordinate space of that image. Mapping them back
/// into the frame is the caller's job; see [`crate::detect::detect_in_region`].
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on an image.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<RawDetection>> {
        (**self).detect(image)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
