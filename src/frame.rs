//! Frame container.
//!
//! - `Frame`: RGB pixels of one captured image. Owned by the loop iteration
//!   that read it and dropped after it has been displayed.
//! - `RegionView`: borrowed view of the part of a frame that lies inside a
//!   lane zone. Detector backends receive a crop built from this view, so
//!   every box they return is region-local.

use anyhow::{anyhow, Result};
use image::{imageops, RgbImage};
use std::time::Instant;

use crate::region::Region;

pub struct Frame {
    image: RgbImage,
    /// Position of this frame in the stream (1-based, never reset by rewind).
    pub sequence: u64,
    captured_at: Instant,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self {
            image,
            sequence,
            captured_at: Instant::now(),
        }
    }

    /// Wrap packed RGB24 bytes.
    pub fn from_rgb(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        let actual = pixels.len();
        let image = RgbImage::from_raw(width, height, pixels).ok_or_else(|| {
            anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                actual
            )
        })?;
        Ok(Self::new(image, sequence))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbImage {
        self.image
    }

    /// Scale to `width` x `height` (no-op when the size already matches).
    pub fn resized(self, width: u32, height: u32) -> Self {
        if self.width() == width && self.height() == height {
            return self;
        }
        let image = imageops::resize(&self.image, width, height, imageops::FilterType::Triangle);
        Self {
            image,
            sequence: self.sequence,
            captured_at: self.captured_at,
        }
    }

    /// View of the part of `region` that lies inside this frame.
    pub fn region_view(&self, region: &Region) -> Option<RegionView<'_>> {
        let area = region.clamped(self.width(), self.height())?;
        Some(RegionView { frame: self, area })
    }
}

pub struct RegionView<'a> {
    frame: &'a Frame,
    area: Region,
}

impl<'a> RegionView<'a> {
    /// Frame coordinates of the view's top-left pixel.
    pub fn origin(&self) -> (i32, i32) {
        self.area.origin()
    }

    pub fn width(&self) -> u32 {
        self.area.width()
    }

    pub fn height(&self) -> u32 {
        self.area.height()
    }

    /// Copy the view's pixels into a standalone image.
    pub fn to_image(&self) -> RgbImage {
        imageops::crop_imm(
            &self.frame.image,
            self.area.left as u32,
            self.area.top as u32,
            self.width(),
            self.height(),
        )
        .to_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 0])
        });
        Frame::new(image, 1)
    }

    #[test]
    fn from_rgb_rejects_short_buffers() {
        assert!(Frame::from_rgb(vec![0u8; 10], 4, 4, 1).is_err());
        let frame = Frame::from_rgb(vec![0u8; 4 * 4 * 3], 4, 4, 7).unwrap();
        assert_eq!(frame.width(), 4);
        assert_eq!(frame.sequence, 7);
    }

    #[test]
    fn region_view_crops_region_local_pixels() {
        let frame = gradient_frame(1280, 720);
        let region = Region {
            left: 0,
            top: 200,
            right: 1280,
            bottom: 650,
        };
        let view = frame.region_view(&region).unwrap();
        assert_eq!(view.origin(), (0, 200));

        let crop = view.to_image();
        assert_eq!(crop.dimensions(), (1280, 450));
        // Region-local (10, 0) is frame-global (10, 200).
        assert_eq!(crop.get_pixel(10, 0), frame.image().get_pixel(10, 200));
        assert_eq!(crop.get_pixel(10, 0).0[1], 200);
    }

    #[test]
    fn region_outside_frame_has_no_view() {
        let frame = gradient_frame(320, 180);
        let region = Region {
            left: 0,
            top: 200,
            right: 320,
            bottom: 650,
        };
        assert!(frame.region_view(&region).is_none());
    }

    #[test]
    fn resize_keeps_sequence() {
        let frame = gradient_frame(640, 360).resized(1280, 720);
        assert_eq!((frame.width(), frame.height()), (1280, 720));
        assert_eq!(frame.sequence, 1);
    }
}
