//! Camera buffer conversion to packed RGB24.
#![cfg_attr(not(feature = "ingest-v4l2"), allow(dead_code))]

use anyhow::{anyhow, Context, Result};
use image::RgbImage;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    Yuyv,
    Mjpeg,
}

impl PixelFormat {
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Result<Self> {
        match fourcc {
            b"RGB3" => Ok(Self::Rgb24),
            b"YUYV" => Ok(Self::Yuyv),
            b"MJPG" => Ok(Self::Mjpeg),
            other => Err(anyhow!(
                "unsupported camera pixel format {}",
                String::from_utf8_lossy(other)
            )),
        }
    }
}

pub(crate) fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<RgbImage> {
    match format {
        PixelFormat::Rgb24 => {
            let expected = packed_len(width, height, 3)?;
            let data = pixels.get(..expected).ok_or_else(|| {
                anyhow!(
                    "RGB frame length mismatch: expected {}, got {}",
                    expected,
                    pixels.len()
                )
            })?;
            RgbImage::from_raw(width, height, data.to_vec())
                .ok_or_else(|| anyhow!("RGB frame size mismatch"))
        }
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, width, height),
        PixelFormat::Mjpeg => {
            let image = image::load_from_memory_with_format(pixels, image::ImageFormat::Jpeg)
                .context("decode MJPG camera frame")?
                .to_rgb8();
            if image.dimensions() != (width, height) {
                log::debug!(
                    "MJPG frame is {}x{}, negotiated {}x{}",
                    image.width(),
                    image.height(),
                    width,
                    height
                );
            }
            Ok(image)
        }
    }
}

fn packed_len(width: u32, height: u32, bytes_per_pixel: usize) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(bytes_per_pixel))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

/// YUYV 4:2:2: each 4-byte group `Y0 U Y1 V` covers two pixels.
fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<RgbImage> {
    let expected = packed_len(width, height, 2)?;
    if width % 2 != 0 {
        return Err(anyhow!("YUYV frame width must be even, got {}", width));
    }
    let data = pixels.get(..expected).ok_or_else(|| {
        anyhow!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        )
    })?;

    let mut rgb = Vec::with_capacity(packed_len(width, height, 3)?);
    for group in data.chunks_exact(4) {
        let u = group[1] as f32 - 128.0;
        let v = group[3] as f32 - 128.0;
        for y in [group[0], group[2]] {
            let y = y as f32;
            rgb.push(clamp_to_u8(y + 1.402_f32 * v));
            rgb.push(clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v));
            rgb.push(clamp_to_u8(y + 1.772_f32 * u));
        }
    }
    RgbImage::from_raw(width, height, rgb).ok_or_else(|| anyhow!("YUYV frame size mismatch"))
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
