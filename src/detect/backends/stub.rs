use anyhow::Result;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::backend::DetectorBackend;
use crate::detect::classes::{AMBULANCE_CLASS, CAR_CLASS};
use crate::detect::result::{BoundingBox, RawDetection};

const DEFAULT_SEED: u64 = 0x1a4e_5e05;
const MAX_SYNTHETIC_VEHICLES: usize = 4;

/// Stub backend for tests and `stub://` demos. Ignores pixel content.
///
/// - `scripted`: replays a fixed list of per-call detection sets, cycling.
/// - `seeded`: draws a few random vehicle boxes per call from a seeded RNG;
///   roughly one call in eight includes an ambulance.
pub struct StubBackend {
    mode: StubMode,
    calls: u64,
}

enum StubMode {
    Scripted(Vec<Vec<RawDetection>>),
    Seeded(StdRng),
}

impl StubBackend {
    pub fn new() -> Self {
        Self::seeded(DEFAULT_SEED)
    }

    pub fn scripted(script: Vec<Vec<RawDetection>>) -> Self {
        Self {
            mode: StubMode::Scripted(script),
            calls: 0,
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            mode: StubMode::Seeded(StdRng::seed_from_u64(seed)),
            calls: 0,
        }
    }

    /// Number of `detect` calls so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<RawDetection>> {
        let index = self.calls;
        self.calls += 1;

        match &mut self.mode {
            StubMode::Scripted(script) => {
                if script.is_empty() {
                    return Ok(Vec::new());
                }
                Ok(script[(index % script.len() as u64) as usize].clone())
            }
            StubMode::Seeded(rng) => Ok(synthetic_vehicles(rng, image.width(), image.height())),
        }
    }
}

fn synthetic_vehicles(rng: &mut StdRng, width: u32, height: u32) -> Vec<RawDetection> {
    if width < 8 || height < 8 {
        return Vec::new();
    }
    let count = rng.gen_range(0..=MAX_SYNTHETIC_VEHICLES);
    let with_ambulance = rng.gen_ratio(1, 8);

    let mut detections = Vec::with_capacity(count + 1);
    for i in 0..count + usize::from(with_ambulance) {
        let class_id = if i == count { AMBULANCE_CLASS } else { CAR_CLASS };
        let min_w = (width / 16).max(1);
        let box_w = rng.gen_range(min_w..=(width / 6).max(min_w));
        let min_h = (height / 8).max(1);
        let box_h = rng.gen_range(min_h..=(height / 3).max(min_h));
        let x1 = rng.gen_range(0..=width - box_w);
        let y1 = rng.gen_range(0..=height - box_h);
        detections.push(RawDetection::new(
            BoundingBox::new(
                x1 as i32,
                y1 as i32,
                (x1 + box_w) as i32,
                (y1 + box_h) as i32,
            ),
            class_id,
            rng.gen_range(0.3..0.95),
        ));
    }
    detections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_backend_cycles() {
        let a = vec![RawDetection::new(BoundingBox::new(0, 0, 5, 5), 0, 0.9)];
        let b = Vec::new();
        let mut backend = StubBackend::scripted(vec![a.clone(), b.clone()]);
        let image = RgbImage::new(16, 16);

        assert_eq!(backend.detect(&image).unwrap(), a);
        assert_eq!(backend.detect(&image).unwrap(), b);
        assert_eq!(backend.detect(&image).unwrap(), a);
        assert_eq!(backend.calls(), 3);
    }

    #[test]
    fn seeded_backend_stays_inside_image() {
        let mut backend = StubBackend::seeded(42);
        let image = RgbImage::new(1280, 450);
        for _ in 0..200 {
            for det in backend.detect(&image).unwrap() {
                assert!(det.bbox.x1 >= 0 && det.bbox.y1 >= 0);
                assert!(det.bbox.x2 <= 1280 && det.bbox.y2 <= 450);
                assert!(det.bbox.width() > 0 && det.bbox.height() > 0);
            }
        }
    }

    #[test]
    fn seeded_backend_is_deterministic() {
        let image = RgbImage::new(640, 360);
        let mut first = StubBackend::seeded(7);
        let mut second = StubBackend::seeded(7);
        for _ in 0..20 {
            assert_eq!(first.detect(&image).unwrap(), second.detect(&image).unwrap());
        }
    }

    #[test]
    fn tiny_images_yield_nothing() {
        let mut backend = StubBackend::new();
        assert!(backend.detect(&RgbImage::new(4, 4)).unwrap().is_empty());
    }
}
