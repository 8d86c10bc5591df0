//! Synthetic road scene for `stub://` sources.
//!
//! A gray road with lane markings and a handful of colored blocks drifting
//! across it. Deterministic for a given seed.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROAD: Rgb<u8> = Rgb([70, 70, 74]);
const MARKING: Rgb<u8> = Rgb([230, 230, 230]);
const VEHICLES: usize = 4;

struct Vehicle {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    speed: i32,
    color: Rgb<u8>,
}

pub(crate) struct SyntheticScene {
    width: u32,
    height: u32,
    vehicles: Vec<Vehicle>,
}

impl SyntheticScene {
    pub(crate) fn new(width: u32, height: u32, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let lane_height = (height / 4).max(1);
        let vehicles = (0..VEHICLES)
            .map(|i| Vehicle {
                x: rng.gen_range(0..width.max(1)) as i32,
                y: (lane_height * (i as u32 % 3 + 1)) as i32 - (lane_height / 3) as i32,
                width: (width / 10).max(1),
                height: (lane_height / 2).max(1),
                speed: rng.gen_range(4..16),
                color: Rgb([rng.gen(), rng.gen(), rng.gen()]),
            })
            .collect();
        Self {
            width,
            height,
            vehicles,
        }
    }

    /// Render the scene as it looks at `frame_index`.
    pub(crate) fn render(&self, frame_index: u64) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.width, self.height, ROAD);
        let span = (self.width as i64 + self.width as i64 / 5).max(1);
        // Vehicle motion repeats every `span` frames.
        let step = (frame_index % span as u64) as i64;

        for lane in 1..4 {
            let y = (self.height / 4 * lane) as i32;
            let mut x = -((frame_index % 80) as i32 * 6 % 80);
            while x < self.width as i32 {
                draw_filled_rect_mut(&mut image, Rect::at(x, y).of_size(40, 4), MARKING);
                x += 80;
            }
        }

        for vehicle in &self.vehicles {
            let travelled = vehicle.x as i64 + vehicle.speed as i64 * step;
            let x = (travelled % span) as i32 - (self.width / 10) as i32;
            draw_filled_rect_mut(
                &mut image,
                Rect::at(x, vehicle.y).of_size(vehicle.width, vehicle.height),
                vehicle.color,
            );
        }
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_is_deterministic_and_moves() {
        let a = SyntheticScene::new(320, 180, 7);
        let b = SyntheticScene::new(320, 180, 7);
        assert_eq!(a.render(3).as_raw(), b.render(3).as_raw());
        assert_ne!(a.render(3).as_raw(), a.render(4).as_raw());
        assert_eq!(a.render(0).dimensions(), (320, 180));
    }

    #[test]
    fn long_running_feeds_keep_rendering() {
        let scene = SyntheticScene::new(320, 180, 7);
        let late = scene.render(u64::MAX);
        assert_eq!(late.dimensions(), (320, 180));
        assert_ne!(late.as_raw(), scene.render(u64::MAX - 1).as_raw());
    }
}
