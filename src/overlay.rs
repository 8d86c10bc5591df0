//! On-frame annotation.
//!
//! Rendering only mutates pixels; nothing drawn here feeds back into
//! detection, aggregation or notification. Text needs a TrueType font. When
//! none is configured, boxes are still drawn and every caption is skipped.

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::aggregate::SignalState;
use crate::detect::{ClassKind, ClassMap, Detection};
use crate::region::Region;

pub const ZONE_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
pub const PRIORITY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const VEHICLE_COLOR: Rgb<u8> = Rgb([255, 165, 0]);
pub const READOUT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
pub const NORMAL_STATUS_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const ALERT_STATUS_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

const ZONE_THICKNESS: i32 = 3;
const BOX_THICKNESS: i32 = 2;
const LABEL_SCALE: f32 = 22.0;
const ZONE_CAPTION_SCALE: f32 = 28.0;
const READOUT_SCALE: f32 = 38.0;
const STATUS_SCALE: f32 = 26.0;

pub struct OverlayRenderer {
    font: Option<FontArc>,
    lane: u8,
}

impl OverlayRenderer {
    /// Create a renderer, loading the caption font from `font_path` if given.
    pub fn new(lane: u8, font_path: Option<&Path>) -> Result<Self> {
        let font = match font_path {
            Some(path) => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("failed to read font {}", path.display()))?;
                let font = FontArc::try_from_vec(bytes)
                    .with_context(|| format!("invalid font file {}", path.display()))?;
                Some(font)
            }
            None => {
                log::warn!("no overlay font configured; captions and car count are not drawn");
                None
            }
        };
        Ok(Self { font, lane })
    }

    pub fn with_font(lane: u8, font: FontArc) -> Self {
        Self {
            font: Some(font),
            lane,
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Lane view: detections, zone boundary with caption, vehicle readout.
    pub fn draw_lane(
        &self,
        image: &mut RgbImage,
        region: &Region,
        detections: &[Detection],
        signal: &SignalState,
        classes: &ClassMap,
    ) {
        self.draw_detections(image, detections, classes);

        draw_thick_rect(
            image,
            region.left,
            region.top,
            region.right,
            region.bottom,
            ZONE_THICKNESS,
            ZONE_COLOR,
        );
        self.caption(
            image,
            region.left + 10,
            region.top + 8,
            ZONE_CAPTION_SCALE,
            ZONE_COLOR,
            &format!("AI SENSOR ZONE (LANE {})", self.lane),
        );
        self.caption(
            image,
            20,
            20,
            READOUT_SCALE,
            READOUT_COLOR,
            &format!("Detected Cars: {}", signal.vehicle_count),
        );
    }

    /// Boxes and labels, red for the priority class, orange otherwise.
    pub fn draw_detections(&self, image: &mut RgbImage, detections: &[Detection], classes: &ClassMap) {
        for det in detections {
            let color = match classes.kind(det.class_id) {
                ClassKind::Priority => PRIORITY_COLOR,
                ClassKind::Ordinary => VEHICLE_COLOR,
            };
            let b = det.bbox;
            draw_thick_rect(image, b.x1, b.y1, b.x2, b.y2, BOX_THICKNESS, color);
            self.caption(
                image,
                b.x1,
                b.y1 - 10 - LABEL_SCALE as i32,
                LABEL_SCALE,
                color,
                &det.label,
            );
        }
    }

    /// One status line in the top-left corner.
    pub fn draw_status(&self, image: &mut RgbImage, text: &str, color: Rgb<u8>) {
        self.caption(image, 10, 10, STATUS_SCALE, color, text);
    }

    fn caption(&self, image: &mut RgbImage, x: i32, y: i32, scale: f32, color: Rgb<u8>, text: &str) {
        if let Some(font) = &self.font {
            draw_text_mut(image, color, x, y, PxScale::from(scale), font, text);
        }
    }
}

/// Hollow rectangle `thickness` pixels wide, growing outward from the edge.
fn draw_thick_rect(
    image: &mut RgbImage,
    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    thickness: i32,
    color: Rgb<u8>,
) {
    let width = right - left;
    let height = bottom - top;
    if width <= 0 || height <= 0 {
        return;
    }
    for i in 0..thickness {
        let rect = Rect::at(left - i, top - i)
            .of_size((width + 2 * i) as u32, (height + 2 * i) as u32);
        draw_hollow_rect_mut(image, rect, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, AMBULANCE_CLASS, CAR_CLASS};
    use crate::region::RegionBounds;

    fn det(bbox: BoundingBox, class_id: u32) -> Detection {
        Detection {
            bbox,
            class_id,
            label: String::new(),
            confidence: 0.9,
        }
    }

    #[test]
    fn boxes_are_colored_by_class() {
        let renderer = OverlayRenderer::new(2, None).unwrap();
        let mut image = RgbImage::new(1280, 720);
        let detections = vec![
            det(BoundingBox::new(10, 220, 110, 280), CAR_CLASS),
            det(BoundingBox::new(300, 300, 400, 400), AMBULANCE_CLASS),
        ];

        renderer.draw_detections(&mut image, &detections, &ClassMap::default());

        assert_eq!(*image.get_pixel(10, 250), VEHICLE_COLOR);
        assert_eq!(*image.get_pixel(300, 350), PRIORITY_COLOR);
        // Interior untouched.
        assert_eq!(*image.get_pixel(60, 250), Rgb([0, 0, 0]));
    }

    #[test]
    fn lane_view_outlines_zone() {
        let renderer = OverlayRenderer::new(2, None).unwrap();
        let mut image = RgbImage::new(1280, 720);
        let region = RegionBounds::default().select(1280, 720);

        renderer.draw_lane(
            &mut image,
            &region,
            &[],
            &SignalState::default(),
            &ClassMap::default(),
        );

        assert_eq!(*image.get_pixel(640, 200), ZONE_COLOR);
        assert_eq!(*image.get_pixel(640, 198), ZONE_COLOR);
        assert_eq!(*image.get_pixel(640, 649), ZONE_COLOR);
        assert_eq!(*image.get_pixel(640, 400), Rgb([0, 0, 0]));
    }

    #[test]
    fn degenerate_boxes_are_skipped() {
        let renderer = OverlayRenderer::new(2, None).unwrap();
        let mut image = RgbImage::new(64, 64);
        let detections = vec![det(BoundingBox::new(20, 20, 20, 40), CAR_CLASS)];
        renderer.draw_detections(&mut image, &detections, &ClassMap::default());
        assert!(image.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn missing_font_file_is_an_error() {
        assert!(OverlayRenderer::new(2, Some(Path::new("/nonexistent/font.ttf"))).is_err());
    }
}
