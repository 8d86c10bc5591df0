use anyhow::{Context, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::classes::ClassMap;
use crate::detect::result::{Detection, RawDetection};
use crate::frame::Frame;
use crate::region::Region;

/// Run `backend` on the lane zone of `frame` and return frame-global detections.
///
/// The backend only sees the zone's pixels; every box it returns is shifted
/// by the zone origin before it is labelled. A zone that lies entirely outside
/// the frame yields no detections and the backend is not called.
pub fn detect_in_region<B: DetectorBackend + ?Sized>(
    backend: &mut B,
    frame: &Frame,
    region: &Region,
    classes: &ClassMap,
) -> Result<Vec<Detection>> {
    let Some(view) = frame.region_view(region) else {
        log::debug!(
            "frame #{}: lane zone {:?} outside {}x{} frame",
            frame.sequence,
            region,
            frame.width(),
            frame.height()
        );
        return Ok(Vec::new());
    };
    let crop = view.to_image();
    let raw = backend
        .detect(&crop)
        .with_context(|| format!("{} detection failed on frame #{}", backend.name(), frame.sequence))?;
    Ok(place(raw, view.origin(), classes))
}

/// Run `backend` on the whole frame.
pub fn detect_full_frame<B: DetectorBackend + ?Sized>(
    backend: &mut B,
    frame: &Frame,
    classes: &ClassMap,
) -> Result<Vec<Detection>> {
    let raw = backend
        .detect(frame.image())
        .with_context(|| format!("{} detection failed on frame #{}", backend.name(), frame.sequence))?;
    Ok(place(raw, (0, 0), classes))
}

fn place(raw: Vec<RawDetection>, origin: (i32, i32), classes: &ClassMap) -> Vec<Detection> {
    let (dx, dy) = origin;
    raw.into_iter()
        .map(|det| Detection {
            bbox: det.bbox.offset(dx, dy),
            label: classes.label(det.class_id),
            class_id: det.class_id,
            confidence: det.confidence,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::result::BoundingBox;
    use crate::detect::StubBackend;
    use crate::region::RegionBounds;
    use image::RgbImage;

    fn blank_frame(width: u32, height: u32) -> Frame {
        Frame::new(RgbImage::new(width, height), 1)
    }

    struct SizeRecorder {
        seen: Vec<(u32, u32)>,
    }

    impl DetectorBackend for SizeRecorder {
        fn name(&self) -> &'static str {
            "size-recorder"
        }

        fn detect(&mut self, image: &RgbImage) -> Result<Vec<RawDetection>> {
            self.seen.push(image.dimensions());
            Ok(Vec::new())
        }
    }

    #[test]
    fn boxes_are_shifted_by_zone_origin() {
        let frame = blank_frame(1280, 720);
        let region = RegionBounds::default().select(1280, 720);
        let mut backend = StubBackend::scripted(vec![vec![
            RawDetection::new(BoundingBox::new(10, 20, 110, 80), 0, 0.9),
            RawDetection::new(BoundingBox::new(500, 0, 640, 120), 1, 0.8),
        ]]);

        let detections =
            detect_in_region(&mut backend, &frame, &region, &ClassMap::default()).unwrap();

        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].bbox, BoundingBox::new(10, 220, 110, 280));
        assert_eq!(detections[0].label, "car");
        assert_eq!(detections[1].bbox, BoundingBox::new(500, 200, 640, 320));
        assert_eq!(detections[1].label, "ambulance");
    }

    #[test]
    fn backend_sees_only_zone_pixels() {
        let frame = blank_frame(1280, 720);
        let region = RegionBounds::default().select(1280, 720);
        let mut backend = SizeRecorder { seen: Vec::new() };

        detect_in_region(&mut backend, &frame, &region, &ClassMap::default()).unwrap();
        assert_eq!(backend.seen, vec![(1280, 450)]);
    }

    #[test]
    fn zone_outside_frame_skips_backend() {
        let frame = blank_frame(320, 180);
        let region = RegionBounds::default().select(320, 180);
        let mut backend = SizeRecorder { seen: Vec::new() };

        let detections =
            detect_in_region(&mut backend, &frame, &region, &ClassMap::default()).unwrap();
        assert!(detections.is_empty());
        assert!(backend.seen.is_empty());
    }

    #[test]
    fn full_frame_detection_keeps_coordinates() {
        let frame = blank_frame(640, 480);
        let mut backend = StubBackend::scripted(vec![vec![RawDetection::new(
            BoundingBox::new(1, 2, 3, 4),
            5,
            0.5,
        )]]);
        let detections = detect_full_frame(&mut backend, &frame, &ClassMap::default()).unwrap();
        assert_eq!(detections[0].bbox, BoundingBox::new(1, 2, 3, 4));
        assert_eq!(detections[0].label, "class_5");
    }
}
