//! YOLOv8 output decoding.
//!
//! A YOLOv8 detection head emits `[1, 4 + classes, proposals]`, each column
//! holding `cx, cy, w, h` in model-input pixels followed by one score per
//! class. Decoding keeps each proposal's best class, drops scores below the
//! confidence threshold, rescales into source-image pixels and runs
//! class-aware non-maximum suppression.
#![cfg_attr(not(feature = "backend-tract"), allow(dead_code))]

use anyhow::{anyhow, Result};

use crate::detect::result::{BoundingBox, RawDetection};

pub const DEFAULT_INPUT_SIZE: u32 = 640;
pub const DEFAULT_CONFIDENCE: f32 = 0.25;
pub const DEFAULT_IOU: f32 = 0.45;
pub const MAX_DETECTIONS: usize = 300;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YoloParams {
    pub input_size: u32,
    pub confidence: f32,
    pub iou: f32,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            confidence: DEFAULT_CONFIDENCE,
            iou: DEFAULT_IOU,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
    score: f32,
    class_id: u32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);
        let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

/// Decode a row-major `[rows, proposals]` head (`rows = 4 + classes`).
///
/// `source_width`/`source_height` are the dimensions of the image that was
/// stretched to the model input; boxes come back in that image's pixels.
pub fn decode(
    data: &[f32],
    rows: usize,
    proposals: usize,
    source_width: u32,
    source_height: u32,
    params: &YoloParams,
) -> Result<Vec<RawDetection>> {
    if rows <= 4 {
        return Err(anyhow!("detection head has {} rows, expected > 4", rows));
    }
    if data.len() != rows * proposals {
        return Err(anyhow!(
            "detection head length {} does not match {}x{}",
            data.len(),
            rows,
            proposals
        ));
    }

    let scale_x = source_width as f32 / params.input_size as f32;
    let scale_y = source_height as f32 / params.input_size as f32;
    let max_x = source_width as f32;
    let max_y = source_height as f32;

    let mut candidates = Vec::new();
    for i in 0..proposals {
        let (class_id, score) = (4..rows)
            .map(|row| (row - 4, data[row * proposals + i]))
            .fold((0usize, f32::NEG_INFINITY), |best, cur| {
                if cur.1 > best.1 {
                    cur
                } else {
                    best
                }
            });
        if score < params.confidence {
            continue;
        }

        let cx = data[i];
        let cy = data[proposals + i];
        let w = data[2 * proposals + i];
        let h = data[3 * proposals + i];

        candidates.push(Candidate {
            x1: ((cx - w / 2.0) * scale_x).clamp(0.0, max_x),
            y1: ((cy - h / 2.0) * scale_y).clamp(0.0, max_y),
            x2: ((cx + w / 2.0) * scale_x).clamp(0.0, max_x),
            y2: ((cy + h / 2.0) * scale_y).clamp(0.0, max_y),
            score,
            class_id: class_id as u32,
        });
    }

    Ok(non_max_suppression(candidates, params.iou)
        .into_iter()
        .map(|c| {
            RawDetection::new(
                BoundingBox::from_f32(c.x1, c.y1, c.x2, c.y2),
                c.class_id,
                c.score,
            )
        })
        .collect())
}

fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == candidate.class_id && k.iou(&candidate) > iou_threshold);
        if !suppressed {
            kept.push(candidate);
            if kept.len() == MAX_DETECTIONS {
                break;
            }
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a head from `(cx, cy, w, h, scores)` columns.
    fn head(columns: &[(f32, f32, f32, f32, [f32; 2])]) -> Vec<f32> {
        let n = columns.len();
        let mut data = vec![0.0; 6 * n];
        for (i, (cx, cy, w, h, scores)) in columns.iter().enumerate() {
            data[i] = *cx;
            data[n + i] = *cy;
            data[2 * n + i] = *w;
            data[3 * n + i] = *h;
            data[4 * n + i] = scores[0];
            data[5 * n + i] = scores[1];
        }
        data
    }

    #[test]
    fn decodes_best_class_and_rescales() {
        let data = head(&[(320.0, 320.0, 64.0, 64.0, [0.1, 0.9])]);
        let detections = decode(&data, 6, 1, 1280, 450, &YoloParams::default()).unwrap();

        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert_eq!(det.class_id, 1);
        // x: (320 -+ 32) * 2.0 ; y: (320 -+ 32) * 0.703125
        assert_eq!(det.bbox, BoundingBox::new(576, 202, 704, 247));
    }

    #[test]
    fn low_scores_are_dropped() {
        let data = head(&[(100.0, 100.0, 10.0, 10.0, [0.2, 0.1])]);
        let detections = decode(&data, 6, 1, 640, 640, &YoloParams::default()).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn overlapping_boxes_of_same_class_are_suppressed() {
        let data = head(&[
            (100.0, 100.0, 50.0, 50.0, [0.9, 0.0]),
            (102.0, 101.0, 50.0, 50.0, [0.8, 0.0]),
            (102.0, 101.0, 50.0, 50.0, [0.0, 0.7]),
            (400.0, 400.0, 50.0, 50.0, [0.6, 0.0]),
        ]);
        let detections = decode(&data, 6, 4, 640, 640, &YoloParams::default()).unwrap();

        assert_eq!(detections.len(), 3);
        assert_eq!(detections[0].confidence, 0.9);
        assert_eq!(detections[1].class_id, 1);
        assert_eq!(detections[2].confidence, 0.6);
    }

    #[test]
    fn malformed_heads_are_rejected() {
        assert!(decode(&[0.0; 8], 4, 2, 640, 640, &YoloParams::default()).is_err());
        assert!(decode(&[0.0; 10], 6, 2, 640, 640, &YoloParams::default()).is_err());
    }
}
