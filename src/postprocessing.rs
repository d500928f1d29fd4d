//! Detection decoding: raw output tensors to labeled bounding boxes
//!
//! This is the one place where a coordinate-convention mistake silently
//! corrupts everything downstream, so the convention is fixed here once:
//! raw rows carry center-based normalized boxes, decoded [`Detection`]s
//! carry top-left-based normalized boxes (see `types`).

use crate::detector::RawOutput;
use crate::error::{DetectionError, Result};
use crate::types::{BoundingBox, Detection, DetectionSet, SpeciesClass};

/// Candidate parsed from one raw output row, before suppression
#[derive(Debug, Clone)]
struct Candidate {
    class: SpeciesClass,
    confidence: f32,
    bbox: BoundingBox,
}

/// Decodes raw model output into an ordered [`DetectionSet`]
///
/// Decoding is deterministic and idempotent: the same tensor and thresholds
/// always produce the same set in the same order.
pub struct DetectionDecoder {
    confidence_threshold: f32,
    iou_threshold: f32,
    max_detections: usize,
}

impl DetectionDecoder {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold: confidence_threshold.clamp(0.0, 1.0),
            iou_threshold: iou_threshold.clamp(0.0, 1.0),
            max_detections,
        }
    }

    /// Decode one frame's raw output
    ///
    /// Filters candidates below the confidence threshold, applies greedy
    /// non-maximum suppression, and returns the survivors ordered by
    /// descending confidence with ties in first-seen tensor order.
    pub fn decode(&self, output: &RawOutput) -> Result<DetectionSet> {
        let candidates = self.parse_output(output)?;
        let kept = self.apply_nms(candidates);

        // apply_nms already sorted by confidence, so the cap keeps the top N
        let detections: Vec<Detection> = kept
            .into_iter()
            .take(self.max_detections)
            .map(|c| Detection::new(c.class, c.confidence, c.bbox))
            .collect();

        Ok(DetectionSet::new(detections))
    }

    /// Parse raw rows `[cx, cy, w, h, confidence, class_id]`
    fn parse_output(&self, output: &RawOutput) -> Result<Vec<Candidate>> {
        if output.ncols() < 6 {
            return Err(DetectionError::inference(format!(
                "invalid output shape: expected at least 6 columns, got {}",
                output.ncols()
            )));
        }

        let mut candidates = Vec::new();
        for row in output.rows() {
            let confidence = row[4];
            if !(confidence >= self.confidence_threshold) {
                // Also drops NaN confidences
                continue;
            }

            let class_id = row[5] as u32;
            let Some(class) = SpeciesClass::from_id(class_id) else {
                log::debug!("skipping candidate with unknown class id {class_id}");
                continue;
            };

            // Center-based to top-left-based, clamped to the unit square
            let x = (row[0] - row[2] / 2.0).clamp(0.0, 1.0);
            let y = (row[1] - row[3] / 2.0).clamp(0.0, 1.0);
            let width = row[2].max(0.0).min(1.0 - x);
            let height = row[3].max(0.0).min(1.0 - y);

            candidates.push(Candidate {
                class,
                confidence,
                bbox: BoundingBox::new(x, y, width, height),
            });
        }

        Ok(candidates)
    }

    /// Greedy non-maximum suppression
    ///
    /// Candidates are sorted by descending confidence (stable, so equal
    /// confidences keep tensor order), then the top candidate is kept and
    /// every remaining candidate overlapping it beyond the IoU threshold is
    /// discarded, class-agnostically.
    fn apply_nms(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        let mut keep: Vec<Candidate> = Vec::new();
        let mut suppressed = vec![false; candidates.len()];

        for i in 0..candidates.len() {
            if suppressed[i] {
                continue;
            }
            for j in (i + 1)..candidates.len() {
                if !suppressed[j]
                    && candidates[i].bbox.iou(&candidates[j].bbox) > self.iou_threshold
                {
                    suppressed[j] = true;
                }
            }
            keep.push(candidates[i].clone());
        }

        keep
    }
}
