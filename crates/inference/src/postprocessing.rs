use common::span_debug;
use std::cmp::Ordering;

/// One box in original image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl Detection {
    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union with `other`.
    pub fn iou(&self, other: &Detection) -> f32 {
        let ix1 = self.x1.max(other.x1);
        let iy1 = self.y1.max(other.y1);
        let ix2 = self.x2.min(other.x2);
        let iy2 = self.y2.min(other.y2);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Detections produced for one input image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prediction {
    pub boxes: Vec<Detection>,
}

pub struct TransformParams {
    pub orig_width: u32,
    pub orig_height: u32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

pub struct PostProcessor {
    pub score_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(score_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            score_threshold,
            iou_threshold,
            max_detections,
        }
    }

    /// Decode a YOLOv8/v11 head and run class-aware NMS.
    #[tracing::instrument(skip(self, predictions, transform))]
    pub fn parse_detections(
        &self,
        predictions: &ndarray::ArrayViewD<f32>, // [1, 4 + num_classes, num_anchors]
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<Detection>> {
        let shape = predictions.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
            anyhow::bail!(
                "Unexpected model output shape {:?}, expected [1, 4 + num_classes, num_anchors]",
                shape
            );
        }

        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];

        let mut candidates = Vec::new();

        for i in 0..num_anchors {
            let mut confidence = f32::NEG_INFINITY;
            let mut class_id = 0usize;
            for c in 0..num_classes {
                let score = predictions[[0, 4 + c, i]];
                if score > confidence {
                    confidence = score;
                    class_id = c;
                }
            }

            if confidence <= self.score_threshold {
                continue;
            }

            // Box in cxcywh format, in letterboxed input pixels
            let cx = predictions[[0, 0, i]];
            let cy = predictions[[0, 1, i]];
            let w = predictions[[0, 2, i]];
            let h = predictions[[0, 3, i]];

            let (x1_input, y1_input, x2_input, y2_input) = cxcywh_to_xyxy(cx, cy, w, h);

            // Apply inverse letterbox transform to original image coordinates
            let x1 = ((x1_input - transform.offset_x) / transform.scale)
                .max(0.0)
                .min(transform.orig_width as f32);
            let y1 = ((y1_input - transform.offset_y) / transform.scale)
                .max(0.0)
                .min(transform.orig_height as f32);
            let x2 = ((x2_input - transform.offset_x) / transform.scale)
                .max(0.0)
                .min(transform.orig_width as f32);
            let y2 = ((y2_input - transform.offset_y) / transform.scale)
                .max(0.0)
                .min(transform.orig_height as f32);

            candidates.push(Detection {
                x1,
                y1,
                x2,
                y2,
                confidence,
                class_id: class_id as u32,
            });
        }

        tracing::trace!(candidates = candidates.len(), "Decoded candidate boxes");

        Ok(self.non_max_suppression(candidates))
    }

    /// Greedy NMS; boxes of different classes never suppress each other.
    fn non_max_suppression(&self, mut candidates: Vec<Detection>) -> Vec<Detection> {
        let _s = span_debug!("non_max_suppression");

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });

        let mut kept: Vec<Detection> = Vec::new();
        for candidate in candidates {
            if kept.len() >= self.max_detections {
                break;
            }

            let suppressed = kept.iter().any(|k| {
                k.class_id == candidate.class_id && k.iou(&candidate) > self.iou_threshold
            });

            if !suppressed {
                kept.push(candidate);
            }
        }

        kept
    }
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    /// Helper to create a default PostProcessor for tests
    fn test_postprocessor() -> PostProcessor {
        PostProcessor::new(0.25, 0.7, 300)
    }

    /// Helper to create an identity TransformParams for a 640x640 input
    fn identity_transform() -> TransformParams {
        TransformParams {
            orig_width: 640,
            orig_height: 640,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }

    /// Helper to create YOLO head output `[1, 4 + num_classes, n]`
    ///
    /// Each anchor gets its box and a single non-zero class score.
    fn create_yolo_output(
        anchors: Vec<([f32; 4], usize, f32)>, // (cxcywh, class_idx, score)
        num_classes: usize,
    ) -> Array<f32, IxDyn> {
        let n = anchors.len();
        let rows = 4 + num_classes;
        let mut output = Array::zeros(IxDyn(&[1, rows, n]));

        for (i, (bbox, class_idx, score)) in anchors.iter().enumerate() {
            for (k, v) in bbox.iter().enumerate() {
                output[[0, k, i]] = *v;
            }
            output[[0, 4 + class_idx, i]] = *score;
        }

        output
    }

    /// Test cxcywh to xyxy conversion
    #[test]
    fn test_cxcywh_to_xyxy() {
        let (x1, y1, x2, y2) = cxcywh_to_xyxy(50.0, 50.0, 40.0, 20.0);
        assert!((x1 - 30.0).abs() < 1e-6);
        assert!((y1 - 40.0).abs() < 1e-6);
        assert!((x2 - 70.0).abs() < 1e-6);
        assert!((y2 - 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou() {
        let a = Detection {
            x1: 0.0,
            y1: 0.0,
            x2: 10.0,
            y2: 10.0,
            confidence: 1.0,
            class_id: 0,
        };
        let b = Detection {
            x1: 5.0,
            x2: 15.0,
            ..a
        };
        let far = Detection {
            x1: 100.0,
            x2: 110.0,
            ..a
        };

        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(a.iou(&far), 0.0);
    }

    /// Test that the engine-level score threshold is exclusive
    #[test]
    fn test_score_threshold_filtering() {
        let output = create_yolo_output(
            vec![
                ([100.0, 100.0, 20.0, 20.0], 0, 0.10),
                ([200.0, 200.0, 20.0, 20.0], 1, 0.25), // boundary: dropped
                ([300.0, 300.0, 20.0, 20.0], 2, 0.90),
            ],
            3,
        );

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity_transform())
            .unwrap();

        assert_eq!(detections.len(), 1, "Only the 0.9 box should survive");
        assert_eq!(detections[0].class_id, 2);
        assert!((detections[0].confidence - 0.9).abs() < 1e-6);
    }

    /// Test class ID extraction via argmax
    #[test]
    fn test_class_id_argmax() {
        let mut output = create_yolo_output(vec![([320.0, 320.0, 50.0, 50.0], 3, 0.8)], 5);
        output[[0, 4 + 1, 0]] = 0.6;
        output[[0, 4 + 4, 0]] = 0.3;

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity_transform())
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 3, "Highest scoring class wins");
    }

    /// Test coordinate inverse transformation with known values
    #[test]
    fn test_coordinate_inverse_transformation() {
        // Original image: 800x600 into 640x640
        // Scale = min(640/800, 640/600) = 0.8
        // New size: 640x480, offset Y = (640-480)/2 = 80
        //
        // Box cxcywh (320, 320, 160, 160) -> xyxy (240, 240, 400, 400)
        //   x1 = 240 / 0.8 = 300
        //   y1 = (240 - 80) / 0.8 = 200
        //   x2 = 400 / 0.8 = 500
        //   y2 = (400 - 80) / 0.8 = 400
        let output = create_yolo_output(vec![([320.0, 320.0, 160.0, 160.0], 0, 0.9)], 1);
        let transform = TransformParams {
            orig_width: 800,
            orig_height: 600,
            scale: 0.8,
            offset_x: 0.0,
            offset_y: 80.0,
        };

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &transform)
            .unwrap();

        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert!((det.x1 - 300.0).abs() < 0.1, "x1 incorrect: {}", det.x1);
        assert!((det.y1 - 200.0).abs() < 0.1, "y1 incorrect: {}", det.y1);
        assert!((det.x2 - 500.0).abs() < 0.1, "x2 incorrect: {}", det.x2);
        assert!((det.y2 - 400.0).abs() < 0.1, "y2 incorrect: {}", det.y2);
    }

    /// Test that coordinates are clamped to image bounds
    #[test]
    fn test_coordinates_clamped_to_image_bounds() {
        let output = create_yolo_output(
            vec![
                ([10.0, 10.0, 60.0, 60.0], 0, 0.9),
                ([630.0, 630.0, 60.0, 60.0], 1, 0.9),
            ],
            2,
        );

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity_transform())
            .unwrap();

        assert_eq!(detections.len(), 2);
        let low = detections.iter().find(|d| d.class_id == 0).unwrap();
        let high = detections.iter().find(|d| d.class_id == 1).unwrap();

        assert_eq!(low.x1, 0.0, "Negative x1 should be clamped to 0");
        assert_eq!(low.y1, 0.0, "Negative y1 should be clamped to 0");
        assert_eq!(high.x2, 640.0, "x2 exceeding width should be clamped");
        assert_eq!(high.y2, 640.0, "y2 exceeding height should be clamped");
    }

    /// Test that overlapping boxes of one class collapse to the best one
    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let output = create_yolo_output(
            vec![
                ([100.0, 100.0, 50.0, 50.0], 0, 0.80),
                ([102.0, 101.0, 50.0, 50.0], 0, 0.95),
                ([400.0, 400.0, 50.0, 50.0], 0, 0.60),
            ],
            1,
        );

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity_transform())
            .unwrap();

        assert_eq!(detections.len(), 2, "Overlapping duplicate should be removed");
        assert!((detections[0].confidence - 0.95).abs() < 1e-6);
        assert!((detections[1].confidence - 0.60).abs() < 1e-6);
    }

    /// Test that overlapping boxes of different classes are both kept
    #[test]
    fn test_nms_is_class_aware() {
        let output = create_yolo_output(
            vec![
                ([100.0, 100.0, 50.0, 50.0], 0, 0.90),
                ([100.0, 100.0, 50.0, 50.0], 1, 0.85),
            ],
            2,
        );

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity_transform())
            .unwrap();

        assert_eq!(detections.len(), 2);
    }

    #[test]
    fn test_max_detections_cap() {
        let anchors = (0..10)
            .map(|i| ([30.0 + i as f32 * 60.0, 30.0, 20.0, 20.0], 0, 0.9))
            .collect();
        let output = create_yolo_output(anchors, 1);

        let detections = PostProcessor::new(0.25, 0.7, 4)
            .parse_detections(&output.view(), &identity_transform())
            .unwrap();

        assert_eq!(detections.len(), 4);
    }

    /// Test edge case: Empty detections (0 anchors)
    #[test]
    fn test_empty_input() {
        let output = Array::from_shape_vec(IxDyn(&[1, 84, 0]), vec![]).unwrap();

        let detections = test_postprocessor()
            .parse_detections(&output.view(), &identity_transform())
            .unwrap();

        assert_eq!(detections.len(), 0, "Empty input should return no detections");
    }

    #[test]
    fn test_rejects_unexpected_shape() {
        let output = Array::from_shape_vec(IxDyn(&[1, 4, 10]), vec![0.0; 40]).unwrap();

        let result = test_postprocessor().parse_detections(&output.view(), &identity_transform());

        assert!(result.is_err(), "Output without class rows should be rejected");
    }
}
