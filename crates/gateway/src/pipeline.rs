//! Single-image detection: decode, infer, threshold, name, count.

use crate::errors::DetectError;
use image::DynamicImage;
use inference::{ClassNames, ObjectDetector, Prediction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A box must score strictly above this to be counted.
pub const CONFIDENCE_THRESHOLD: f32 = 0.3;

/// One box that survived thresholding, with its resolved name.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    pub class_id: u32,
    pub name: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentCount {
    pub name: String,
    pub quantity: u32,
}

/// Per-request class name to quantity mapping, in first-seen order.
#[derive(Debug, Default)]
pub struct ComponentCounts {
    entries: Vec<ComponentCount>,
    index: HashMap<String, usize>,
}

impl ComponentCounts {
    pub fn add(&mut self, name: &str) {
        match self.index.get(name) {
            Some(&i) => self.entries[i].quantity += 1,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push(ComponentCount {
                    name: name.to_string(),
                    quantity: 1,
                });
            }
        }
    }

    pub fn into_vec(self) -> Vec<ComponentCount> {
        self.entries
    }
}

impl<'a> FromIterator<&'a DetectionRecord> for ComponentCounts {
    fn from_iter<I: IntoIterator<Item = &'a DetectionRecord>>(iter: I) -> Self {
        let mut counts = ComponentCounts::default();
        for record in iter {
            counts.add(&record.name);
        }
        counts
    }
}

/// Keep boxes above `threshold` across every result set and resolve their names.
pub fn surviving_records(
    predictions: &[Prediction],
    names: &ClassNames,
    threshold: f32,
) -> Vec<DetectionRecord> {
    predictions
        .iter()
        .flat_map(|prediction| prediction.boxes.iter())
        .filter(|detection| detection.confidence > threshold)
        .map(|detection| DetectionRecord {
            class_id: detection.class_id,
            name: names.resolve(detection.class_id),
            confidence: detection.confidence,
        })
        .collect()
}

pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, DetectError> {
    Ok(image::load_from_memory(bytes)?)
}

/// Run the whole pipeline for one uploaded image. Blocking; call it off the
/// async executor.
pub fn run_detection(
    model: &dyn ObjectDetector,
    bytes: &[u8],
) -> Result<Vec<ComponentCount>, DetectError> {
    let image = decode_image(bytes)?;

    tracing::debug!(
        width = image.width(),
        height = image.height(),
        bytes = bytes.len(),
        "Decoded upload"
    );

    let predictions = model.predict(&image)?;
    let records = surviving_records(&predictions, model.names(), CONFIDENCE_THRESHOLD);

    let counts: ComponentCounts = records.iter().collect();
    Ok(counts.into_vec())
}
