use crate::{config::InferenceConfig, names::ClassNames};
use ndarray::{Array, IxDyn};

#[cfg(feature = "ort-backend")]
pub mod ort;

pub trait InferenceBackend {
    fn load_model(path: &str, config: &InferenceConfig) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run inference on a `[1, 3, H, W]` input tensor
    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput>;

    /// Class names embedded in the model file, if the export carries them.
    fn class_names(&self) -> anyhow::Result<Option<ClassNames>> {
        Ok(None)
    }
}

pub struct InferenceOutput {
    pub predictions: ndarray::ArrayD<f32>, // [1, 4 + num_classes, num_anchors] cxcywh in input pixels, then class scores
}
