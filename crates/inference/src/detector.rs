use crate::{
    backend::{InferenceBackend, InferenceOutput},
    config::InferenceConfig,
    names::ClassNames,
    postprocessing::{PostProcessor, Prediction, TransformParams},
};
use image::DynamicImage;
use preprocess::{CpuPreProcessor, PreprocessResult};
use std::sync::Mutex;

/// An object detector shared by concurrent callers.
///
/// `predict` returns one `Prediction` per input image; the single-image call
/// therefore yields one result set.
pub trait ObjectDetector: Send + Sync {
    fn predict(&self, image: &DynamicImage) -> anyhow::Result<Vec<Prediction>>;

    /// Fixed id to name mapping of the loaded model.
    fn names(&self) -> &ClassNames;
}

struct DetectorState<B> {
    backend: B,
    preprocessor: CpuPreProcessor,
}

/// Preprocess, infer and postprocess around one backend instance.
///
/// Backends need `&mut self` to run, so calls are serialized per instance.
pub struct Detector<B: InferenceBackend> {
    state: Mutex<DetectorState<B>>,
    postprocessor: PostProcessor,
    names: ClassNames,
}

impl<B: InferenceBackend> Detector<B> {
    pub fn new(backend: B, names: ClassNames, config: &InferenceConfig) -> Self {
        let postprocessor = PostProcessor::new(
            config.score_threshold,
            config.iou_threshold,
            config.max_detections,
        );
        let preprocessor = CpuPreProcessor::new(config.input_size);
        Self {
            state: Mutex::new(DetectorState {
                backend,
                preprocessor,
            }),
            postprocessor,
            names,
        }
    }

    /// Load the backend from `path`. Names from `names_override` take
    /// precedence over names embedded in the model.
    pub fn load(
        path: &str,
        names_override: Option<ClassNames>,
        config: &InferenceConfig,
    ) -> anyhow::Result<Self> {
        let backend = B::load_model(path, config)?;

        let names = match names_override {
            Some(names) => names,
            None => backend.class_names()?.ok_or_else(|| {
                anyhow::anyhow!("Model at {} carries no class names metadata", path)
            })?,
        };

        Ok(Self::new(backend, names, config))
    }
}

impl<B: InferenceBackend + Send> ObjectDetector for Detector<B> {
    #[tracing::instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn predict(&self, image: &DynamicImage) -> anyhow::Result<Vec<Prediction>> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("Detector lock poisoned by a previous inference"))?;

        let PreprocessResult {
            data,
            scale,
            offset_x,
            offset_y,
        } = state.preprocessor.preprocess(rgb.as_raw(), width, height)?;

        let InferenceOutput { predictions } = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            state.backend.infer(&data)?
        };
        drop(state);

        let transform = TransformParams {
            orig_width: width,
            orig_height: height,
            scale,
            offset_x,
            offset_y,
        };

        let boxes = self
            .postprocessor
            .parse_detections(&predictions.view(), &transform)?;

        tracing::debug!(boxes = boxes.len(), "Inference complete");

        Ok(vec![Prediction { boxes }])
    }

    fn names(&self) -> &ClassNames {
        &self.names
    }
}
