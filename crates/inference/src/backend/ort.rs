use super::{InferenceBackend, InferenceOutput};
use crate::{
    config::{ExecutionProvider, InferenceConfig},
    names::ClassNames,
};
use ndarray::{Array, IxDyn};
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};

/// Input and output tensor names of an Ultralytics ONNX export.
const INPUT_NAME: &str = "images";
const OUTPUT_NAME: &str = "output0";
/// Metadata key holding the `{id: 'name'}` class mapping.
const NAMES_METADATA_KEY: &str = "names";

pub struct OrtBackend {
    session: Session,
}

impl OrtBackend {
    /// Load model with specified execution provider
    pub fn load_model_with_provider(
        path: &str,
        provider: ExecutionProvider,
        intra_threads: usize,
    ) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?;

        match provider {
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder.commit_from_file(path)?;

        tracing::info!("Model loaded from {}", path);
        Ok(Self { session })
    }
}

impl InferenceBackend for OrtBackend {
    fn load_model(path: &str, config: &InferenceConfig) -> anyhow::Result<Self> {
        Self::load_model_with_provider(path, config.execution_provider, config.intra_threads)
    }

    fn infer(&mut self, images: &Array<f32, IxDyn>) -> anyhow::Result<InferenceOutput> {
        let outputs = self.session.run(ort::inputs![
            INPUT_NAME => TensorRef::from_array_view(images.view())?
        ])?;

        let predictions = outputs[OUTPUT_NAME].try_extract_array::<f32>()?;

        Ok(InferenceOutput {
            predictions: predictions.into_owned(),
        })
    }

    fn class_names(&self) -> anyhow::Result<Option<ClassNames>> {
        let metadata = self.session.metadata()?;
        names_from_metadata(metadata.custom(NAMES_METADATA_KEY))
    }
}

/// Parse the raw `names` metadata value, if the export wrote one.
fn names_from_metadata(raw: Option<String>) -> anyhow::Result<Option<ClassNames>> {
    match raw {
        Some(raw) => Ok(Some(raw.parse()?)),
        None => Ok(None),
    }
}
