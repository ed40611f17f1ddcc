use preprocess::DEFAULT_INPUT_SIZE;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    #[default]
    Cpu,
    Cuda,
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub input_size: (u32, u32),
    /// Engine-level score cut applied before NMS. Callers usually filter
    /// again with their own, stricter threshold.
    pub score_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
            score_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            execution_provider: ExecutionProvider::Cpu,
            intra_threads: 4,
        }
    }
}
