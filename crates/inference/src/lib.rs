pub mod backend;
pub mod config;
pub mod detector;
pub mod names;
pub mod postprocessing;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use config::{ExecutionProvider, InferenceConfig};
pub use detector::{Detector, ObjectDetector};
pub use names::{ClassNames, ClassNamesError};
pub use postprocessing::{Detection, PostProcessor, Prediction, TransformParams};
