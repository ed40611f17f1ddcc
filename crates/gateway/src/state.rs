use crate::metrics::DetectMetrics;
use inference::ObjectDetector;
use std::sync::Arc;

pub type ModelHandle = Arc<dyn ObjectDetector>;

/// Service context shared by every handler.
///
/// The model handle is set once at construction and never replaced, so a
/// service built without one stays unready until the process restarts.
#[derive(Clone)]
pub struct AppState {
    model: Option<ModelHandle>,
    pub metrics: DetectMetrics,
}

impl AppState {
    pub fn new(model: Option<ModelHandle>) -> Self {
        Self {
            model,
            metrics: DetectMetrics::new("gateway"),
        }
    }

    pub fn model(&self) -> Option<&ModelHandle> {
        self.model.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_some()
    }
}
