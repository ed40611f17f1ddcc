use crate::pipeline::ComponentCount;
use serde::{Deserialize, Serialize};

/// Body of every `/detect` response, success or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detections: Option<Vec<ComponentCount>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectResponse {
    pub fn success(detections: Vec<ComponentCount>) -> Self {
        Self {
            success: true,
            detections: Some(detections),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            detections: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
}

impl HealthResponse {
    pub fn new(model_loaded: bool) -> Self {
        let status = if model_loaded { "ok" } else { "unhealthy" };
        Self {
            status: status.to_string(),
            model_loaded,
        }
    }
}
