use crate::response::DetectResponse;
use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Every way a `/detect` request can fail. The display string is what the
/// client sees in the `error` field.
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Model not loaded")]
    ModelNotLoaded,

    #[error("No image uploaded")]
    NoImageUploaded,

    #[error("{0}")]
    Upload(#[from] MultipartError),

    #[error("{0}")]
    Decode(#[from] image::ImageError),

    #[error("{0}")]
    Inference(#[from] anyhow::Error),

    #[error("Detection task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl DetectError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DetectError::NoImageUploaded => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used as a metric attribute.
    pub fn kind(&self) -> &'static str {
        match self {
            DetectError::ModelNotLoaded => "model_not_loaded",
            DetectError::NoImageUploaded => "no_image",
            DetectError::Upload(_) => "upload",
            DetectError::Decode(_) => "decode",
            DetectError::Inference(_) => "inference",
            DetectError::Task(_) => "task",
        }
    }
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        (
            self.status_code(),
            Json(DetectResponse::failure(self.to_string())),
        )
            .into_response()
    }
}
