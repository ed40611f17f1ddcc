use crate::{
    config::Config,
    errors::DetectError,
    pipeline::{ComponentCount, run_detection},
    response::{DetectResponse, HealthResponse},
    state::AppState,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::{HeaderValue, Method, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::{sync::Arc, time::Instant};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const IMAGE_FIELD: &str = "image";

/// Routes only, without transport layers. Tests drive this directly.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/detect", post(detect))
        .route("/health", get(health))
        .with_state(state)
}

pub fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin: HeaderValue = origin
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid CORS origin {:?}: {}", origin, e))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]))
}

pub fn app(state: AppState, config: &Config) -> anyhow::Result<Router> {
    Ok(router(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(cors_layer(&config.cors_origin)?)
        .layer(TraceLayer::new_for_http()))
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::new(state.is_ready()))
}

async fn detect(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let started = Instant::now();
    let result = handle_detect(&state, multipart).await;
    state.metrics.record(&result, started.elapsed());

    match result {
        Ok(detections) => {
            tracing::info!(
                kinds = detections.len(),
                detections = ?detections,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Detection complete"
            );
            Json(DetectResponse::success(detections)).into_response()
        }
        Err(e) => {
            if e.status_code().is_server_error() {
                tracing::error!(error = %e, kind = e.kind(), "Detection failed");
            } else {
                tracing::warn!(error = %e, kind = e.kind(), "Rejected detect request");
            }
            e.into_response()
        }
    }
}

async fn handle_detect(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Vec<ComponentCount>, DetectError> {
    // Readiness wins over payload problems
    let model = Arc::clone(state.model().ok_or(DetectError::ModelNotLoaded)?);

    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(%rejection, "Request body is not multipart");
        DetectError::NoImageUploaded
    })?;

    let bytes = read_image_field(&mut multipart).await?;

    tokio::task::spawn_blocking(move || run_detection(model.as_ref(), &bytes)).await?
}

/// Bytes of the first file part named `image`. Plain form values and other
/// parts are skipped.
async fn read_image_field(multipart: &mut Multipart) -> Result<Vec<u8>, DetectError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(IMAGE_FIELD) && field.file_name().is_some() {
            return Ok(field.bytes().await?.to_vec());
        }
    }
    Err(DetectError::NoImageUploaded)
}
