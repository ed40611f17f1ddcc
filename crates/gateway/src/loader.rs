use crate::{config::Config, state::ModelHandle};
use inference::{ClassNames, Detector, InferenceBackend, backend::ort::OrtBackend};
use std::{fs, io, path::Path, sync::Arc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Model file not found at {0}")]
    ModelNotFound(String),

    #[error("Failed to read class names from {path}: {source}")]
    ClassNamesFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

/// Load the detector once at startup.
///
/// Fails closed: any error is logged and the service keeps running without a
/// model, answering `/health` as unhealthy.
pub fn load(config: &Config) -> Option<ModelHandle> {
    tracing::info!(model_path = %config.model_path, "Attempting to load model");

    match try_load::<OrtBackend>(config) {
        Ok(model) => {
            tracing::info!(
                classes = model.names().len(),
                names = ?model.names(),
                "Model loaded successfully"
            );
            Some(model)
        }
        Err(e) => {
            tracing::error!(error = %e, "Critical error loading model");
            None
        }
    }
}

pub fn try_load<B>(config: &Config) -> Result<ModelHandle, LoadError>
where
    B: InferenceBackend + Send + 'static,
{
    if !Path::new(&config.model_path).is_file() {
        return Err(LoadError::ModelNotFound(config.model_path.clone()));
    }

    let names_override = config
        .class_names_path
        .as_deref()
        .map(read_class_names)
        .transpose()?;

    let detector =
        Detector::<B>::load(&config.model_path, names_override, &config.inference_config())?;

    Ok(Arc::new(detector))
}

fn read_class_names(path: &str) -> Result<ClassNames, LoadError> {
    let contents = fs::read_to_string(path).map_err(|source| LoadError::ClassNamesFile {
        path: path.to_string(),
        source,
    })?;
    Ok(ClassNames::from_lines(&contents))
}
