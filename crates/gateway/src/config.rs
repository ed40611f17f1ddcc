use common::{Environment, LogLevel};
use inference::{ExecutionProvider, InferenceConfig};
use serde::Deserialize;
use std::env;

const DEFAULT_MODEL_PATH: &str = "models/best.onnx";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5001;
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;
const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_IOU_THRESHOLD: f32 = 0.7;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub log_level: LogLevel,
    pub environment: Environment,
    pub model_path: String,
    /// Label file overriding the names embedded in the model.
    pub class_names_path: Option<String>,
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
    pub max_upload_bytes: usize,
    pub input_size: u32,
    pub iou_threshold: f32,
    pub execution_provider: ExecutionProvider,
    pub otel_endpoint: Option<String>,
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            input_size: (self.input_size, self.input_size),
            iou_threshold: self.iou_threshold,
            execution_provider: self.execution_provider,
            ..InferenceConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            environment: Environment::Development,
            model_path: DEFAULT_MODEL_PATH.to_string(),
            class_names_path: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cors_origin: DEFAULT_CORS_ORIGIN.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            input_size: DEFAULT_INPUT_SIZE,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            execution_provider: ExecutionProvider::Cpu,
            otel_endpoint: None,
        }
    }
}

/// Defaults, then `GATEWAY_*` variables, then the unprefixed `MODEL_PATH`
/// and `CLASS_NAMES_PATH` the model tooling already exports.
pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let config = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("environment", "development")?
        .set_default("model_path", DEFAULT_MODEL_PATH)?
        .set_default("host", DEFAULT_HOST)?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("cors_origin", DEFAULT_CORS_ORIGIN)?
        .set_default("max_upload_bytes", DEFAULT_MAX_UPLOAD_BYTES as i64)?
        .set_default("input_size", DEFAULT_INPUT_SIZE as i64)?
        .set_default("iou_threshold", DEFAULT_IOU_THRESHOLD as f64)?
        .set_default("execution_provider", "cpu")?
        .add_source(
            config::Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("model_path", env::var("MODEL_PATH").ok())?
        .set_override_option("class_names_path", env::var("CLASS_NAMES_PATH").ok())?
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;

    Ok(config)
}
