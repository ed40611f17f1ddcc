use crate::config::{Environment, LogLevel};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Build the level filter shared by every subscriber setup.
///
/// `RUST_LOG` wins when it is set; otherwise the configured level applies.
pub fn env_filter(log_level: &LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.as_str()))
}

/// Initialize tracing subscriber with pretty formatting for development
/// and JSON formatting for production.
///
/// Use `TelemetryGuard::init` instead when spans should also be exported
/// over OTLP; only one of the two may run per process.
pub fn setup_logging(log_level: LogLevel, environment: Environment) {
    let registry = tracing_subscriber::registry().with(env_filter(&log_level));

    match environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .init();
        }
        Environment::Development => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
                .init();
        }
    }
}
