pub mod config;
pub mod errors;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod response;
pub mod routes;
pub mod state;

pub use config::{Config, get_configuration};
pub use errors::DetectError;
pub use state::{AppState, ModelHandle};
