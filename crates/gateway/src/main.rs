use common::TelemetryGuard;
use gateway::{AppState, get_configuration, loader, logging::setup_logging, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = get_configuration()?;

    let _telemetry = match config.otel_endpoint.as_deref() {
        Some(endpoint) => Some(TelemetryGuard::init(
            "gateway",
            endpoint,
            &config.log_level,
            config.environment.clone(),
        )?),
        None => {
            setup_logging(&config);
            None
        }
    };

    tracing::info!(
        environment = config.environment.as_str(),
        model_path = %config.model_path,
        "Gateway starting"
    );

    let model = loader::load(&config);
    if model.is_none() {
        tracing::warn!("Serving without a model; /detect will fail until restart");
    }

    let app = routes::app(AppState::new(model), &config)?;

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
