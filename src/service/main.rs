use notes::{backends::create_backend, config::Config, http::http_router, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    telemetry::init_tracing(&config.telemetry)?;

    let backend = create_backend(&config).await?;

    tracing::info!("notes api listening on {}", config.endpoint);

    axum::Server::bind(&config.endpoint)
        .serve(http_router(backend).into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    telemetry::shutdown_tracing();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", err);
    }

    tracing::info!("shutting down");
}
