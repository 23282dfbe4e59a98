use anyhow::{Context, Result};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize core
    parade_core::init()?;

    let app = parade_core::App::new()?;
    let config = app.config().clone();

    let router = parade_proxy::create_app(config.clone()).context("Failed to build HTTP client")?;

    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.server.bind_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Proxying {} to {}", parade_proxy::PROXY_PREFIX, config.proxy.backend_url);
    if !config.weather_api.is_configured() {
        tracing::warn!("WEATHER_API_KEY is not set, /api/weather will answer 500");
    }
    tracing::info!("Listening on {}", addr);

    let token = app.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(app.shutdown_token().cancelled_owned())
        .await
        .context("Server error")?;

    // Graceful shutdown
    app.shutdown();

    Ok(())
}
