//! Healthcheck responder for deployments whose platform probes the
//! process over HTTP (Render-style keepalive).

use axum::{routing::get, Router};

pub async fn serve(host: &str, port: u16) -> anyhow::Result<()> {
    let app = Router::new()
        .route("/", get(health))
        .route("/health", get(health));

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("health server listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "Bot OK"
}
