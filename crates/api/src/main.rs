use anyhow::Result;
use dinchat_api::{build_app, ApiConfig};
use dinchat_observability::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("dinchat_api");

    let config = ApiConfig::from_env();
    let bind = config.bind.clone();

    let app = build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(bind = %bind, "dinchat api started");

    axum::serve(listener, app).await?;
    Ok(())
}
