use anyhow::Context;

use marketplace_infra::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    marketplace_observability::init(&config.log_level);
    if config.uses_dev_jwt_secret() {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
    }

    let address = config.server_address.clone();
    let app = marketplace_api::app::build_app(config).await?;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
