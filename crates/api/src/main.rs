use shiptrack_infra::config::AppConfig;
use shiptrack_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    shiptrack_observability::init(LogFormat::from_env());

    let config = AppConfig::from_env()?;
    tracing::info!(?config, "configuration loaded");

    let app = shiptrack_api::app::build_app(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
