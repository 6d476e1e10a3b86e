use storefront_hex::config::Config;
use storefront_hex::inbound::http::{AppState, HttpServer, HttpServerConfig};
use storefront_repo::{build_repo, Repo};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env for DATABASE_URL / SERVER_PORT when present.
    let _ = dotenvy::dotenv();
    let config = Config::from_env()?;
    tracing_subscriber::fmt()
        .with_env_filter(config.log_filter.as_str())
        .init();

    let repo: Repo = build_repo(config.database_url.as_deref()).await?;
    tracing::info!(backend = repo.backend_name(), "store ready");

    let server_cfg = HttpServerConfig {
        port: config.server_port.clone(),
    };

    let http = HttpServer::new(AppState::new(repo), server_cfg);
    http.run().await
}
