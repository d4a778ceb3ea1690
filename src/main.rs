use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use blog_api::cli::ServerArgs;
use blog_api::config;
use blog_api::{app, database, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("blog_api=info,tower_http=info")),
        )
        .init();

    let args = ServerArgs::parse();
    let config = args.apply(config::config().clone());
    info!("Starting blog API in {:?} mode", config.environment);

    let repos = database::connect(&config.database)
        .await
        .context("failed to open the store")?;

    let state = AppState::new(&config, repos).context("failed to build application state")?;
    let app = app(state, &config.security);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    info!("Blog API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
