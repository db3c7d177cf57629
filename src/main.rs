use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use provider_availability::config::AppConfig;
use provider_availability::db;
use provider_availability::handlers;
use provider_availability::services::clock::LocalClock;
use provider_availability::services::notifications::http::HttpPushProvider;
use provider_availability::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;

    if config.push_multicast_url.is_empty() {
        tracing::warn!("PUSH_MULTICAST_URL not set, multicast pushes will fail");
    }
    tracing::info!(
        "push relay: {} (batches of {})",
        config.push_relay_url,
        config.relay_batch_size
    );
    let push = HttpPushProvider::new(
        config.push_multicast_url.clone(),
        config.push_multicast_key.clone(),
        config.push_relay_url.clone(),
    );

    let state = Arc::new(AppState::new(
        conn,
        config.clone(),
        Arc::new(push),
        Arc::new(LocalClock),
    ));

    let app = handlers::router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
