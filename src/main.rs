use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keystone::{build_router, config::Config, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    if let Some(interval) = config.reaper_interval {
        let sessions = state.sessions.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                tracing::info!("🧹 Running scheduled cleanup of expired sessions...");
                match sessions.purge_expired().await {
                    Ok(removed) => {
                        tracing::info!("✅ Cleanup removed {} expired sessions", removed);
                    }
                    Err(e) => {
                        tracing::error!("❌ Cleanup job failed: {}", e);
                    }
                }
            }
        });
        tracing::info!("✅ Background cleanup job started (every {:?})", interval);
    }

    let app = build_router(state);

    tracing::info!("🚀 Server {} listening on http://{}", config.server_name, config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
