use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use challenge_hub::{
    api::{create_router, AppState},
    config::Config,
    db::{self, MachineRepository},
    error::AppError,
    llm::OpenAiClient,
};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,challenge_hub=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting challenge-hub server v{}...", env!("CARGO_PKG_VERSION"));

    let config = Arc::new(Config::from_env()?);
    tracing::info!(password_scheme = %config.password_scheme, "Configuration loaded");

    let db = db::connect(&config).await?;
    tracing::info!("Database connected and migrated: {}", config.database_url);

    let llm = Arc::new(OpenAiClient::new(&config)?);
    tracing::info!(model = %config.llm_model, "Language model client ready");

    let state = AppState {
        db: db.clone(),
        llm,
        config: config.clone(),
    };

    // Expired machine rows are filtered on read; purging them is optional
    if config.machine_purge_interval_secs > 0 {
        let db_clone = db.clone();
        let period = Duration::from_secs(config.machine_purge_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match MachineRepository::cleanup_expired(&db_clone).await {
                    Ok(removed) => tracing::debug!(removed, "Expired machine access purged"),
                    Err(e) => tracing::error!("Machine access purge failed: {}", e),
                }
            }
        });
        tracing::info!("Machine access purge task started (every {:?})", period);
    }

    let app = create_router(state);

    let addr = config.server_address();
    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Health check: http://{}/api/health", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
