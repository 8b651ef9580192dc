//! rumi-api - HTTP API server for the rumi notes backend

use tracing::info;

use rumi_api::{build_router, init_tracing, AppState, LogSettings, ServerConfig};
use rumi_db::Storage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let log_settings = LogSettings::from_env();
    let _log_guard = init_tracing(&log_settings)?;
    info!(
        log_format = log_settings.format.as_str(),
        log_file = %log_settings.destination(),
        "Logging initialized"
    );

    let config = ServerConfig::from_env()?;

    // Schema reconciliation must succeed before any request is served
    let storage = Storage::open(&config.storage).await?;
    let report = storage.schema.ensure_schema().await?;
    info!(
        backend = %storage.backend,
        container_created = report.container_created,
        fields_added = report.fields_added.len(),
        "Notes schema ready"
    );

    let app = build_router(AppState::new(&storage), config.max_body_bytes);

    // Start server
    let addr = config.bind_addr()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
