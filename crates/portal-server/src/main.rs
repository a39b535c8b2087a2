use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing::info;

use portal_api::AppState;
use portal_api::state::DEFAULT_MAX_IMPORT_BYTES;
use portal_db::{DEFAULT_READER_POOL_SIZE, Database};

/// Reads an optional numeric variable, falling back to `default` when unset.
fn env_number<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw.parse().with_context(|| format!("{name} must be a number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal=debug,portal_api=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path: PathBuf = std::env::var("PORTAL_DB_PATH")
        .unwrap_or_else(|_| "portal.db".into())
        .into();
    let host = std::env::var("PORTAL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = env_number("PORTAL_PORT", 3000)?;
    let reader_pool: usize = env_number("PORTAL_READER_POOL", DEFAULT_READER_POOL_SIZE)?;
    let max_import_bytes: usize = env_number("PORTAL_MAX_IMPORT_BYTES", DEFAULT_MAX_IMPORT_BYTES)?;

    let db = Database::open_with_readers(&db_path, reader_pool)
        .with_context(|| format!("opening database at {}", db_path.display()))?;

    let mut state = AppState::new(db);
    state.max_import_bytes = max_import_bytes;

    let app = portal_api::router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Portal server listening on {}", addr);
    info!("Import body limit: {} bytes", max_import_bytes);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Portal server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
