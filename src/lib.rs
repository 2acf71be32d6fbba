pub mod adherence;
pub mod api;
pub mod board;
pub mod config;
pub mod dashboard;
pub mod doctor;
pub mod export;
pub mod freshness;
pub mod lifecycle;
pub mod models;
pub mod session;
pub mod timing;
pub mod vitals;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use api::{ApiError, CareApiClient};
use config::ApiConfig;
use session::SessionStore;

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}

/// Session store backed by the per-user session file, or in-memory when no
/// home directory is available.
pub fn open_session() -> Result<Arc<SessionStore>, session::SessionError> {
    let store = match config::session_file() {
        Some(path) => SessionStore::open(path)?,
        None => {
            tracing::warn!("No data directory, session will not persist");
            SessionStore::new()
        }
    };
    Ok(Arc::new(store))
}

/// HTTP client over the persisted session.
pub fn connect(config: &ApiConfig) -> Result<CareApiClient, ApiError> {
    CareApiClient::connect(config, open_session()?)
}
