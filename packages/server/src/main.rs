//! `hearth-server`: the Hearth social-network backend.
//!
//! # Quick start
//!
//! ```sh
//! # In-memory server on the default port:
//! hearth-server
//!
//! # Persistent SQLite server:
//! HEARTH_DB=./hearth.db hearth-server
//!
//! # Custom bind address, no rate limiting:
//! HEARTH_BIND=127.0.0.1:8080 HEARTH_RATE_LIMIT_PER_MINUTE=0 hearth-server
//! ```
//!
//! # Environment variables
//!
//! See [`ServerConfig::from_env`] for the full list.

use std::sync::Arc;

use hearth_server::{build_router, MemoryStorage, ServerConfig, SqliteStorage, Storage};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hearth_server=info,tower_http=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env();

    let storage: Arc<dyn Storage> = match &config.db_path {
        Some(path) => {
            tracing::info!("storage: SQLite at {path}");
            Arc::new(
                SqliteStorage::open(path)
                    .unwrap_or_else(|e| panic!("failed to open SQLite database at {path}: {e}")),
            )
        }
        None => {
            tracing::info!("storage: in-memory (data will not survive restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    if config.rate_limit_per_minute == 0 {
        tracing::warn!("rate limiting disabled");
    }

    let bind_addr = config.bind_addr;
    let app = build_router(storage, config);

    tracing::info!("listening on {bind_addr}");
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    axum::serve(listener, app).await.expect("server error");
}
