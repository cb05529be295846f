//! `todosync` collection server -- in-memory REST task collection.
//!
//! Serves one task collection over HTTP for the `todosync` client. Tasks
//! live in memory only and are lost on shutdown.
//!
//! # Usage
//!
//! ```bash
//! # Run on default address 127.0.0.1:9000, collection at /todos
//! cargo run --bin todosync-server
//!
//! # Run on custom address and path
//! cargo run --bin todosync-server -- --bind 0.0.0.0:8080 --collection-path api/todos
//!
//! # Or via environment variable
//! TODOSYNC_SERVER_ADDR=127.0.0.1:8080 cargo run --bin todosync-server
//! ```

use std::sync::Arc;

use clap::Parser;
use todosync_server::config::{ServerCliArgs, ServerConfig};
use todosync_server::server::{self, ServerState};
use todosync_server::store::CollectionStore;

#[tokio::main]
async fn main() {
    let cli = ServerCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match ServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(addr = %config.bind_addr, path = %config.collection_path, "starting todosync collection server");

    let store = CollectionStore::with_max_tasks(config.max_tasks);
    let state = Arc::new(ServerState::with_config(&config.collection_path, store));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "collection server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "collection server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start collection server");
            std::process::exit(1);
        }
    }
}
