//! Catalog indexer entry point.

use catalog_indexer::{Dependencies, IndexerConfig, IndexingError};
use dotenv::dotenv;
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging. `LOG_FORMAT=json` switches to structured output.
fn init_tracing() -> Result<(), IndexingError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "catalog_indexer=info,catalog_indexer_client=info,catalog_indexer_repository=info",
        )
    });

    let json = env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| IndexingError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "catalog-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| IndexingError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "catalog-indexer",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), IndexingError> {
    dotenv().ok();

    init_tracing()?;

    info!("Starting catalog indexer");

    let config = IndexerConfig::from_env();

    let mut deps = match Dependencies::new(config).await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let shutdown = deps.orchestrator.shutdown_sender();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received interrupt, shutting down");
                let _ = shutdown.send(());
            }
            Err(e) => warn!(error = %e, "Failed to listen for interrupt signal"),
        }
    });

    match deps.orchestrator.run().await {
        Ok(()) => {
            info!("Catalog indexer stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Catalog indexer failed");
            Err(e.into())
        }
    }
}
