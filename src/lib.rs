pub mod api;
pub mod config;
pub mod credentials;
pub mod pipeline;
pub mod storage;

#[cfg(test)]
mod http_stub;

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::api::ApiContext;
use crate::config::IngestConfig;
use crate::credentials::FederatedBroker;

pub fn run() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    // Missing parameters are fatal before any port is opened.
    let config = match IngestConfig::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(serve(config))
}

async fn serve(config: Arc<IngestConfig>) -> ExitCode {
    let broker = FederatedBroker::new(config.clone(), tokio::runtime::Handle::current());
    let ctx = ApiContext::new(Arc::new(broker), config.buckets.clone());

    let mut server = match api::start_ingest_server(ctx, config.listen_addr).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        addr = %server.addr,
        sensitive_bucket = %config.buckets.sensitive,
        anonymized_bucket = %config.buckets.anonymized,
        "Listening for storage events"
    );

    api::shutdown_signal().await;
    server.shutdown();
    server.stopped().await;

    tracing::info!("{} stopped", config::APP_NAME);
    ExitCode::SUCCESS
}
