//! Parley server entry point.
//!
//! Loads configuration, connects the store and the language-model client,
//! and serves the HTTP API.

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use parley_api::state::AppState;
use parley_chat::{LlmClient, OpenAiClient};
use parley_core::config::{ParleyConfig, StoreBackend};
use parley_core::error::ParleyError;
use parley_storage::{KvStore, MemoryStore, RedisStore};

use cli::CliArgs;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config. Read before tracing is up; any load error is reported below.
    let config_file = args.resolve_config_path();
    let (mut config, load_error) = read_config(&config_file);
    config.server.port = args.resolve_port(config.server.port);
    config.server.host = args.resolve_host(&config.server.host);
    config.store.url = args.resolve_redis_url(&config.store.url);
    config.general.log_level = args.resolve_log_level(&config.general.log_level);

    // Tracing. RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Parley v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        None => tracing::info!(path = %config_file.display(), "Configuration loaded"),
        Some(e) => tracing::warn!(
            path = %config_file.display(),
            error = %e,
            "Failed to load config, using defaults"
        ),
    }

    // Store.
    let store: Arc<dyn KvStore> = match config.store.backend {
        StoreBackend::Redis => {
            let redis = RedisStore::connect(&config.store.url).await.map_err(|e| {
                tracing::error!(url = %config.store.url, error = %e, "Failed to connect to store");
                e
            })?;
            Arc::new(redis)
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-process store; data is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    // Language model.
    if config.llm.resolve_api_key().is_none() {
        tracing::warn!("No LLM API key configured; set llm.api_key or OPENAI_API_KEY");
    }
    let llm: Arc<dyn LlmClient> = Arc::new(OpenAiClient::new(&config.llm));
    tracing::info!(model = llm.model_name(), base_url = %config.llm.base_url, "LLM client ready");

    let state = AppState::new(config, store, llm);
    parley_api::routes::start_server(state).await?;

    Ok(())
}

/// Read the config file, keeping the error so it can be logged once the
/// subscriber is installed. Defaults are used on failure.
fn read_config(path: &Path) -> (ParleyConfig, Option<ParleyError>) {
    match ParleyConfig::load(path) {
        Ok(config) => (config, None),
        Err(e) => (ParleyConfig::default(), Some(e)),
    }
}
