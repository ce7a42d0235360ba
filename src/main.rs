//! SafeMate Server: folder reconciliation over a token ledger.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

use safemate_api::AppState;
use safemate_core::config::AppConfig;
use safemate_core::config::ledger::LedgerBackend;
use safemate_core::error::AppError;
use safemate_core::traits::{KeyCustody, LedgerClient};
use safemate_ledger::memory::{InMemoryKeyCustody, InMemoryLedger, provision_account};
use safemate_service::folder::{FolderRepository, FolderService};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from `config/` and the environment.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("SAFEMATE_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting SafeMate v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Ledger backend and custody ──────────────────────
    let (ledger, custody) = match config.ledger.backend {
        LedgerBackend::Sandbox => sandbox_backend(&config),
    };

    // ── Step 2: Repository and service ───────────────────────────
    let repository = Arc::new(FolderRepository::new(
        ledger,
        config.ledger.clone(),
        config.folders.clone(),
    ));
    let folder_service = Arc::new(FolderService::new(repository, custody));

    tracing::info!(
        primary_symbol = %config.folders.primary_symbol,
        max_depth = config.folders.max_depth,
        shared_collection = ?config.folders.shared_collection_id,
        "Folder service ready"
    );

    // ── Step 3: HTTP server ──────────────────────────────────────
    let config = Arc::new(config);
    let state = AppState::new(Arc::clone(&config), folder_service);
    safemate_api::run_server(&config, state).await
}

/// In-process ledger with the configured accounts provisioned.
fn sandbox_backend(config: &AppConfig) -> (Arc<dyn LedgerClient>, Arc<dyn KeyCustody>) {
    let ledger = InMemoryLedger::with_propagation_delay(Duration::from_millis(
        config.sandbox.propagation_delay_ms,
    ));
    let custody = InMemoryKeyCustody::new();
    for account in &config.sandbox.accounts {
        provision_account(&ledger, &custody, *account);
        tracing::info!(account = %account, "Provisioned sandbox account");
    }
    if config.sandbox.accounts.is_empty() {
        tracing::warn!("No sandbox accounts configured; every folder write will fail");
    }
    tracing::info!(
        propagation_delay_ms = config.sandbox.propagation_delay_ms,
        "Using sandbox ledger"
    );
    (Arc::new(ledger), Arc::new(custody))
}
