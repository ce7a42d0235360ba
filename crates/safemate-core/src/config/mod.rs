//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! TOML files and `SAFEMATE__`-prefixed environment variables. Every field
//! has a default, so an empty source yields a usable configuration.

pub mod app;
pub mod folder;
pub mod ledger;
pub mod logging;
pub mod sandbox;

use serde::{Deserialize, Serialize};

use self::app::ServerConfig;
use self::folder::FolderConfig;
use self::ledger::LedgerConfig;
use self::logging::LoggingConfig;
use self::sandbox::SandboxConfig;

use crate::error::AppError;

/// Largest `folders.max_depth` the metadata depth byte is allowed to carry.
pub const MAX_DEPTH_LIMIT: u8 = 15;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Ledger access settings.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Folder discovery policy.
    #[serde(default)]
    pub folders: FolderConfig,
    /// Sandbox ledger settings.
    #[serde(default)]
    pub sandbox: SandboxConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default`, the environment-specific overlay
    /// `config/{env}`, and environment variables prefixed with `SAFEMATE__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("SAFEMATE")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("folders.folder_symbols")
                    .with_list_parse_key("sandbox.accounts")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let config: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), AppError> {
        let folders = &self.folders;
        if folders.max_depth == 0 || folders.max_depth > MAX_DEPTH_LIMIT {
            return Err(AppError::configuration(format!(
                "folders.max_depth must be between 1 and {MAX_DEPTH_LIMIT}, got {}",
                folders.max_depth
            )));
        }
        if !folders.folder_symbols.contains(&folders.primary_symbol) {
            return Err(AppError::configuration(format!(
                "folders.folder_symbols must include the primary symbol '{}'",
                folders.primary_symbol
            )));
        }
        if folders.folder_symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(AppError::configuration(
                "folders.folder_symbols must not contain empty symbols",
            ));
        }
        if self.ledger.fetch_concurrency == 0 || self.ledger.metadata_page_size == 0 {
            return Err(AppError::configuration(
                "ledger.fetch_concurrency and ledger.metadata_page_size must be non-zero",
            ));
        }
        if self.ledger.call_timeout_ms == 0 {
            return Err(AppError::configuration("ledger.call_timeout_ms must be non-zero"));
        }
        Ok(())
    }
}
