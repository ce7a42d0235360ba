//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use safemate_core::config::AppConfig;
use safemate_service::folder::FolderService;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Folder command and query service
    pub folder_service: Arc<FolderService>,
    /// When the process started serving
    pub started_at: Instant,
}

impl AppState {
    /// Creates the state from configuration and a wired folder service.
    pub fn new(config: Arc<AppConfig>, folder_service: Arc<FolderService>) -> Self {
        Self {
            config,
            folder_service,
            started_at: Instant::now(),
        }
    }
}
