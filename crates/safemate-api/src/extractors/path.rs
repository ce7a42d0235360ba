//! Typed path parameter helpers.

use safemate_core::error::AppError;
use safemate_core::types::FolderId;

/// Parses a folder id from its `{collection}/{serial}` path segments.
pub fn parse_folder_id(collection: &str, serial: &str) -> Result<FolderId, AppError> {
    format!("{collection}/{serial}")
        .parse()
        .map_err(|e| AppError::validation(format!("Invalid folder id '{collection}/{serial}': {e}")))
}
