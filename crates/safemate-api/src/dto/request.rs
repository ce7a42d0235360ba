//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use safemate_core::error::AppError;
use safemate_core::types::FolderId;
use safemate_service::folder::SiblingOrder;

/// Create folder request body.
///
/// Name rules beyond the length guard are enforced by the folder service so
/// they apply to every caller, not just HTTP.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    /// Folder name.
    #[validate(length(max = 1024, message = "Folder name is too long"))]
    pub name: String,
    /// Parent folder as `shard.realm.num/serial`.
    pub parent_id: Option<String>,
    /// The parent's level as last seen by the client.
    pub parent_level: Option<u8>,
}

impl CreateFolderRequest {
    /// Parse the optional parent id.
    pub fn parent(&self) -> Result<Option<FolderId>, AppError> {
        self.parent_id
            .as_deref()
            .map(|raw| {
                raw.parse()
                    .map_err(|e| AppError::validation(format!("Invalid parentId: {e}")))
            })
            .transpose()
    }
}

/// Query string for `GET /api/folders`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListFoldersQuery {
    /// `name` or `serial` (default).
    pub order: Option<String>,
    /// Comma-separated folder ids the client just created.
    pub expect: Option<String>,
}

impl ListFoldersQuery {
    /// Parse the sibling order.
    pub fn sibling_order(&self) -> Result<SiblingOrder, AppError> {
        match self.order.as_deref() {
            None | Some("serial") => Ok(SiblingOrder::Serial),
            Some("name") => Ok(SiblingOrder::Name),
            Some(other) => Err(AppError::validation(format!(
                "Unknown order '{other}', expected 'name' or 'serial'"
            ))),
        }
    }

    /// Parse the expected folder ids.
    pub fn expected(&self) -> Result<Vec<FolderId>, AppError> {
        self.expect
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse()
                    .map_err(|e| AppError::validation(format!("Invalid expect id '{s}': {e}")))
            })
            .collect()
    }
}
