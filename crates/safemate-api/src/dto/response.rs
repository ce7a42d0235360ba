//! Response DTOs.

use serde::{Deserialize, Serialize};

use safemate_core::types::FolderId;
use safemate_entity::folder::{FolderNode, UnresolvedFolder};
use safemate_service::folder::{DiscoveryStats, FolderListing};

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Folder listing: the tree plus everything that could not be placed in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderListResponse {
    /// Whether the request was successful.
    pub success: bool,
    /// Root folders with nested children.
    pub data: Vec<FolderNode>,
    /// Number of folders placed in `data`.
    pub total_folders: u64,
    /// Folders that could not be placed, with reasons.
    pub unresolved: Vec<UnresolvedFolder>,
    /// Expected folders that have not propagated yet.
    pub pending: Vec<FolderId>,
    /// Discovery counters.
    pub stats: DiscoveryStats,
}

impl From<FolderListing> for FolderListResponse {
    fn from(listing: FolderListing) -> Self {
        Self {
            success: true,
            data: listing.tree.roots,
            total_folders: listing.tree.total_folders,
            unresolved: listing.tree.unresolved,
            pending: listing.pending,
            stats: listing.stats,
        }
    }
}

/// Simple message response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Message.
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `ok` while the server is serving.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Seconds since the server started.
    pub uptime_seconds: u64,
}
