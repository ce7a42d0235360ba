//! Folder discovery policy: allow-listed symbols, depth bound, legacy collection.

use serde::{Deserialize, Serialize};

use crate::types::CollectionId;

/// Folder classification and hierarchy policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderConfig {
    /// Deepest allowed level (roots are level 0).
    #[serde(default = "default_max_depth")]
    pub max_depth: u8,
    /// Symbol new per-account folder collections are created with.
    #[serde(default = "default_primary_symbol")]
    pub primary_symbol: String,
    /// Every symbol that marks a folder collection; must include `primary_symbol`.
    #[serde(default = "default_folder_symbols")]
    pub folder_symbols: Vec<String>,
    /// Shared collection that predates per-account collections.
    #[serde(default)]
    pub shared_collection_id: Option<CollectionId>,
    /// Prefix for the display name of new per-account collections.
    #[serde(default = "default_collection_name_prefix")]
    pub collection_name_prefix: String,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            primary_symbol: default_primary_symbol(),
            folder_symbols: default_folder_symbols(),
            shared_collection_id: None,
            collection_name_prefix: default_collection_name_prefix(),
        }
    }
}

fn default_max_depth() -> u8 {
    4
}

fn default_primary_symbol() -> String {
    "SMFOLDER".to_string()
}

fn default_folder_symbols() -> Vec<String> {
    vec!["SMFOLDER".to_string(), "SMFLDR".to_string()]
}

fn default_collection_name_prefix() -> String {
    "SafeMate Folders".to_string()
}
