//! Folder record reconstructed from the ledger.

use serde::{Deserialize, Serialize};

use safemate_core::types::{AccountId, CollectionId, FolderId};

use super::metadata::FolderMetadata;

/// One folder as re-derived from its NFT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderRecord {
    /// `(collection, serial)` of the folder NFT.
    pub id: FolderId,
    /// Folder name.
    pub name: String,
    /// Parent folder ID (null for root folders).
    pub parent_id: Option<FolderId>,
    /// Depth in the folder tree (0 for root).
    pub level: u8,
    /// Account presumed to control the folder.
    pub owner_account_id: AccountId,
    /// The collection the folder NFT belongs to.
    pub collection_id: CollectionId,
    /// The NFT serial within the collection.
    pub serial_number: u64,
}

impl FolderRecord {
    /// Build a record from a decoded payload found at `id`.
    pub fn from_metadata(id: FolderId, metadata: FolderMetadata) -> Self {
        Self {
            id,
            name: metadata.name,
            parent_id: metadata.parent,
            level: metadata.depth,
            owner_account_id: metadata.owner,
            collection_id: id.collection_id,
            serial_number: id.serial,
        }
    }

    /// Check if this is a root folder (no parent).
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}
