//! Decoded contents of a folder or file NFT's metadata payload.

use serde::{Deserialize, Serialize};

use safemate_core::types::{AccountId, FolderId};

/// What an NFT in a folder collection represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// A folder.
    Folder,
    /// A file stored under a folder.
    File,
}

/// The fields carried on-chain for one NFT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMetadata {
    /// Folder or file.
    pub kind: RecordKind,
    /// Display name (possibly truncated at mint).
    pub name: String,
    /// Parent folder, `None` for roots.
    pub parent: Option<FolderId>,
    /// Encoded depth; 0 for roots.
    pub depth: u8,
    /// Account the record was minted for.
    pub owner: AccountId,
}

impl FolderMetadata {
    /// Metadata for a root folder.
    pub fn root_folder(name: impl Into<String>, owner: AccountId) -> Self {
        Self {
            kind: RecordKind::Folder,
            name: name.into(),
            parent: None,
            depth: 0,
            owner,
        }
    }

    /// Metadata for a folder nested under `parent`, which sits at `parent_depth`.
    pub fn child_folder(
        name: impl Into<String>,
        owner: AccountId,
        parent: FolderId,
        parent_depth: u8,
    ) -> Self {
        Self {
            kind: RecordKind::Folder,
            name: name.into(),
            parent: Some(parent),
            depth: parent_depth.saturating_add(1),
            owner,
        }
    }

    /// Whether this payload describes a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == RecordKind::Folder
    }
}
