//! Folder tree structures for hierarchical display.

use serde::{Deserialize, Serialize};

use safemate_core::types::FolderId;

use super::model::FolderRecord;

/// A node in a folder tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderNode {
    /// The folder at this node.
    #[serde(flatten)]
    pub record: FolderRecord,
    /// Child folder nodes, in the caller's sibling order.
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    /// Number of folders in this subtree, including this one.
    pub fn subtree_size(&self) -> u64 {
        1 + self.children.iter().map(FolderNode::subtree_size).sum::<u64>()
    }
}

/// Why a folder could not be placed in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum UnresolvedReason {
    /// The parent is not among the known records; it may not have propagated yet.
    Orphan {
        /// The parent reference that could not be resolved.
        missing_parent: FolderId,
    },
    /// Following parent pointers revisits this folder.
    Cycle,
    /// The folder sits deeper than the configured maximum.
    TooDeep {
        /// The depth that exceeded the bound.
        depth: u32,
    },
    /// An ancestor is itself unresolved.
    UnresolvedAncestor {
        /// The nearest unresolved ancestor.
        ancestor: FolderId,
    },
    /// The NFT payload could not be decoded.
    CorruptMetadata {
        /// Decoder diagnostic.
        detail: String,
    },
}

impl UnresolvedReason {
    /// Whether a later listing may resolve this entry without any write.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Orphan { .. } | Self::UnresolvedAncestor { .. })
    }
}

/// A folder kept out of the tree, surfaced to the caller instead of hidden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedFolder {
    /// The NFT the entry came from.
    pub id: FolderId,
    /// The decoded record, absent when the payload was corrupt.
    pub record: Option<FolderRecord>,
    /// Why it is unresolved.
    #[serde(flatten)]
    pub reason: UnresolvedReason,
}

/// The folder forest of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FolderTree {
    /// The root node(s) of the tree.
    pub roots: Vec<FolderNode>,
    /// Folders that could not be placed.
    pub unresolved: Vec<UnresolvedFolder>,
    /// Total number of folders placed in the tree.
    pub total_folders: u64,
    /// Folders whose encoded level disagreed with their position.
    pub releveled: u64,
}

impl FolderTree {
    /// Create an empty folder tree.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether neither the tree nor the unresolved bucket holds anything.
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.unresolved.is_empty()
    }

    /// Depth-first, pre-order walk over every placed node.
    pub fn iter(&self) -> impl Iterator<Item = &FolderNode> {
        let mut stack: Vec<&FolderNode> = self.roots.iter().rev().collect();
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Find a placed node by id.
    pub fn find(&self, id: &FolderId) -> Option<&FolderNode> {
        self.iter().find(|node| node.record.id == *id)
    }

    /// Whether `id` is placed in the tree or listed as unresolved.
    pub fn knows(&self, id: &FolderId) -> bool {
        self.find(id).is_some() || self.unresolved.iter().any(|u| u.id == *id)
    }
}
