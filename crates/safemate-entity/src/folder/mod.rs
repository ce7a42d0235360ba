//! Folder domain entities.

pub mod metadata;
pub mod model;
pub mod tree;

pub use metadata::{FolderMetadata, RecordKind};
pub use model::FolderRecord;
pub use tree::{FolderNode, FolderTree, UnresolvedFolder, UnresolvedReason};
