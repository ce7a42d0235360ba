//! # safemate-entity
//!
//! Domain entity models for SafeMate: folder records reconstructed from NFT
//! metadata, the folder tree handed to callers, and the collection/ownership
//! view used during discovery. All entities derive `Debug`, `Clone`,
//! `Serialize`, and `Deserialize`.

pub mod collection;
pub mod folder;

pub use collection::{CollectionHandle, OwnershipBasis, OwnershipClaim};
pub use folder::{
    FolderMetadata, FolderNode, FolderRecord, FolderTree, RecordKind, UnresolvedFolder,
    UnresolvedReason,
};
