//! Core type definitions used across the SafeMate workspace.

pub mod id;
pub mod ledger;

pub use id::{AccountId, CollectionId, EntityId, FolderId, IdParseError};
pub use ledger::{
    CollectionConfig, CollectionInfo, KeyRef, NftMetadata, SerialRange, SigningContext,
    TokenRelationship,
};
