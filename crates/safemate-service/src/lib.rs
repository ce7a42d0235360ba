//! # safemate-service
//!
//! Business logic for SafeMate folders. The repository re-derives each
//! account's folder tree from ledger state on every read and mints new
//! folders as NFTs; the folder service validates commands and resolves
//! signing contexts before delegating to it.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references.

pub mod context;
pub mod folder;

pub use context::RequestContext;
pub use folder::{
    CreateFolderRequest, DiscoveryStats, FolderListing, FolderRepository, FolderService,
    ListOptions, SiblingOrder,
};
