//! Folder discovery, hierarchy building, and folder commands.

pub mod repository;
pub mod service;
pub mod tree;

pub use repository::{DiscoveryStats, FolderListing, FolderRepository, ListOptions};
pub use service::{CreateFolderRequest, FolderService};
pub use tree::SiblingOrder;
