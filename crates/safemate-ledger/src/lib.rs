//! # safemate-ledger
//!
//! Everything that touches the ledger representation of folders:
//!
//! - **codec**: the compact binary metadata payload carried by folder NFTs
//! - **classifier**: which collections hold folders, and who owns them
//! - **gateway**: per-call deadlines, read retries, and error mapping
//! - **memory**: an in-process sandbox ledger and key custody

pub mod classifier;
pub mod codec;
pub mod gateway;
pub mod memory;

pub use classifier::{FolderClassifier, HolderFacts};
pub use codec::{decode, encode, CodecError};
pub use gateway::LedgerGateway;
