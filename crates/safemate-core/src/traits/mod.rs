//! Collaborator traits defined in `safemate-core` and implemented by other crates.

pub mod custody;
pub mod ledger;

pub use custody::KeyCustody;
pub use ledger::{LedgerClient, LedgerError, LedgerResult};
