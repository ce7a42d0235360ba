//! Sandbox ledger and key custody held entirely in process memory.

pub mod custody;
pub mod ledger;

pub use custody::InMemoryKeyCustody;
pub use ledger::InMemoryLedger;

use safemate_core::types::{AccountId, KeyRef};

/// Create a custody key for `account_id` and register it with the ledger.
pub fn provision_account(
    ledger: &InMemoryLedger,
    custody: &InMemoryKeyCustody,
    account_id: AccountId,
) -> KeyRef {
    let key = custody.provision(account_id);
    ledger.register_account(account_id, key.clone());
    key
}
