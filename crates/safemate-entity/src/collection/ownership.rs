//! Ownership claims: why an account is considered to own a collection.

use serde::{Deserialize, Serialize};

use safemate_core::types::{AccountId, CollectionId};

/// One way an account can own a collection, most authoritative first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "camelCase")]
pub enum OwnershipBasis {
    /// The account currently holds serials of the collection.
    Balance {
        /// Serials held.
        serials: u64,
    },
    /// The account is the collection treasury.
    Treasury,
    /// The account's key is the collection admin key.
    AdminKey,
}

/// The judgment that `account_id` owns `collection_id`, with every basis that held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipClaim {
    /// The claiming account.
    pub account_id: AccountId,
    /// The claimed collection.
    pub collection_id: CollectionId,
    /// Satisfied bases in precedence order; never empty.
    pub bases: Vec<OwnershipBasis>,
}

impl OwnershipClaim {
    /// The most authoritative basis that held.
    pub fn primary(&self) -> OwnershipBasis {
        self.bases[0]
    }

    /// Whether the claim rests on treasury control.
    pub fn is_treasury(&self) -> bool {
        self.bases.contains(&OwnershipBasis::Treasury)
    }

    /// Whether a specific kind of basis held.
    pub fn holds(&self, basis: OwnershipBasis) -> bool {
        self.bases.iter().any(|b| match (b, basis) {
            (OwnershipBasis::Balance { .. }, OwnershipBasis::Balance { .. }) => true,
            (a, b) => *a == b,
        })
    }
}
