//! Folder collection classification and ownership judgment.

use safemate_core::config::folder::FolderConfig;
use safemate_core::types::{AccountId, KeyRef};
use safemate_entity::collection::{CollectionHandle, OwnershipBasis, OwnershipClaim};

/// What the ledger reported about an account's relation to one collection.
#[derive(Debug, Clone, Copy, Default)]
pub struct HolderFacts<'a> {
    /// Serials of the collection held by the account.
    pub balance: u64,
    /// The account's public key, if known.
    pub account_key: Option<&'a KeyRef>,
}

/// Decides which collections hold folders and who owns them.
///
/// Symbol matching is exact: no case folding, no prefix or substring match.
#[derive(Debug, Clone)]
pub struct FolderClassifier {
    primary_symbol: String,
    folder_symbols: Vec<String>,
}

impl FolderClassifier {
    /// Create a classifier from folder policy.
    pub fn new(config: &FolderConfig) -> Self {
        Self {
            primary_symbol: config.primary_symbol.clone(),
            folder_symbols: config.folder_symbols.clone(),
        }
    }

    /// Symbol new per-account collections are created with.
    pub fn primary_symbol(&self) -> &str {
        &self.primary_symbol
    }

    /// Whether the collection's symbol is on the allow-list.
    pub fn is_folder_collection(&self, handle: &CollectionHandle) -> bool {
        self.folder_symbols.iter().any(|s| *s == handle.symbol_tag)
    }

    /// Whether the collection carries the primary symbol.
    pub fn is_primary_collection(&self, handle: &CollectionHandle) -> bool {
        handle.symbol_tag == self.primary_symbol
    }

    /// Judge whether `account_id` owns the collection.
    ///
    /// Every basis is checked; the claim lists those that held in precedence
    /// order (balance, treasury, admin key). Returns `None` when none held.
    pub fn ownership_of(
        &self,
        account_id: &AccountId,
        handle: &CollectionHandle,
        facts: HolderFacts<'_>,
    ) -> Option<OwnershipClaim> {
        let mut bases = Vec::with_capacity(3);

        if facts.balance > 0 {
            bases.push(OwnershipBasis::Balance {
                serials: facts.balance,
            });
        }
        if handle.treasury_account_id == *account_id {
            bases.push(OwnershipBasis::Treasury);
        }
        if let (Some(admin), Some(key)) = (&handle.admin_key, facts.account_key) {
            if admin == key {
                bases.push(OwnershipBasis::AdminKey);
            }
        }

        (!bases.is_empty()).then(|| OwnershipClaim {
            account_id: *account_id,
            collection_id: handle.collection_id,
            bases,
        })
    }
}
