//! Collection handle: the domain view of a ledger token collection.

use serde::{Deserialize, Serialize};

use safemate_core::types::{AccountId, CollectionId, CollectionInfo, KeyRef};

/// A token collection as seen by folder discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionHandle {
    /// Collection identifier.
    pub collection_id: CollectionId,
    /// Display name.
    pub display_name: String,
    /// Symbol used for classification.
    pub symbol_tag: String,
    /// Account holding un-transferred supply.
    pub treasury_account_id: AccountId,
    /// Admin key, if the collection has one.
    pub admin_key: Option<KeyRef>,
    /// Highest serial minted so far; only ever grows.
    pub total_minted_serials: u64,
}

impl CollectionHandle {
    /// Combine a collection id with the properties the ledger reported for it.
    pub fn from_info(collection_id: CollectionId, info: CollectionInfo) -> Self {
        Self {
            collection_id,
            display_name: info.name,
            symbol_tag: info.symbol,
            treasury_account_id: info.treasury_account_id,
            admin_key: info.admin_key,
            total_minted_serials: info.total_minted_serials,
        }
    }
}
