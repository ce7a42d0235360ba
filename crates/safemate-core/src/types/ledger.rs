//! Value types exchanged with the ledger client.

use std::fmt;
use std::ops::RangeInclusive;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::id::{AccountId, CollectionId};

/// A public key reference as reported by the ledger (e.g. `ed25519:<hex>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyRef(pub String);

impl KeyRef {
    /// Create a key reference.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Return the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of an account's token relationships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRelationship {
    /// The associated collection.
    pub collection_id: CollectionId,
    /// Number of serials of this collection held by the account.
    pub balance: u64,
    /// Whether the account is frozen for this collection.
    pub is_frozen: bool,
}

/// Collection properties as reported by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection symbol.
    pub symbol: String,
    /// Collection display name.
    pub name: String,
    /// Account that receives newly minted serials.
    pub treasury_account_id: AccountId,
    /// Key authorised to alter the collection, if any.
    pub admin_key: Option<KeyRef>,
    /// Highest serial minted so far (burned serials included).
    pub total_minted_serials: u64,
}

/// Metadata of one NFT serial, `None` when the serial is burned or not visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftMetadata {
    /// The serial number.
    pub serial: u64,
    /// The raw metadata payload.
    pub metadata: Option<Bytes>,
}

/// An inclusive, non-empty range of serial numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerialRange {
    /// First serial (>= 1).
    pub start: u64,
    /// Last serial (inclusive).
    pub end: u64,
}

impl SerialRange {
    /// Create a range; returns `None` when empty or starting at 0.
    pub fn new(start: u64, end: u64) -> Option<Self> {
        (start >= 1 && end >= start).then_some(Self { start, end })
    }

    /// A single-serial range.
    pub fn single(serial: u64) -> Option<Self> {
        Self::new(serial, serial)
    }

    /// Number of serials covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Ranges are never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterate the serials.
    pub fn serials(&self) -> RangeInclusive<u64> {
        self.start..=self.end
    }

    /// Split `1..=total` into consecutive pages of at most `page_size` serials.
    pub fn pages(total: u64, page_size: u64) -> Vec<Self> {
        let page_size = page_size.max(1);
        let mut pages = Vec::new();
        let mut start = 1;
        while start <= total {
            let end = total.min(start.saturating_add(page_size - 1));
            pages.push(Self { start, end });
            start = end + 1;
        }
        pages
    }
}

/// Properties of a new collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Display name.
    pub name: String,
    /// Symbol tag; must be one the classifier recognises.
    pub symbol: String,
    /// Optional memo stored with the collection.
    #[serde(default)]
    pub memo: String,
}

/// Opaque per-call signing handle produced by key custody.
///
/// Carries the account it signs for and that account's public key. The
/// secret material is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningContext {
    account_id: AccountId,
    public_key: KeyRef,
    secret: String,
}

impl SigningContext {
    /// Create a signing context.
    pub fn new(account_id: AccountId, public_key: KeyRef, secret: impl Into<String>) -> Self {
        Self {
            account_id,
            public_key,
            secret: secret.into(),
        }
    }

    /// The account this context signs for.
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// The public half of the signing key.
    pub fn public_key(&self) -> &KeyRef {
        &self.public_key
    }

    /// The secret handle, for ledger client implementations only.
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningContext")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key)
            .field("secret", &"<redacted>")
            .finish()
    }
}
