//! Ledger client trait for the public ledger that stores folder NFTs.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::types::{
    AccountId, CollectionConfig, CollectionId, CollectionInfo, KeyRef, NftMetadata, SerialRange,
    SigningContext, TokenRelationship,
};

/// Errors reported by a ledger client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The call did not complete within its deadline.
    #[error("ledger call timed out after {0} ms")]
    Timeout(u64),
    /// The ledger (or its mirror) could not be reached.
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
    /// The entity does not exist, or has not propagated yet.
    #[error("ledger entity not found: {0}")]
    NotFound(String),
    /// The ledger refused the transaction (bad signature, missing key, ...).
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

impl LedgerError {
    /// Whether retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::Unavailable(_))
    }
}

/// Result alias for ledger client calls.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Access to the ledger's token service and mirror queries.
///
/// Implementations are stateless with respect to signing identity: every
/// write receives the [`SigningContext`] it must sign with.
#[async_trait]
pub trait LedgerClient: Send + Sync + std::fmt::Debug + 'static {
    /// List the token relationships of an account.
    async fn account_token_relationships(
        &self,
        account_id: &AccountId,
    ) -> LedgerResult<Vec<TokenRelationship>>;

    /// Return the account's public key, if the ledger reports one.
    async fn account_key(&self, account_id: &AccountId) -> LedgerResult<Option<KeyRef>>;

    /// Fetch collection properties.
    async fn collection_info(&self, collection_id: &CollectionId) -> LedgerResult<CollectionInfo>;

    /// Fetch metadata for a range of serials. Serials that are burned or not
    /// yet visible are returned with `metadata: None`.
    async fn nft_metadata(
        &self,
        collection_id: &CollectionId,
        serials: SerialRange,
    ) -> LedgerResult<Vec<NftMetadata>>;

    /// Create a collection whose treasury, admin and supply keys belong to the signer.
    async fn create_collection(
        &self,
        signer: &SigningContext,
        config: &CollectionConfig,
    ) -> LedgerResult<CollectionId>;

    /// Mint one serial with the given metadata; returns the new serial number.
    async fn mint_nft(
        &self,
        signer: &SigningContext,
        collection_id: &CollectionId,
        metadata: Bytes,
    ) -> LedgerResult<u64>;

    /// Burn one serial held by the collection treasury.
    async fn burn_nft(
        &self,
        signer: &SigningContext,
        collection_id: &CollectionId,
        serial: u64,
    ) -> LedgerResult<()>;
}
