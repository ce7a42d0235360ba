//! Timeout and retry policy around a [`LedgerClient`].
//!
//! Reads are retried with exponential backoff while the failure is transient,
//! then surface as `DiscoveryUnavailable`. Writes get the same deadline but are
//! never retried: a timed-out mint may still have landed.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;

use safemate_core::config::ledger::LedgerConfig;
use safemate_core::result::AppResult;
use safemate_core::traits::ledger::{LedgerClient, LedgerError, LedgerResult};
use safemate_core::types::{
    AccountId, CollectionConfig, CollectionId, CollectionInfo, KeyRef, NftMetadata, SerialRange,
    SigningContext, TokenRelationship,
};
use safemate_core::AppError;

/// Ledger access with deadlines, retries and error mapping applied.
#[derive(Debug, Clone)]
pub struct LedgerGateway {
    client: Arc<dyn LedgerClient>,
    config: LedgerConfig,
}

impl LedgerGateway {
    /// Wrap a ledger client.
    pub fn new(client: Arc<dyn LedgerClient>, config: LedgerConfig) -> Self {
        Self { client, config }
    }

    /// The policy in force.
    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    async fn with_deadline<T, Fut>(&self, call: Fut) -> LedgerResult<T>
    where
        Fut: Future<Output = LedgerResult<T>>,
    {
        let timeout = self.config.call_timeout();
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout(timeout.as_millis() as u64)),
        }
    }

    async fn read<T, F, Fut>(&self, operation: &'static str, call: F) -> AppResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = LedgerResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match self.with_deadline(call()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = self.config.backoff(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Ledger read failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(read_error(operation, err)),
            }
        }
    }

    async fn write<T, Fut>(&self, operation: &'static str, call: Fut) -> AppResult<T>
    where
        Fut: Future<Output = LedgerResult<T>>,
    {
        self.with_deadline(call)
            .await
            .map_err(|err| write_error(operation, err))
    }

    /// Token relationships of an account.
    pub async fn account_token_relationships(
        &self,
        account_id: &AccountId,
    ) -> AppResult<Vec<TokenRelationship>> {
        self.read("account_token_relationships", || {
            self.client.account_token_relationships(account_id)
        })
        .await
    }

    /// Public key of an account.
    pub async fn account_key(&self, account_id: &AccountId) -> AppResult<Option<KeyRef>> {
        self.read("account_key", || self.client.account_key(account_id))
            .await
    }

    /// Collection properties.
    pub async fn collection_info(&self, collection_id: &CollectionId) -> AppResult<CollectionInfo> {
        self.read("collection_info", || self.client.collection_info(collection_id))
            .await
    }

    /// Metadata for a range of serials.
    pub async fn nft_metadata(
        &self,
        collection_id: &CollectionId,
        serials: SerialRange,
    ) -> AppResult<Vec<NftMetadata>> {
        self.read("nft_metadata", || {
            self.client.nft_metadata(collection_id, serials)
        })
        .await
    }

    /// Create a collection signed by `signer`.
    pub async fn create_collection(
        &self,
        signer: &SigningContext,
        config: &CollectionConfig,
    ) -> AppResult<CollectionId> {
        self.write(
            "create_collection",
            self.client.create_collection(signer, config),
        )
        .await
    }

    /// Mint one serial.
    pub async fn mint_nft(
        &self,
        signer: &SigningContext,
        collection_id: &CollectionId,
        metadata: Bytes,
    ) -> AppResult<u64> {
        self.write(
            "mint_nft",
            self.client.mint_nft(signer, collection_id, metadata),
        )
        .await
    }

    /// Burn one serial.
    pub async fn burn_nft(
        &self,
        signer: &SigningContext,
        collection_id: &CollectionId,
        serial: u64,
    ) -> AppResult<()> {
        self.write(
            "burn_nft",
            self.client.burn_nft(signer, collection_id, serial),
        )
        .await
    }
}

fn read_error(operation: &str, err: LedgerError) -> AppError {
    match err {
        LedgerError::NotFound(what) => AppError::not_found(format!("{what} not found on ledger")),
        other => AppError::discovery_unavailable(format!("Ledger read '{operation}' failed: {other}")),
    }
}

fn write_error(operation: &str, err: LedgerError) -> AppError {
    match err {
        LedgerError::NotFound(what) => AppError::not_found(format!("{what} not found on ledger")),
        LedgerError::Rejected(reason) => {
            AppError::ledger_rejected(format!("Ledger rejected '{operation}': {reason}"))
        }
        other => AppError::ledger_unavailable(format!("Ledger write '{operation}' failed: {other}")),
    }
}
