//! In-process sandbox ledger.
//!
//! Simulates the token service and its mirror without a network: accounts and
//! their keys, collections with treasury/admin keys, NFTs with per-serial
//! metadata, and token relationships. Writes become visible to reads only after
//! the configured propagation delay, which lets callers exercise the
//! write-then-read lag of a real ledger. Faults can be queued per call class.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;

use safemate_core::traits::ledger::{LedgerClient, LedgerError, LedgerResult};
use safemate_core::types::{
    AccountId, CollectionConfig, CollectionId, CollectionInfo, KeyRef, NftMetadata, SerialRange,
    SigningContext, TokenRelationship,
};

/// First entity number handed out to sandbox collections.
const FIRST_COLLECTION_NUM: u64 = 5_000;

#[derive(Debug)]
struct Nft {
    metadata: Bytes,
    holder: AccountId,
    visible_at: Instant,
    burned: bool,
}

#[derive(Debug)]
struct Collection {
    symbol: String,
    name: String,
    treasury: AccountId,
    admin_key: Option<KeyRef>,
    visible_at: Instant,
    nfts: BTreeMap<u64, Nft>,
}

impl Collection {
    fn is_visible(&self, now: Instant) -> bool {
        self.visible_at <= now
    }

    fn visible_serials(&self, now: Instant) -> u64 {
        self.nfts
            .iter()
            .rev()
            .find(|(_, nft)| nft.visible_at <= now)
            .map_or(0, |(serial, _)| *serial)
    }

    fn balance_of(&self, account: &AccountId, now: Instant) -> u64 {
        self.nfts
            .values()
            .filter(|nft| !nft.burned && nft.holder == *account && nft.visible_at <= now)
            .count() as u64
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    next_num: u64,
    keys: HashMap<AccountId, KeyRef>,
    collections: BTreeMap<CollectionId, Collection>,
    associations: HashMap<AccountId, BTreeSet<CollectionId>>,
    frozen: BTreeSet<(AccountId, CollectionId)>,
    read_faults: VecDeque<LedgerError>,
    write_faults: VecDeque<LedgerError>,
}

/// Counters of calls made against the sandbox.
#[derive(Debug, Default)]
struct CallCounters {
    reads: AtomicU64,
    writes: AtomicU64,
}

/// Sandbox implementation of [`LedgerClient`].
///
/// Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
    counters: Arc<CallCounters>,
    propagation_delay: Arc<Mutex<Duration>>,
    read_latency: Arc<Mutex<Duration>>,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    /// Create an empty sandbox with immediate propagation.
    pub fn new() -> Self {
        Self::with_propagation_delay(Duration::ZERO)
    }

    /// Create an empty sandbox whose writes take `delay` to become readable.
    pub fn with_propagation_delay(delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(LedgerState {
                next_num: FIRST_COLLECTION_NUM,
                ..LedgerState::default()
            })),
            counters: Arc::new(CallCounters::default()),
            propagation_delay: Arc::new(Mutex::new(delay)),
            read_latency: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn delay(&self) -> Duration {
        *self.propagation_delay.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Change the propagation delay applied to later writes.
    pub fn set_propagation_delay(&self, delay: Duration) {
        *self.propagation_delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// Make every read call take `latency` before answering.
    pub fn set_read_latency(&self, latency: Duration) {
        *self.read_latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    /// Register an account and its public key.
    pub fn register_account(&self, account_id: AccountId, key: KeyRef) {
        self.lock().keys.insert(account_id, key);
        tracing::debug!(account = %account_id, "[Sandbox] Registered account");
    }

    /// Queue an error returned by the next read call(s), one per call.
    pub fn fail_reads(&self, error: LedgerError, times: usize) {
        let mut state = self.lock();
        state.read_faults.extend(std::iter::repeat_n(error, times));
    }

    /// Queue an error returned by the next write call.
    pub fn fail_next_write(&self, error: LedgerError) {
        self.lock().write_faults.push_back(error);
    }

    /// Number of read calls served so far.
    pub fn read_calls(&self) -> u64 {
        self.counters.reads.load(Ordering::SeqCst)
    }

    /// Number of write calls served so far.
    pub fn write_calls(&self) -> u64 {
        self.counters.writes.load(Ordering::SeqCst)
    }

    /// Reset both call counters.
    pub fn reset_counters(&self) {
        self.counters.reads.store(0, Ordering::SeqCst);
        self.counters.writes.store(0, Ordering::SeqCst);
    }

    /// Create a collection without a signature, immediately visible.
    ///
    /// Used to stage collections the service did not create, such as a
    /// shared legacy collection or a third-party token.
    pub fn seed_collection(
        &self,
        treasury: AccountId,
        symbol: &str,
        name: &str,
        admin_key: Option<KeyRef>,
    ) -> CollectionId {
        let mut state = self.lock();
        let id = Self::allocate(&mut state);
        state.collections.insert(
            id,
            Collection {
                symbol: symbol.to_string(),
                name: name.to_string(),
                treasury,
                admin_key,
                visible_at: Instant::now(),
                nfts: BTreeMap::new(),
            },
        );
        state.associations.entry(treasury).or_default().insert(id);
        id
    }

    /// Mint raw metadata without a signature, immediately visible, held by `holder`.
    pub fn seed_raw_nft(
        &self,
        collection_id: &CollectionId,
        holder: AccountId,
        metadata: impl Into<Bytes>,
    ) -> Option<u64> {
        let mut state = self.lock();
        let collection = state.collections.get_mut(collection_id)?;
        let serial = collection.nfts.keys().next_back().map_or(1, |s| s + 1);
        collection.nfts.insert(
            serial,
            Nft {
                metadata: metadata.into(),
                holder,
                visible_at: Instant::now(),
                burned: false,
            },
        );
        state.associations.entry(holder).or_default().insert(*collection_id);
        Some(serial)
    }

    /// Associate an account with a collection without moving any serial.
    pub fn associate(&self, account_id: AccountId, collection_id: CollectionId) {
        self.lock()
            .associations
            .entry(account_id)
            .or_default()
            .insert(collection_id);
    }

    /// Freeze or unfreeze an account's relationship with a collection.
    pub fn set_frozen(&self, account_id: AccountId, collection_id: CollectionId, frozen: bool) {
        let mut state = self.lock();
        if frozen {
            state.frozen.insert((account_id, collection_id));
        } else {
            state.frozen.remove(&(account_id, collection_id));
        }
    }

    /// Move one serial to another account.
    pub fn transfer(&self, collection_id: &CollectionId, serial: u64, to: AccountId) -> bool {
        let mut state = self.lock();
        let Some(nft) = state
            .collections
            .get_mut(collection_id)
            .and_then(|c| c.nfts.get_mut(&serial))
        else {
            return false;
        };
        if nft.burned {
            return false;
        }
        nft.holder = to;
        state.associations.entry(to).or_default().insert(*collection_id);
        true
    }

    /// Number of collections whose treasury is `account_id`, visible or not.
    pub fn collections_owned_by(&self, account_id: &AccountId) -> usize {
        self.lock()
            .collections
            .values()
            .filter(|c| c.treasury == *account_id)
            .count()
    }

    fn allocate(state: &mut LedgerState) -> CollectionId {
        let id = CollectionId::new(0, 0, state.next_num);
        state.next_num += 1;
        id
    }

    async fn begin_read(&self) -> LedgerResult<()> {
        self.counters.reads.fetch_add(1, Ordering::SeqCst);
        let latency = *self.read_latency.lock().unwrap_or_else(|e| e.into_inner());
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        match self.lock().read_faults.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn begin_write(&self, state: &mut LedgerState, signer: &SigningContext) -> LedgerResult<()> {
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = state.write_faults.pop_front() {
            return Err(err);
        }
        match state.keys.get(&signer.account_id()) {
            Some(key) if key == signer.public_key() => Ok(()),
            Some(_) => Err(LedgerError::Rejected("INVALID_SIGNATURE".to_string())),
            None => Err(LedgerError::Rejected("INVALID_ACCOUNT_ID".to_string())),
        }
    }

    fn treasury_collection<'a>(
        state: &'a mut LedgerState,
        signer: &SigningContext,
        collection_id: &CollectionId,
    ) -> LedgerResult<&'a mut Collection> {
        let collection = state
            .collections
            .get_mut(collection_id)
            .ok_or_else(|| LedgerError::NotFound(collection_id.to_string()))?;
        if collection.treasury != signer.account_id() {
            return Err(LedgerError::Rejected("INVALID_SUPPLY_KEY".to_string()));
        }
        Ok(collection)
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn account_token_relationships(
        &self,
        account_id: &AccountId,
    ) -> LedgerResult<Vec<TokenRelationship>> {
        self.begin_read().await?;
        let now = Instant::now();
        let state = self.lock();
        if !state.keys.contains_key(account_id) {
            return Err(LedgerError::NotFound(account_id.to_string()));
        }
        let Some(associated) = state.associations.get(account_id) else {
            return Ok(Vec::new());
        };
        Ok(associated
            .iter()
            .filter_map(|id| {
                let collection = state.collections.get(id)?;
                collection.is_visible(now).then(|| TokenRelationship {
                    collection_id: *id,
                    balance: collection.balance_of(account_id, now),
                    is_frozen: state.frozen.contains(&(*account_id, *id)),
                })
            })
            .collect())
    }

    async fn account_key(&self, account_id: &AccountId) -> LedgerResult<Option<KeyRef>> {
        self.begin_read().await?;
        Ok(self.lock().keys.get(account_id).cloned())
    }

    async fn collection_info(&self, collection_id: &CollectionId) -> LedgerResult<CollectionInfo> {
        self.begin_read().await?;
        let now = Instant::now();
        let state = self.lock();
        let collection = state
            .collections
            .get(collection_id)
            .filter(|c| c.is_visible(now))
            .ok_or_else(|| LedgerError::NotFound(collection_id.to_string()))?;
        Ok(CollectionInfo {
            symbol: collection.symbol.clone(),
            name: collection.name.clone(),
            treasury_account_id: collection.treasury,
            admin_key: collection.admin_key.clone(),
            total_minted_serials: collection.visible_serials(now),
        })
    }

    async fn nft_metadata(
        &self,
        collection_id: &CollectionId,
        serials: SerialRange,
    ) -> LedgerResult<Vec<NftMetadata>> {
        self.begin_read().await?;
        let now = Instant::now();
        let state = self.lock();
        let collection = state
            .collections
            .get(collection_id)
            .filter(|c| c.is_visible(now))
            .ok_or_else(|| LedgerError::NotFound(collection_id.to_string()))?;
        Ok(serials
            .serials()
            .map(|serial| NftMetadata {
                serial,
                metadata: collection
                    .nfts
                    .get(&serial)
                    .filter(|nft| !nft.burned && nft.visible_at <= now)
                    .map(|nft| nft.metadata.clone()),
            })
            .collect())
    }

    async fn create_collection(
        &self,
        signer: &SigningContext,
        config: &CollectionConfig,
    ) -> LedgerResult<CollectionId> {
        let visible_at = Instant::now() + self.delay();
        let mut state = self.lock();
        self.begin_write(&mut state, signer)?;
        let treasury = signer.account_id();
        let id = Self::allocate(&mut state);
        state.collections.insert(
            id,
            Collection {
                symbol: config.symbol.clone(),
                name: config.name.clone(),
                treasury,
                admin_key: Some(signer.public_key().clone()),
                visible_at,
                nfts: BTreeMap::new(),
            },
        );
        state.associations.entry(treasury).or_default().insert(id);
        tracing::info!(collection = %id, treasury = %treasury, symbol = %config.symbol, "[Sandbox] Collection created");
        Ok(id)
    }

    async fn mint_nft(
        &self,
        signer: &SigningContext,
        collection_id: &CollectionId,
        metadata: Bytes,
    ) -> LedgerResult<u64> {
        if metadata.len() > crate::codec::METADATA_BUDGET {
            return Err(LedgerError::Rejected("METADATA_TOO_LONG".to_string()));
        }
        let visible_at = Instant::now() + self.delay();
        let mut state = self.lock();
        self.begin_write(&mut state, signer)?;
        let collection = Self::treasury_collection(&mut state, signer, collection_id)?;
        let serial = collection.nfts.keys().next_back().map_or(1, |s| s + 1);
        collection.nfts.insert(
            serial,
            Nft {
                metadata,
                holder: signer.account_id(),
                visible_at,
                burned: false,
            },
        );
        tracing::info!(collection = %collection_id, serial, "[Sandbox] NFT minted");
        Ok(serial)
    }

    async fn burn_nft(
        &self,
        signer: &SigningContext,
        collection_id: &CollectionId,
        serial: u64,
    ) -> LedgerResult<()> {
        let mut state = self.lock();
        self.begin_write(&mut state, signer)?;
        let treasury = signer.account_id();
        let collection = Self::treasury_collection(&mut state, signer, collection_id)?;
        let nft = collection
            .nfts
            .get_mut(&serial)
            .filter(|nft| !nft.burned)
            .ok_or_else(|| LedgerError::NotFound(format!("{collection_id}/{serial}")))?;
        if nft.holder != treasury {
            return Err(LedgerError::Rejected(
                "TREASURY_MUST_OWN_BURNED_NFT".to_string(),
            ));
        }
        nft.burned = true;
        tracing::info!(collection = %collection_id, serial, "[Sandbox] NFT burned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(ledger: &InMemoryLedger, num: u64) -> SigningContext {
        let account = AccountId::new(0, 0, num);
        let key = KeyRef::new(format!("ed25519:{num:04x}"));
        ledger.register_account(account, key.clone());
        SigningContext::new(account, key, "secret")
    }

    fn folders() -> CollectionConfig {
        CollectionConfig {
            name: "SafeMate Folders".to_string(),
            symbol: "SMFOLDER".to_string(),
            memo: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_mint_and_read_back() {
        let ledger = InMemoryLedger::new();
        let alice = signer(&ledger, 1001);

        let collection = ledger.create_collection(&alice, &folders()).await.unwrap();
        let serial = ledger
            .mint_nft(&alice, &collection, Bytes::from_static(b"abc"))
            .await
            .unwrap();
        assert_eq!(serial, 1);

        let info = ledger.collection_info(&collection).await.unwrap();
        assert_eq!(info.treasury_account_id, alice.account_id());
        assert_eq!(info.admin_key.as_ref(), Some(alice.public_key()));
        assert_eq!(info.total_minted_serials, 1);

        let relationships = ledger
            .account_token_relationships(&alice.account_id())
            .await
            .unwrap();
        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].balance, 1);

        let range = SerialRange::new(1, 2).unwrap();
        let metadata = ledger.nft_metadata(&collection, range).await.unwrap();
        assert_eq!(metadata[0].metadata.as_deref(), Some(&b"abc"[..]));
        assert_eq!(metadata[1].metadata, None);
    }

    #[tokio::test]
    async fn test_rejects_wrong_key_and_foreign_treasury() {
        let ledger = InMemoryLedger::new();
        let alice = signer(&ledger, 1001);
        let bob = signer(&ledger, 2002);
        let forged = SigningContext::new(alice.account_id(), bob.public_key().clone(), "x");

        let err = ledger.create_collection(&forged, &folders()).await.unwrap_err();
        assert_eq!(err, LedgerError::Rejected("INVALID_SIGNATURE".to_string()));

        let collection = ledger.create_collection(&alice, &folders()).await.unwrap();
        let err = ledger
            .mint_nft(&bob, &collection, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Rejected(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_writes_become_visible_after_delay() {
        let ledger = InMemoryLedger::with_propagation_delay(Duration::from_secs(2));
        let alice = signer(&ledger, 1001);

        let collection = ledger.create_collection(&alice, &folders()).await.unwrap();
        assert!(matches!(
            ledger.collection_info(&collection).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(
            ledger
                .account_token_relationships(&alice.account_id())
                .await
                .unwrap()
                .is_empty()
        );

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(ledger.collection_info(&collection).await.is_ok());
    }

    #[tokio::test]
    async fn test_fault_injection_and_counters() {
        let ledger = InMemoryLedger::new();
        let alice = signer(&ledger, 1001);
        ledger.fail_reads(LedgerError::Unavailable("mirror".into()), 2);

        assert!(ledger.account_key(&alice.account_id()).await.is_err());
        assert!(ledger.account_key(&alice.account_id()).await.is_err());
        assert_eq!(
            ledger.account_key(&alice.account_id()).await.unwrap(),
            Some(alice.public_key().clone())
        );
        assert_eq!(ledger.read_calls(), 3);
        assert_eq!(ledger.write_calls(), 0);
    }

    #[tokio::test]
    async fn test_burn_requires_treasury_custody() {
        let ledger = InMemoryLedger::new();
        let alice = signer(&ledger, 1001);
        let bob = signer(&ledger, 2002);
        let collection = ledger.create_collection(&alice, &folders()).await.unwrap();
        let first = ledger
            .mint_nft(&alice, &collection, Bytes::from_static(b"1"))
            .await
            .unwrap();
        let second = ledger
            .mint_nft(&alice, &collection, Bytes::from_static(b"2"))
            .await
            .unwrap();

        assert!(ledger.transfer(&collection, second, bob.account_id()));
        assert!(matches!(
            ledger.burn_nft(&alice, &collection, second).await,
            Err(LedgerError::Rejected(_))
        ));

        ledger.burn_nft(&alice, &collection, first).await.unwrap();
        assert!(matches!(
            ledger.burn_nft(&alice, &collection, first).await,
            Err(LedgerError::NotFound(_))
        ));
        let range = SerialRange::single(first).unwrap();
        let metadata = ledger.nft_metadata(&collection, range).await.unwrap();
        assert_eq!(metadata[0].metadata, None);
    }
}
