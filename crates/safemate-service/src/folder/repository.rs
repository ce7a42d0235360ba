//! Folder repository: re-derives folders from the ledger and writes new ones.
//!
//! There is no local database. Every listing walks the account's token
//! relationships, keeps the folder collections the account owns, fetches and
//! decodes their NFT metadata, and builds the tree from what it finds.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use safemate_core::config::folder::FolderConfig;
use safemate_core::config::ledger::LedgerConfig;
use safemate_core::error::{AppError, ErrorKind};
use safemate_core::result::AppResult;
use safemate_core::traits::ledger::LedgerClient;
use safemate_core::types::{
    AccountId, CollectionConfig, CollectionId, FolderId, KeyRef, NftMetadata, SerialRange,
    SigningContext,
};
use safemate_entity::collection::{CollectionHandle, OwnershipClaim};
use safemate_entity::folder::{
    FolderMetadata, FolderRecord, FolderTree, UnresolvedFolder, UnresolvedReason,
};
use safemate_ledger::codec;
use safemate_ledger::{FolderClassifier, HolderFacts, LedgerGateway};

use super::tree::{self, SiblingOrder};

/// Options for a folder listing.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Sibling order of the built tree.
    pub order: SiblingOrder,
    /// Folders the caller just created and expects to see.
    pub expect: Vec<FolderId>,
}

/// Counters describing one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryStats {
    /// Token relationships examined.
    pub collections_scanned: u64,
    /// Folder collections the account owns.
    pub collections_owned: u64,
    /// Payloads that decoded.
    pub records_decoded: u64,
    /// Payloads that failed to decode.
    pub corrupt_records: u64,
    /// Decoded payloads that are not folders.
    pub non_folder_records: u64,
    /// Serials with no visible payload (burned or not yet propagated).
    pub absent_serials: u64,
    /// Whether the shared collection fallback ran.
    pub used_fallback: bool,
}

/// Result of a folder listing.
#[derive(Debug, Clone)]
pub struct FolderListing {
    /// The folder forest, including unresolved entries.
    pub tree: FolderTree,
    /// Expected folders that did not appear in time.
    pub pending: Vec<FolderId>,
    /// Discovery counters from the final pass.
    pub stats: DiscoveryStats,
}

/// A folder collection selected for scanning.
#[derive(Debug, Clone)]
struct ScanTarget {
    handle: CollectionHandle,
    /// Keep only records whose owner tag is the account.
    owner_filtered: bool,
}

/// Reconstructs folders from ledger state and mints new ones.
#[derive(Debug)]
pub struct FolderRepository {
    gateway: LedgerGateway,
    classifier: FolderClassifier,
    config: FolderConfig,
    /// Serialises first-collection creation per account. Entries live only
    /// while a creation is in flight.
    creation_locks: DashMap<AccountId, Arc<Mutex<()>>>,
    /// Collections this process resolved whose token relationship may not be
    /// visible yet. Dropped once discovery sees the relationship.
    collections: DashMap<AccountId, CollectionId>,
}

impl FolderRepository {
    /// Create a repository over a ledger client.
    pub fn new(client: Arc<dyn LedgerClient>, ledger: LedgerConfig, folders: FolderConfig) -> Self {
        Self {
            gateway: LedgerGateway::new(client, ledger),
            classifier: FolderClassifier::new(&folders),
            config: folders,
            creation_locks: DashMap::new(),
            collections: DashMap::new(),
        }
    }

    /// Folder policy in force.
    pub fn folder_config(&self) -> &FolderConfig {
        &self.config
    }

    /// List every folder the account can see.
    ///
    /// When `options.expect` names folders that are not yet settled, the
    /// listing is repeated with backoff; ids still missing after the last
    /// pass are returned in `pending`.
    pub async fn list_folders(
        &self,
        account_id: &AccountId,
        options: &ListOptions,
        cancel: &CancellationToken,
    ) -> AppResult<FolderListing> {
        let mut attempt = 0;
        loop {
            let (tree, stats) = self.discover(account_id, &options.order, cancel).await?;
            let pending: Vec<FolderId> = options
                .expect
                .iter()
                .filter(|id| !is_settled(&tree, id))
                .copied()
                .collect();

            if pending.is_empty() || attempt >= self.gateway.config().propagation_retries {
                if !pending.is_empty() {
                    info!(account = %account_id, pending = pending.len(), "Expected folders not yet visible");
                }
                return Ok(FolderListing {
                    tree,
                    pending,
                    stats,
                });
            }

            attempt += 1;
            let delay = self.gateway.config().backoff(attempt);
            debug!(
                account = %account_id,
                attempt,
                waiting_for = pending.len(),
                delay_ms = delay.as_millis() as u64,
                "Waiting for folders to propagate"
            );
            guarded(cancel, async {
                tokio::time::sleep(delay).await;
                Ok(())
            })
            .await?;
        }
    }

    /// One discovery pass.
    async fn discover(
        &self,
        account_id: &AccountId,
        order: &SiblingOrder,
        cancel: &CancellationToken,
    ) -> AppResult<(FolderTree, DiscoveryStats)> {
        let mut stats = DiscoveryStats::default();

        let relationships =
            guarded(cancel, self.gateway.account_token_relationships(account_id)).await?;
        let account_key = guarded(cancel, self.gateway.account_key(account_id)).await?;
        stats.collections_scanned = relationships.len() as u64;

        let mut balances: BTreeMap<CollectionId, u64> = relationships
            .iter()
            .map(|r| (r.collection_id, r.balance))
            .collect();
        if let Some(own) = self.collections.get(account_id).map(|c| *c) {
            if balances.contains_key(&own) {
                // The relationship has propagated; the ledger is authoritative again.
                self.collections.remove_if(account_id, |_, id| *id == own);
            } else {
                balances.insert(own, 0);
            }
        }
        debug!(account = %account_id, relationships = balances.len(), "Discovering folder collections");

        let handles = guarded(cancel, self.handles(balances.keys().copied().collect())).await?;

        let mut targets = Vec::new();
        for handle in handles {
            if !self.classifier.is_folder_collection(&handle) {
                continue;
            }
            let facts = HolderFacts {
                balance: balances.get(&handle.collection_id).copied().unwrap_or(0),
                account_key: account_key.as_ref(),
            };
            let Some(claim) = self.classifier.ownership_of(account_id, &handle, facts) else {
                continue;
            };
            debug!(
                collection = %handle.collection_id,
                basis = ?claim.primary(),
                "Owned folder collection"
            );
            stats.collections_owned += 1;
            targets.push(ScanTarget {
                owner_filtered: self.is_shared(&handle.collection_id),
                handle,
            });
        }

        let mut records = Vec::new();
        let mut rejected = Vec::new();
        let pages = guarded(cancel, self.fetch_pages(&targets)).await?;
        self.decode_pages(account_id, pages, &mut records, &mut rejected, &mut stats);

        // The shared collection is scanned as a fallback when nothing else was
        // found, and whenever an owned folder hangs under a folder kept there.
        let scanned_shared = targets.iter().any(|t| t.owner_filtered);
        let parent_in_shared = records
            .iter()
            .chain(rejected.iter().filter_map(|u| u.record.as_ref()))
            .filter_map(|r| r.parent_id)
            .any(|p| self.is_shared(&p.collection_id));
        if (records.is_empty() || parent_in_shared) && !scanned_shared {
            if let Some(shared) = self.config.shared_collection_id {
                stats.used_fallback = true;
                debug!(account = %account_id, collection = %shared, "Falling back to shared folder collection");
                let handles = guarded(cancel, self.handles(vec![shared])).await?;
                let fallback: Vec<ScanTarget> = handles
                    .into_iter()
                    .filter(|h| self.classifier.is_folder_collection(h))
                    .map(|handle| ScanTarget {
                        handle,
                        owner_filtered: true,
                    })
                    .collect();
                let pages = guarded(cancel, self.fetch_pages(&fallback)).await?;
                self.decode_pages(account_id, pages, &mut records, &mut rejected, &mut stats);
            }
        }

        let tree = tree::assemble(records, rejected, self.config.max_depth, order);
        debug!(
            account = %account_id,
            folders = tree.total_folders,
            unresolved = tree.unresolved.len(),
            "Folder discovery complete"
        );
        Ok((tree, stats))
    }

    /// Fetch collection properties; collections not yet visible are skipped.
    async fn handles(&self, ids: Vec<CollectionId>) -> AppResult<Vec<CollectionHandle>> {
        let results: Vec<(CollectionId, AppResult<_>)> = stream::iter(ids)
            .map(|id| async move { (id, self.gateway.collection_info(&id).await) })
            .buffer_unordered(self.gateway.config().fetch_concurrency)
            .collect()
            .await;

        let mut handles = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(info) => handles.push(CollectionHandle::from_info(id, info)),
                Err(err) if err.kind == ErrorKind::NotFound => {
                    debug!(collection = %id, "Collection not visible yet, skipping");
                }
                Err(err) => return Err(err),
            }
        }
        handles.sort_by_key(|h| h.collection_id);
        Ok(handles)
    }

    /// Fetch every serial of every target, page by page, with bounded fan-out.
    async fn fetch_pages(
        &self,
        targets: &[ScanTarget],
    ) -> AppResult<Vec<(CollectionId, bool, Vec<NftMetadata>)>> {
        let page_size = self.gateway.config().metadata_page_size;
        let requests: Vec<(CollectionId, bool, SerialRange)> = targets
            .iter()
            .flat_map(|t| {
                SerialRange::pages(t.handle.total_minted_serials, page_size)
                    .into_iter()
                    .map(move |range| (t.handle.collection_id, t.owner_filtered, range))
            })
            .collect();

        let results: Vec<_> = stream::iter(requests)
            .map(|(id, filtered, range)| async move {
                (id, filtered, self.gateway.nft_metadata(&id, range).await)
            })
            .buffer_unordered(self.gateway.config().fetch_concurrency)
            .collect()
            .await;

        let mut pages = Vec::with_capacity(results.len());
        for (id, filtered, result) in results {
            match result {
                Ok(page) => pages.push((id, filtered, page)),
                Err(err) if err.kind == ErrorKind::NotFound => {
                    debug!(collection = %id, "Collection vanished during scan, skipping");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(pages)
    }

    fn decode_pages(
        &self,
        account_id: &AccountId,
        pages: Vec<(CollectionId, bool, Vec<NftMetadata>)>,
        records: &mut Vec<FolderRecord>,
        rejected: &mut Vec<UnresolvedFolder>,
        stats: &mut DiscoveryStats,
    ) {
        for (collection_id, owner_filtered, page) in pages {
            for nft in page {
                let id = FolderId::new(collection_id, nft.serial);
                let Some(payload) = nft.metadata else {
                    stats.absent_serials += 1;
                    continue;
                };
                let metadata = match codec::decode(&payload) {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        stats.corrupt_records += 1;
                        warn!(folder = %id, error = %err, "Undecodable folder metadata");
                        // Ownership of a record in the shared collection rests on its
                        // owner tag, which a corrupt payload cannot show.
                        if !owner_filtered {
                            rejected.push(UnresolvedFolder {
                                id,
                                record: None,
                                reason: UnresolvedReason::CorruptMetadata {
                                    detail: err.to_string(),
                                },
                            });
                        }
                        continue;
                    }
                };
                stats.records_decoded += 1;

                if !metadata.is_folder() {
                    stats.non_folder_records += 1;
                    continue;
                }
                if owner_filtered && metadata.owner != *account_id {
                    continue;
                }

                let depth = metadata.depth;
                let record = FolderRecord::from_metadata(id, metadata);
                if depth > self.config.max_depth {
                    rejected.push(UnresolvedFolder {
                        id,
                        record: Some(record),
                        reason: UnresolvedReason::TooDeep {
                            depth: u32::from(depth),
                        },
                    });
                } else {
                    records.push(record);
                }
            }
        }
    }

    /// Read and decode one folder visible to `account_id`.
    pub async fn get_folder(&self, account_id: &AccountId, id: &FolderId) -> AppResult<FolderRecord> {
        let metadata = self.read_metadata(id).await?;
        if !metadata.is_folder() {
            return Err(AppError::not_found(format!("{id} is not a folder")));
        }
        self.authorize_read(account_id, &id.collection_id, &metadata)
            .await?;
        Ok(FolderRecord::from_metadata(*id, metadata))
    }

    /// Create a folder, creating the account's collection first if needed.
    ///
    /// The parent is validated before anything is written. The returned record
    /// is built locally and may not be visible to listings yet.
    pub async fn create_folder(
        &self,
        account_id: &AccountId,
        signer: &SigningContext,
        name: &str,
        parent_id: Option<FolderId>,
    ) -> AppResult<FolderRecord> {
        ensure_signer(account_id, signer)?;

        let name = codec::truncate_name(name).to_string();
        let metadata = match parent_id {
            None => FolderMetadata::root_folder(name, *account_id),
            Some(parent_id) => {
                let parent = self.read_metadata(&parent_id).await?;
                if !parent.is_folder() {
                    return Err(AppError::validation(format!("{parent_id} is not a folder")));
                }
                self.authorize_read(account_id, &parent_id.collection_id, &parent)
                    .await?;
                let level = self.structural_level(parent_id, &parent).await?;
                FolderMetadata::child_folder(name, *account_id, parent_id, level)
            }
        };

        let collection_id = self.resolve_collection(account_id, signer).await?;
        let serial = self
            .gateway
            .mint_nft(signer, &collection_id, codec::encode(&metadata))
            .await?;

        let id = FolderId::new(collection_id, serial);
        info!(
            account = %account_id,
            folder = %id,
            level = metadata.depth,
            "Folder created"
        );
        Ok(FolderRecord::from_metadata(id, metadata))
    }

    /// Burn a folder in the account's own collection.
    ///
    /// Folders with visible children are refused.
    pub async fn delete_folder(
        &self,
        account_id: &AccountId,
        signer: &SigningContext,
        id: &FolderId,
    ) -> AppResult<()> {
        ensure_signer(account_id, signer)?;

        let info = self.gateway.collection_info(&id.collection_id).await?;
        let handle = CollectionHandle::from_info(id.collection_id, info);
        if !self.classifier.is_folder_collection(&handle) {
            return Err(AppError::not_found(format!("{id} is not a folder")));
        }
        if handle.treasury_account_id != *account_id {
            return Err(AppError::forbidden(
                "Folders can only be deleted from the account's own collection",
            ));
        }

        let metadata = self.read_metadata(id).await?;
        if !metadata.is_folder() {
            return Err(AppError::not_found(format!("{id} is not a folder")));
        }

        let (tree, _) = self
            .discover(account_id, &SiblingOrder::Serial, &CancellationToken::new())
            .await?;
        let has_children = tree
            .iter()
            .map(|node| &node.record)
            .chain(tree.unresolved.iter().filter_map(|u| u.record.as_ref()))
            .any(|record| record.parent_id == Some(*id));
        if has_children {
            return Err(AppError::conflict(format!(
                "Folder {id} still has child folders"
            )));
        }

        self.gateway
            .burn_nft(signer, &id.collection_id, id.serial)
            .await?;
        info!(account = %account_id, folder = %id, "Folder deleted");
        Ok(())
    }

    async fn read_metadata(&self, id: &FolderId) -> AppResult<FolderMetadata> {
        let range = SerialRange::single(id.serial)
            .ok_or_else(|| AppError::validation("Serial numbers start at 1"))?;
        let payload = self
            .gateway
            .nft_metadata(&id.collection_id, range)
            .await?
            .into_iter()
            .find(|nft| nft.serial == id.serial)
            .and_then(|nft| nft.metadata)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))?;
        Ok(codec::decode(&payload)?)
    }

    /// Check that `account_id` may read a record of `collection_id`.
    async fn authorize_read(
        &self,
        account_id: &AccountId,
        collection_id: &CollectionId,
        metadata: &FolderMetadata,
    ) -> AppResult<()> {
        if self.is_shared(collection_id) {
            return if metadata.owner == *account_id {
                Ok(())
            } else {
                Err(AppError::forbidden("Folder belongs to another account"))
            };
        }

        let info = self.gateway.collection_info(collection_id).await?;
        let handle = CollectionHandle::from_info(*collection_id, info);
        if !self.classifier.is_folder_collection(&handle) {
            return Err(AppError::not_found(format!(
                "{collection_id} is not a folder collection"
            )));
        }
        if metadata.owner == *account_id || handle.treasury_account_id == *account_id {
            return Ok(());
        }

        match self.claim(account_id, &handle).await? {
            Some(_) => Ok(()),
            None => Err(AppError::forbidden("Folder belongs to another account")),
        }
    }

    /// Level of `parent_id` counted along its parent chain.
    ///
    /// The encoded depth is not trusted. Fails with `DepthExceeded` when a
    /// child of `parent_id` would sit deeper than `max_depth`, after at most
    /// `max_depth` ancestor reads.
    async fn structural_level(
        &self,
        parent_id: FolderId,
        parent: &FolderMetadata,
    ) -> AppResult<u8> {
        let max_depth = self.config.max_depth;
        let too_deep = || {
            AppError::depth_exceeded(format!(
                "Parent {parent_id} is too deep; folders may be at most {max_depth} levels deep"
            ))
        };

        let mut level: u8 = 0;
        let mut seen = BTreeSet::from([parent_id]);
        let mut next = parent.parent;
        while let Some(ancestor_id) = next {
            level += 1;
            if level >= max_depth {
                return Err(too_deep());
            }
            if !seen.insert(ancestor_id) {
                return Err(AppError::validation(format!(
                    "Parent {parent_id} is part of a folder cycle"
                )));
            }
            let ancestor = self.read_metadata(&ancestor_id).await.map_err(|e| {
                if e.kind == ErrorKind::NotFound {
                    AppError::validation(format!(
                        "Parent {parent_id} has no visible ancestor {ancestor_id}"
                    ))
                } else {
                    e
                }
            })?;
            if !ancestor.is_folder() {
                return Err(AppError::validation(format!(
                    "Ancestor {ancestor_id} of {parent_id} is not a folder"
                )));
            }
            next = ancestor.parent;
        }

        if level >= max_depth {
            return Err(too_deep());
        }
        Ok(level)
    }

    /// Full ownership judgment for one collection.
    async fn claim(
        &self,
        account_id: &AccountId,
        handle: &CollectionHandle,
    ) -> AppResult<Option<OwnershipClaim>> {
        let balance = self
            .gateway
            .account_token_relationships(account_id)
            .await?
            .into_iter()
            .find(|r| r.collection_id == handle.collection_id)
            .map_or(0, |r| r.balance);
        let key: Option<KeyRef> = self.gateway.account_key(account_id).await?;
        Ok(self.classifier.ownership_of(
            account_id,
            handle,
            HolderFacts {
                balance,
                account_key: key.as_ref(),
            },
        ))
    }

    /// Find or create the account's own folder collection, at most once.
    async fn resolve_collection(
        &self,
        account_id: &AccountId,
        signer: &SigningContext,
    ) -> AppResult<CollectionId> {
        if let Some(id) = self.collections.get(account_id).map(|c| *c) {
            return Ok(id);
        }

        let lock = self
            .creation_locks
            .entry(*account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.resolve_collection_locked(account_id, signer).await
        };
        drop(lock);
        self.release_creation_lock(account_id);
        result
    }

    async fn resolve_collection_locked(
        &self,
        account_id: &AccountId,
        signer: &SigningContext,
    ) -> AppResult<CollectionId> {
        if let Some(id) = self.collections.get(account_id).map(|c| *c) {
            return Ok(id);
        }

        if let Some(id) = self.find_own_collection(account_id).await? {
            debug!(account = %account_id, collection = %id, "Using existing folder collection");
            self.collections.insert(*account_id, id);
            return Ok(id);
        }

        let config = CollectionConfig {
            name: format!("{} {account_id}", self.config.collection_name_prefix),
            symbol: self.classifier.primary_symbol().to_string(),
            memo: format!("SafeMate folders for {account_id}"),
        };
        let id = self.gateway.create_collection(signer, &config).await?;
        self.collections.insert(*account_id, id);
        info!(account = %account_id, collection = %id, "Folder collection created");
        Ok(id)
    }

    /// Forget the account's creation lock once nobody else holds or awaits it.
    fn release_creation_lock(&self, account_id: &AccountId) {
        self.creation_locks
            .remove_if(account_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// The lowest-numbered visible primary collection whose treasury is the account.
    async fn find_own_collection(&self, account_id: &AccountId) -> AppResult<Option<CollectionId>> {
        let ids = self
            .gateway
            .account_token_relationships(account_id)
            .await?
            .into_iter()
            .map(|r| r.collection_id)
            .collect();
        Ok(self
            .handles(ids)
            .await?
            .into_iter()
            .find(|h| {
                self.classifier.is_primary_collection(h) && h.treasury_account_id == *account_id
            })
            .map(|h| h.collection_id))
    }

    fn is_shared(&self, collection_id: &CollectionId) -> bool {
        self.config.shared_collection_id == Some(*collection_id)
    }
}

/// Whether an expected folder has shown up in a form later passes will not change.
fn is_settled(tree: &FolderTree, id: &FolderId) -> bool {
    tree.find(id).is_some()
        || tree
            .unresolved
            .iter()
            .any(|u| u.id == *id && !u.reason.is_retriable())
}

fn ensure_signer(account_id: &AccountId, signer: &SigningContext) -> AppResult<()> {
    if signer.account_id() == *account_id {
        Ok(())
    } else {
        Err(AppError::unauthorized(format!(
            "Signing context for {} cannot act for {account_id}",
            signer.account_id()
        )))
    }
}

/// Run `fut` unless `cancel` fires first.
async fn guarded<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = AppResult<T>>,
) -> AppResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::cancelled("Folder listing cancelled")),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use safemate_core::traits::custody::KeyCustody;
    use safemate_core::traits::ledger::LedgerError;
    use safemate_entity::folder::RecordKind;
    use safemate_ledger::memory::{InMemoryKeyCustody, InMemoryLedger, provision_account};

    const ALICE: AccountId = AccountId::new(0, 0, 1001);
    const BOB: AccountId = AccountId::new(0, 0, 2002);
    const OPERATOR: AccountId = AccountId::new(0, 0, 2);

    struct Fixture {
        ledger: InMemoryLedger,
        custody: InMemoryKeyCustody,
        repo: Arc<FolderRepository>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with(InMemoryLedger::new(), FolderConfig::default())
        }

        fn with(ledger: InMemoryLedger, folders: FolderConfig) -> Self {
            let repo = FolderRepository::new(Arc::new(ledger.clone()), LedgerConfig::default(), folders);
            Self {
                ledger,
                custody: InMemoryKeyCustody::new(),
                repo: Arc::new(repo),
            }
        }

        async fn signer(&self, account: AccountId) -> SigningContext {
            provision_account(&self.ledger, &self.custody, account);
            self.custody.signing_context(&account).await.unwrap()
        }

        async fn list(&self, account: AccountId) -> FolderListing {
            self.repo
                .list_folders(&account, &ListOptions::default(), &CancellationToken::new())
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;

        let docs = fx.repo.create_folder(&ALICE, &alice, "Documents", None).await.unwrap();
        let reports = fx
            .repo
            .create_folder(&ALICE, &alice, "Reports", Some(docs.id))
            .await
            .unwrap();
        assert_eq!(reports.level, 1);
        assert_eq!(reports.parent_id, Some(docs.id));

        let listing = fx.list(ALICE).await;
        assert_eq!(listing.tree.total_folders, 2);
        assert_eq!(listing.tree.roots.len(), 1);
        assert_eq!(listing.tree.roots[0].record, docs);
        assert_eq!(listing.tree.roots[0].children[0].record, reports);
        assert_eq!(listing.stats.collections_owned, 1);
        assert!(!listing.stats.used_fallback);
    }

    #[tokio::test]
    async fn test_long_name_is_truncated_consistently() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        let long = "An exceptionally long folder name that will not fit";

        let created = fx.repo.create_folder(&ALICE, &alice, long, None).await.unwrap();
        assert_eq!(created.name.chars().count(), codec::MAX_NAME_CHARS);

        let listing = fx.list(ALICE).await;
        assert_eq!(listing.tree.roots[0].record.name, created.name);
    }

    #[tokio::test]
    async fn test_depth_enforced_before_any_write() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        let max_depth = fx.repo.folder_config().max_depth;

        let mut parent = fx.repo.create_folder(&ALICE, &alice, "L0", None).await.unwrap();
        for level in 1..=max_depth {
            parent = fx
                .repo
                .create_folder(&ALICE, &alice, &format!("L{level}"), Some(parent.id))
                .await
                .unwrap();
            assert_eq!(parent.level, level);
        }

        let writes = fx.ledger.write_calls();
        let err = fx
            .repo
            .create_folder(&ALICE, &alice, "TooDeep", Some(parent.id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DepthExceeded);
        assert_eq!(fx.ledger.write_calls(), writes);
    }

    #[tokio::test]
    async fn test_parent_level_comes_from_its_chain() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        let max_depth = fx.repo.folder_config().max_depth;

        let root = fx.repo.create_folder(&ALICE, &alice, "L0", None).await.unwrap();
        let mut deepest = root.clone();
        for level in 1..=max_depth {
            deepest = fx
                .repo
                .create_folder(&ALICE, &alice, &format!("L{level}"), Some(deepest.id))
                .await
                .unwrap();
        }

        // Encoded one level below root, structurally one below the deepest folder.
        let understated = FolderMetadata::child_folder("Understated", ALICE, deepest.id, 0);
        let serial = fx
            .ledger
            .seed_raw_nft(&root.collection_id, ALICE, codec::encode(&understated))
            .unwrap();
        let understated_id = FolderId::new(root.collection_id, serial);

        let writes = fx.ledger.write_calls();
        let err = fx
            .repo
            .create_folder(&ALICE, &alice, "Below", Some(understated_id))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DepthExceeded);
        assert_eq!(fx.ledger.write_calls(), writes);

        // Encoded deep, structurally directly under the root.
        let overstated = FolderMetadata::child_folder("Overstated", ALICE, root.id, max_depth - 1);
        let serial = fx
            .ledger
            .seed_raw_nft(&root.collection_id, ALICE, codec::encode(&overstated))
            .unwrap();
        let child = fx
            .repo
            .create_folder(&ALICE, &alice, "Fits", Some(FolderId::new(root.collection_id, serial)))
            .await
            .unwrap();
        assert_eq!(child.level, 2);
    }

    #[tokio::test]
    async fn test_concurrent_first_folders_share_one_collection() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let repo = Arc::clone(&fx.repo);
                let signer = alice.clone();
                tokio::spawn(async move {
                    repo.create_folder(&ALICE, &signer, &format!("Folder {i}"), None)
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(fx.ledger.collections_owned_by(&ALICE), 1);
        assert_eq!(fx.list(ALICE).await.tree.total_folders, 8);
    }

    #[tokio::test]
    async fn test_existing_collection_is_reused_after_restart() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        fx.repo.create_folder(&ALICE, &alice, "First", None).await.unwrap();

        let restarted = FolderRepository::new(
            Arc::new(fx.ledger.clone()),
            LedgerConfig::default(),
            FolderConfig::default(),
        );
        restarted.create_folder(&ALICE, &alice, "Second", None).await.unwrap();

        assert_eq!(fx.ledger.collections_owned_by(&ALICE), 1);
        assert_eq!(fx.list(ALICE).await.tree.total_folders, 2);
    }

    #[tokio::test]
    async fn test_signer_must_match_account() {
        let fx = Fixture::new();
        let bob = fx.signer(BOB).await;
        let err = fx.repo.create_folder(&ALICE, &bob, "X", None).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unauthorized);
        assert_eq!(fx.ledger.write_calls(), 0);
    }

    #[tokio::test]
    async fn test_fallback_to_shared_collection() {
        let ledger = InMemoryLedger::new();
        let shared = ledger.seed_collection(OPERATOR, "SMFOLDER", "SafeMate Shared", None);
        let mine = codec::encode(&FolderMetadata::root_folder("Legacy", ALICE));
        let theirs = codec::encode(&FolderMetadata::root_folder("Not mine", BOB));
        ledger.seed_raw_nft(&shared, OPERATOR, mine).unwrap();
        ledger.seed_raw_nft(&shared, OPERATOR, theirs).unwrap();

        let fx = Fixture::with(
            ledger,
            FolderConfig {
                shared_collection_id: Some(shared),
                ..FolderConfig::default()
            },
        );
        fx.signer(ALICE).await;

        let listing = fx.list(ALICE).await;
        assert!(listing.stats.used_fallback);
        assert_eq!(listing.tree.total_folders, 1);
        assert_eq!(listing.tree.roots[0].record.name, "Legacy");
    }

    #[tokio::test]
    async fn test_child_of_shared_folder_stays_in_tree() {
        let ledger = InMemoryLedger::new();
        let shared = ledger.seed_collection(OPERATOR, "SMFOLDER", "SafeMate Shared", None);
        let legacy = codec::encode(&FolderMetadata::root_folder("Legacy", ALICE));
        let serial = ledger.seed_raw_nft(&shared, OPERATOR, legacy).unwrap();
        let legacy_id = FolderId::new(shared, serial);

        let fx = Fixture::with(
            ledger,
            FolderConfig {
                shared_collection_id: Some(shared),
                ..FolderConfig::default()
            },
        );
        let alice = fx.signer(ALICE).await;
        assert_eq!(fx.list(ALICE).await.tree.total_folders, 1);

        let child = fx
            .repo
            .create_folder(&ALICE, &alice, "Inside legacy", Some(legacy_id))
            .await
            .unwrap();
        assert_eq!(child.level, 1);
        assert_ne!(child.collection_id, shared);

        let listing = fx.list(ALICE).await;
        assert!(listing.stats.used_fallback);
        assert!(listing.tree.unresolved.is_empty(), "{:?}", listing.tree.unresolved);
        assert_eq!(listing.tree.total_folders, 2);
        assert_eq!(listing.tree.roots[0].record.id, legacy_id);
        assert_eq!(listing.tree.roots[0].children[0].record, child);
    }

    #[tokio::test]
    async fn test_shared_collection_is_filtered_even_when_held() {
        let ledger = InMemoryLedger::new();
        let shared = ledger.seed_collection(OPERATOR, "SMFLDR", "SafeMate Shared", None);
        let mine = codec::encode(&FolderMetadata::root_folder("Mine", ALICE));
        let theirs = codec::encode(&FolderMetadata::root_folder("Theirs", BOB));
        ledger.seed_raw_nft(&shared, ALICE, mine).unwrap();
        ledger.seed_raw_nft(&shared, ALICE, theirs).unwrap();

        let fx = Fixture::with(
            ledger,
            FolderConfig {
                shared_collection_id: Some(shared),
                ..FolderConfig::default()
            },
        );
        fx.signer(ALICE).await;

        let listing = fx.list(ALICE).await;
        assert!(!listing.stats.used_fallback);
        let names: Vec<_> = listing.tree.iter().map(|n| n.record.name.as_str()).collect();
        assert_eq!(names, vec!["Mine"]);
    }

    #[tokio::test]
    async fn test_unrelated_and_look_alike_collections_are_ignored() {
        let fx = Fixture::new();
        fx.signer(ALICE).await;
        let lookalike = fx.ledger.seed_collection(ALICE, "SMFOLDERX", "Not folders", None);
        let payload = codec::encode(&FolderMetadata::root_folder("Nope", ALICE));
        fx.ledger.seed_raw_nft(&lookalike, ALICE, payload).unwrap();

        let listing = fx.list(ALICE).await;
        assert!(listing.tree.is_empty());
        assert_eq!(listing.stats.collections_scanned, 1);
        assert_eq!(listing.stats.collections_owned, 0);
    }

    #[tokio::test]
    async fn test_corrupt_and_foreign_records_are_reported() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        let root = fx.repo.create_folder(&ALICE, &alice, "Root", None).await.unwrap();
        let collection = root.collection_id;

        fx.ledger
            .seed_raw_nft(&collection, ALICE, Bytes::from_static(b"{\"name\":\"json\"}"))
            .unwrap();
        let file = FolderMetadata {
            kind: RecordKind::File,
            name: "notes.txt".to_string(),
            parent: Some(root.id),
            depth: 1,
            owner: ALICE,
        };
        fx.ledger.seed_raw_nft(&collection, ALICE, codec::encode(&file)).unwrap();

        let listing = fx.list(ALICE).await;
        assert_eq!(listing.tree.total_folders, 1);
        assert_eq!(listing.stats.corrupt_records, 1);
        assert_eq!(listing.stats.non_folder_records, 1);
        assert_eq!(listing.tree.unresolved.len(), 1);
        assert!(matches!(
            listing.tree.unresolved[0].reason,
            UnresolvedReason::CorruptMetadata { .. }
        ));
    }

    #[tokio::test]
    async fn test_encoded_depth_over_limit_is_unresolved() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        let root = fx.repo.create_folder(&ALICE, &alice, "Root", None).await.unwrap();
        let deep = FolderMetadata::child_folder("Deep", ALICE, root.id, 9);
        fx.ledger
            .seed_raw_nft(&root.collection_id, ALICE, codec::encode(&deep))
            .unwrap();

        let listing = fx.list(ALICE).await;
        assert_eq!(listing.tree.total_folders, 1);
        assert_eq!(
            listing.tree.unresolved[0].reason,
            UnresolvedReason::TooDeep { depth: 10 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_ledger_is_not_an_empty_listing() {
        let fx = Fixture::new();
        fx.signer(ALICE).await;
        assert!(fx.list(ALICE).await.tree.is_empty());

        fx.ledger.fail_reads(LedgerError::Unavailable("mirror down".into()), 20);
        let err = fx
            .repo
            .list_folders(&ALICE, &ListOptions::default(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::DiscoveryUnavailable);
    }

    #[tokio::test]
    async fn test_cancelled_listing() {
        let fx = Fixture::new();
        fx.signer(ALICE).await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = fx
            .repo
            .list_folders(&ALICE, &ListOptions::default(), &cancel)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expected_folders_wait_for_propagation() {
        let ledger = InMemoryLedger::with_propagation_delay(Duration::from_millis(1_000));
        let fx = Fixture::with(ledger, FolderConfig::default());
        let alice = fx.signer(ALICE).await;

        let created = fx.repo.create_folder(&ALICE, &alice, "Fresh", None).await.unwrap();
        let options = ListOptions {
            expect: vec![created.id],
            ..ListOptions::default()
        };

        let listing = fx
            .repo
            .list_folders(&ALICE, &options, &CancellationToken::new())
            .await
            .unwrap();
        assert!(listing.pending.is_empty());
        assert_eq!(listing.tree.find(&created.id).map(|n| &n.record), Some(&created));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expected_folders_reported_pending() {
        let ledger = InMemoryLedger::with_propagation_delay(Duration::from_secs(60));
        let fx = Fixture::with(ledger, FolderConfig::default());
        let alice = fx.signer(ALICE).await;

        let created = fx.repo.create_folder(&ALICE, &alice, "Slow", None).await.unwrap();
        let options = ListOptions {
            expect: vec![created.id],
            ..ListOptions::default()
        };
        let listing = fx
            .repo
            .list_folders(&ALICE, &options, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(listing.pending, vec![created.id]);
        assert!(listing.tree.is_empty());
    }

    #[tokio::test]
    async fn test_get_folder_access() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        fx.signer(BOB).await;
        let docs = fx.repo.create_folder(&ALICE, &alice, "Docs", None).await.unwrap();

        assert_eq!(fx.repo.get_folder(&ALICE, &docs.id).await.unwrap(), docs);
        let err = fx.repo.get_folder(&BOB, &docs.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);

        let missing = FolderId::new(docs.collection_id, 99);
        let err = fx.repo.get_folder(&ALICE, &missing).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_held_folders_are_readable_but_not_deletable() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        let bob = fx.signer(BOB).await;
        let docs = fx.repo.create_folder(&ALICE, &alice, "Docs", None).await.unwrap();
        assert!(fx.ledger.transfer(&docs.collection_id, docs.serial_number, BOB));

        let listing = fx.list(BOB).await;
        assert_eq!(listing.tree.total_folders, 1);
        assert!(fx.repo.get_folder(&BOB, &docs.id).await.is_ok());

        let err = fx.repo.delete_folder(&BOB, &bob, &docs.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Forbidden);
    }

    #[tokio::test]
    async fn test_treasury_without_balance_still_lists() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        fx.signer(BOB).await;
        let docs = fx.repo.create_folder(&ALICE, &alice, "Docs", None).await.unwrap();
        let child = fx
            .repo
            .create_folder(&ALICE, &alice, "Child", Some(docs.id))
            .await
            .unwrap();
        for folder in [&docs, &child] {
            assert!(fx.ledger.transfer(&folder.collection_id, folder.serial_number, BOB));
        }

        let listing = fx.list(ALICE).await;
        assert_eq!(listing.stats.collections_owned, 1);
        assert_eq!(listing.tree.total_folders, 2);
    }

    #[tokio::test]
    async fn test_frozen_relationship_keeps_ownership() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        let docs = fx.repo.create_folder(&ALICE, &alice, "Docs", None).await.unwrap();
        fx.ledger.set_frozen(ALICE, docs.collection_id, true);

        let listing = fx.list(ALICE).await;
        assert_eq!(listing.tree.total_folders, 1);

        fx.ledger.set_frozen(ALICE, docs.collection_id, false);
        assert_eq!(fx.list(ALICE).await.tree.total_folders, 1);
    }

    #[tokio::test]
    async fn test_association_alone_is_not_ownership() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        fx.signer(BOB).await;
        let docs = fx.repo.create_folder(&ALICE, &alice, "Docs", None).await.unwrap();
        fx.ledger.associate(BOB, docs.collection_id);

        let listing = fx.list(BOB).await;
        assert_eq!(listing.stats.collections_scanned, 1);
        assert_eq!(listing.stats.collections_owned, 0);
        assert!(listing.tree.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_creation_bookkeeping_is_released() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        fx.ledger.set_propagation_delay(Duration::from_secs(5));

        fx.repo.create_folder(&ALICE, &alice, "Docs", None).await.unwrap();
        assert!(fx.repo.creation_locks.is_empty());
        assert_eq!(fx.repo.collections.len(), 1);

        tokio::time::advance(Duration::from_secs(6)).await;
        let listing = fx.list(ALICE).await;
        assert_eq!(listing.tree.total_folders, 1);
        assert!(fx.repo.collections.is_empty());
    }

    #[tokio::test]
    async fn test_delete_folder() {
        let fx = Fixture::new();
        let alice = fx.signer(ALICE).await;
        let docs = fx.repo.create_folder(&ALICE, &alice, "Docs", None).await.unwrap();
        let child = fx
            .repo
            .create_folder(&ALICE, &alice, "Child", Some(docs.id))
            .await
            .unwrap();

        let err = fx.repo.delete_folder(&ALICE, &alice, &docs.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        fx.repo.delete_folder(&ALICE, &alice, &child.id).await.unwrap();
        fx.repo.delete_folder(&ALICE, &alice, &docs.id).await.unwrap();

        let listing = fx.list(ALICE).await;
        assert!(listing.tree.is_empty());
        assert_eq!(listing.stats.absent_serials, 2);
    }
}
