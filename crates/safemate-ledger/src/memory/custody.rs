//! In-process key custody for the sandbox ledger.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use safemate_core::result::AppResult;
use safemate_core::traits::custody::KeyCustody;
use safemate_core::types::{AccountId, KeyRef, SigningContext};
use safemate_core::AppError;

#[derive(Debug, Clone)]
struct StoredKey {
    public_key: KeyRef,
    secret: String,
}

/// Key custody backed by a concurrent map of generated keys.
#[derive(Debug, Clone, Default)]
pub struct InMemoryKeyCustody {
    keys: Arc<DashMap<AccountId, StoredKey>>,
}

impl InMemoryKeyCustody {
    /// Create an empty custody.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate and store a key for `account_id`, returning its public half.
    ///
    /// Re-provisioning an account keeps the existing key.
    pub fn provision(&self, account_id: AccountId) -> KeyRef {
        self.keys
            .entry(account_id)
            .or_insert_with(|| StoredKey {
                public_key: KeyRef::new(format!("ed25519:{}", Uuid::new_v4().simple())),
                secret: Uuid::new_v4().simple().to_string(),
            })
            .public_key
            .clone()
    }

    /// Drop the key for `account_id`.
    pub fn revoke(&self, account_id: &AccountId) -> bool {
        self.keys.remove(account_id).is_some()
    }
}

#[async_trait]
impl KeyCustody for InMemoryKeyCustody {
    async fn signing_context(&self, account_id: &AccountId) -> AppResult<SigningContext> {
        let stored = self
            .keys
            .get(account_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                AppError::key_unavailable(format!("No signing key held for account {account_id}"))
            })?;
        Ok(SigningContext::new(
            *account_id,
            stored.public_key,
            stored.secret,
        ))
    }
}
