//! Key custody trait: turns an account into a signing context on demand.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{AccountId, SigningContext};

/// Source of per-account signing contexts.
///
/// Implementations must fail with `ErrorKind::KeyUnavailable` when the key
/// cannot be obtained and must never substitute another account's key.
#[async_trait]
pub trait KeyCustody: Send + Sync + std::fmt::Debug + 'static {
    /// Resolve the signing context for `account_id`.
    async fn signing_context(&self, account_id: &AccountId) -> AppResult<SigningContext>;
}
