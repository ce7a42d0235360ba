//! Request context carrying the acting account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use safemate_core::types::AccountId;

/// Context for the current request.
///
/// Built by the API layer from the upstream-authenticated account header and
/// passed into service methods so every operation knows *who* is acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// The ledger account the request acts for.
    pub account_id: AccountId,
    /// Correlation id for logs.
    pub request_id: Uuid,
    /// When the request was received.
    pub request_time: DateTime<Utc>,
}

impl RequestContext {
    /// Creates a new request context with a fresh request id.
    pub fn new(account_id: AccountId) -> Self {
        Self::with_request_id(account_id, Uuid::new_v4())
    }

    /// Creates a request context that reuses an existing correlation id.
    pub fn with_request_id(account_id: AccountId, request_id: Uuid) -> Self {
        Self {
            account_id,
            request_id,
            request_time: Utc::now(),
        }
    }
}
