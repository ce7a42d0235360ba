//! `AccountUser` extractor: reads the upstream-authenticated account header and
//! injects a request context.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use safemate_core::error::AppError;
use safemate_core::types::AccountId;
use safemate_service::context::RequestContext;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the caller's ledger account, set by the authenticating proxy.
pub const ACCOUNT_HEADER: &str = "x-safemate-account";

/// Optional correlation id header.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Extracted account context available in handlers.
#[derive(Debug, Clone)]
pub struct AccountUser(pub RequestContext);

impl std::ops::Deref for AccountUser {
    type Target = RequestContext;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequestParts<AppState> for AccountUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(ACCOUNT_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::unauthorized(format!("Missing {ACCOUNT_HEADER} header")))?;

        let account_id: AccountId = raw
            .parse()
            .map_err(|e| AppError::unauthorized(format!("Invalid {ACCOUNT_HEADER} header: {e}")))?;

        // A malformed correlation id is replaced, not rejected.
        let request_id = parts
            .headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .unwrap_or_else(Uuid::new_v4);

        Ok(AccountUser(RequestContext::with_request_id(
            account_id, request_id,
        )))
    }
}
