//! In-process sandbox ledger configuration.

use serde::{Deserialize, Serialize};

use crate::types::AccountId;

/// Settings for the sandbox ledger backend.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SandboxConfig {
    /// Accounts provisioned (with custody keys) at startup.
    #[serde(default)]
    pub accounts: Vec<AccountId>,
    /// Simulated propagation delay for writes, in milliseconds.
    #[serde(default)]
    pub propagation_delay_ms: u64,
}
