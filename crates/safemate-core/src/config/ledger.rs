//! Ledger access configuration: timeouts, retries, and read fan-out.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which ledger client implementation the server wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    /// In-process sandbox ledger (development and tests).
    #[default]
    Sandbox,
}

/// Ledger client behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Ledger client implementation.
    #[serde(default)]
    pub backend: LedgerBackend,
    /// Deadline for a single ledger call, in milliseconds.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_ms: u64,
    /// Retries after the first attempt for transient read failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff before the first retry, in milliseconds; doubles per attempt.
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
    /// Upper bound for a single backoff, in milliseconds.
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,
    /// Extra listing passes while waiting for just-written folders to appear.
    #[serde(default = "default_propagation_retries")]
    pub propagation_retries: u32,
    /// Maximum in-flight read queries during discovery.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    /// Serials requested per metadata query.
    #[serde(default = "default_metadata_page_size")]
    pub metadata_page_size: u64,
}

impl LedgerConfig {
    /// Single-call deadline.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    /// Backoff before retry number `attempt` (1-based), capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let delay = self.retry_base_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.retry_max_delay_ms))
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::default(),
            call_timeout_ms: default_call_timeout(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
            retry_max_delay_ms: default_retry_max_delay(),
            propagation_retries: default_propagation_retries(),
            fetch_concurrency: default_fetch_concurrency(),
            metadata_page_size: default_metadata_page_size(),
        }
    }
}

fn default_call_timeout() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay() -> u64 {
    200
}

fn default_retry_max_delay() -> u64 {
    2_000
}

fn default_propagation_retries() -> u32 {
    3
}

fn default_fetch_concurrency() -> usize {
    8
}

fn default_metadata_page_size() -> u64 {
    25
}
