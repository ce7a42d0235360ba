//! End-to-end tests against the HTTP API backed by the sandbox ledger.

mod folder_test;
mod helpers;
