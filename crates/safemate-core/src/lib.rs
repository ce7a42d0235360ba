//! # safemate-core
//!
//! Core crate for SafeMate. Contains the collaborator traits (ledger client,
//! key custody), configuration schemas, typed ledger identifiers, and the
//! unified error system.
//!
//! This crate has **no** internal dependencies on other SafeMate crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
