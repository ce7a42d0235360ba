//! Token collection entities.

pub mod model;
pub mod ownership;

pub use model::CollectionHandle;
pub use ownership::{OwnershipBasis, OwnershipClaim};
