//! Newtype wrappers around ledger entity identifiers.
//!
//! Ledger entities are addressed as `shard.realm.num`. Distinct types keep an
//! `AccountId` from being passed where a `CollectionId` is expected. Shard and
//! realm are bounded to `u16`, which keeps the encoded metadata size fixed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Error returned when an identifier string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    /// The string is not of the form `shard.realm.num`.
    #[error("expected 'shard.realm.num', got '{0}'")]
    Malformed(String),
    /// A component is not a valid number or is out of range.
    #[error("invalid component '{component}' in '{input}'")]
    InvalidComponent {
        /// The offending component.
        component: String,
        /// The full input.
        input: String,
    },
    /// A folder id is not of the form `shard.realm.num/serial`.
    #[error("expected 'shard.realm.num/serial', got '{0}'")]
    MalformedFolderId(String),
    /// Serial numbers start at 1.
    #[error("serial number must be at least 1")]
    ZeroSerial,
}

/// A raw `shard.realm.num` ledger entity address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    /// Shard number.
    pub shard: u16,
    /// Realm number.
    pub realm: u16,
    /// Entity number within the realm.
    pub num: u64,
}

impl EntityId {
    /// Create an entity id from its components.
    pub const fn new(shard: u16, realm: u16, num: u64) -> Self {
        Self { shard, realm, num }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.shard, self.realm, self.num)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split('.');
        let (Some(shard), Some(realm), Some(num), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(IdParseError::Malformed(s.to_string()));
        };

        let invalid = |component: &str| IdParseError::InvalidComponent {
            component: component.to_string(),
            input: s.to_string(),
        };

        Ok(Self {
            shard: shard.parse().map_err(|_| invalid(shard))?,
            realm: realm.parse().map_err(|_| invalid(realm))?,
            num: num.parse().map_err(|_| invalid(num))?,
        })
    }
}

/// Macro to define a newtype ID wrapper around [`EntityId`].
macro_rules! define_entity_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub EntityId);

        impl $name {
            /// Create an identifier from its `shard.realm.num` components.
            pub const fn new(shard: u16, realm: u16, num: u64) -> Self {
                Self(EntityId::new(shard, realm, num))
            }

            /// Return the inner entity id.
            pub fn entity(&self) -> EntityId {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }

        impl From<EntityId> for $name {
            fn from(id: EntityId) -> Self {
                Self(id)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a ledger account.
    AccountId
);

define_entity_id!(
    /// Identifier of a token collection.
    CollectionId
);

/// Identifier of a folder: the NFT `(collection, serial)` pair.
///
/// Rendered as `shard.realm.num/serial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId {
    /// The collection the folder NFT belongs to.
    pub collection_id: CollectionId,
    /// The NFT serial within the collection (starts at 1).
    pub serial: u64,
}

impl FolderId {
    /// Create a folder id.
    pub const fn new(collection_id: CollectionId, serial: u64) -> Self {
        Self {
            collection_id,
            serial,
        }
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection_id, self.serial)
    }
}

impl FromStr for FolderId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (collection, serial) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| IdParseError::MalformedFolderId(s.to_string()))?;

        let serial: u64 = serial.parse().map_err(|_| IdParseError::InvalidComponent {
            component: serial.to_string(),
            input: s.to_string(),
        })?;
        if serial == 0 {
            return Err(IdParseError::ZeroSerial);
        }

        Ok(Self {
            collection_id: collection.parse()?,
            serial,
        })
    }
}

impl Serialize for FolderId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FolderId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
