//! Compact binary codec for folder NFT metadata.
//!
//! Layout: a two-byte header (`MARKER`, `VERSION`) followed by fields, each
//! introduced by a one-byte ASCII key:
//!
//! | key | field  | value                                   | omitted when |
//! |-----|--------|-----------------------------------------|--------------|
//! | `k` | kind   | 1 byte (0 folder, 1 file)               | never        |
//! | `n` | name   | 1-byte length + UTF-8                   | never        |
//! | `p` | parent | entity id (3 varints) + serial (varint) | root         |
//! | `d` | depth  | 1 byte                                  | depth 0      |
//! | `o` | owner  | entity id (3 varints)                   | never        |
//!
//! Varints are unsigned LEB128. Shard and realm are `u16`, so an entity id
//! needs at most 16 bytes and a parent reference at most 27; the non-name
//! overhead is therefore bounded by [`MAX_OVERHEAD`] and every name that
//! survives truncation fits [`METADATA_BUDGET`].

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use safemate_core::error::AppError;
use safemate_core::types::{AccountId, CollectionId, EntityId, FolderId};
use safemate_entity::folder::{FolderMetadata, RecordKind};

/// Maximum metadata payload the ledger accepts for one NFT.
pub const METADATA_BUDGET: usize = 100;

/// Names are cut to this many characters at encode time.
pub const MAX_NAME_CHARS: usize = 40;

/// Worst-case bytes used by everything except the name bytes.
pub const MAX_OVERHEAD: usize = 2 + 2 + 2 + (1 + MAX_ENTITY_BYTES + MAX_U64_VARINT) + 2 + (1 + MAX_ENTITY_BYTES);

/// Bytes left for the UTF-8 name in the worst case.
pub const NAME_BYTE_BUDGET: usize = METADATA_BUDGET - MAX_OVERHEAD;

const MARKER: u8 = 0x53;
const VERSION: u8 = 1;

const KEY_KIND: u8 = b'k';
const KEY_NAME: u8 = b'n';
const KEY_PARENT: u8 = b'p';
const KEY_DEPTH: u8 = b'd';
const KEY_OWNER: u8 = b'o';

const KIND_FOLDER: u8 = 0;
const KIND_FILE: u8 = 1;

const MAX_U16_VARINT: usize = 3;
const MAX_U64_VARINT: usize = 10;
const MAX_ENTITY_BYTES: usize = 2 * MAX_U16_VARINT + MAX_U64_VARINT;

/// Reasons a payload cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The payload is empty or does not start with the SafeMate marker.
    #[error("not a SafeMate metadata payload")]
    BadMarker,
    /// The payload uses a format version this build does not know.
    #[error("unsupported metadata version {0}")]
    UnsupportedVersion(u8),
    /// The payload ended in the middle of a field.
    #[error("payload truncated while reading {0}")]
    Truncated(&'static str),
    /// A field key is not recognised.
    #[error("unknown field key 0x{0:02x}")]
    UnknownKey(u8),
    /// A field appears twice.
    #[error("duplicate field '{0}'")]
    DuplicateField(char),
    /// A required field is absent.
    #[error("missing required field '{0}'")]
    MissingField(char),
    /// A field value is out of range.
    #[error("invalid value for '{field}': {detail}")]
    InvalidValue {
        /// The field key.
        field: char,
        /// What was wrong.
        detail: String,
    },
    /// Parent and depth disagree (a root with depth, or a child at depth 0).
    #[error("parent/depth mismatch: parent present = {has_parent}, depth = {depth}")]
    InconsistentDepth {
        /// Whether a parent was encoded.
        has_parent: bool,
        /// The encoded depth.
        depth: u8,
    },
    /// The payload exceeds the ledger budget.
    #[error("payload of {0} bytes exceeds the {METADATA_BUDGET}-byte budget")]
    Oversize(usize),
}

impl From<CodecError> for AppError {
    fn from(err: CodecError) -> Self {
        AppError::corrupt_metadata(err.to_string())
    }
}

/// Apply the deterministic name truncation used at encode time.
///
/// Keeps the first [`MAX_NAME_CHARS`] characters, then drops trailing
/// characters until the UTF-8 length fits [`NAME_BYTE_BUDGET`].
pub fn truncate_name(name: &str) -> &str {
    let mut end = name
        .char_indices()
        .nth(MAX_NAME_CHARS)
        .map_or(name.len(), |(idx, _)| idx);
    while end > NAME_BYTE_BUDGET {
        end = name[..end]
            .char_indices()
            .next_back()
            .map_or(0, |(idx, _)| idx);
    }
    &name[..end]
}

/// Encode folder metadata into an on-chain payload of at most [`METADATA_BUDGET`] bytes.
pub fn encode(metadata: &FolderMetadata) -> Bytes {
    let name = truncate_name(&metadata.name);
    let mut buf = BytesMut::with_capacity(METADATA_BUDGET);

    buf.put_u8(MARKER);
    buf.put_u8(VERSION);

    buf.put_u8(KEY_KIND);
    buf.put_u8(match metadata.kind {
        RecordKind::Folder => KIND_FOLDER,
        RecordKind::File => KIND_FILE,
    });

    buf.put_u8(KEY_NAME);
    // NAME_BYTE_BUDGET < 256, so the length always fits one byte.
    buf.put_u8(name.len() as u8);
    buf.put_slice(name.as_bytes());

    if let Some(parent) = metadata.parent {
        buf.put_u8(KEY_PARENT);
        put_entity(&mut buf, parent.collection_id.entity());
        put_varint(&mut buf, parent.serial);
    }

    if metadata.depth != 0 {
        buf.put_u8(KEY_DEPTH);
        buf.put_u8(metadata.depth);
    }

    buf.put_u8(KEY_OWNER);
    put_entity(&mut buf, metadata.owner.entity());

    debug_assert!(buf.len() <= METADATA_BUDGET);
    buf.freeze()
}

/// Decode an on-chain payload.
pub fn decode(payload: &[u8]) -> Result<FolderMetadata, CodecError> {
    if payload.len() > METADATA_BUDGET {
        return Err(CodecError::Oversize(payload.len()));
    }

    let mut buf = payload;
    if buf.remaining() < 2 || buf.get_u8() != MARKER {
        return Err(CodecError::BadMarker);
    }
    let version = buf.get_u8();
    if version != VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let mut kind = None;
    let mut name = None;
    let mut parent = None;
    let mut depth = None;
    let mut owner = None;

    while buf.has_remaining() {
        let key = buf.get_u8();
        match key {
            KEY_KIND => {
                ensure_unset(&kind, key)?;
                kind = Some(match take_u8(&mut buf, "kind")? {
                    KIND_FOLDER => RecordKind::Folder,
                    KIND_FILE => RecordKind::File,
                    other => {
                        return Err(CodecError::InvalidValue {
                            field: 'k',
                            detail: format!("unknown kind {other}"),
                        });
                    }
                });
            }
            KEY_NAME => {
                ensure_unset(&name, key)?;
                let len = take_u8(&mut buf, "name length")? as usize;
                if buf.remaining() < len {
                    return Err(CodecError::Truncated("name"));
                }
                let text = std::str::from_utf8(&buf[..len]).map_err(|e| {
                    CodecError::InvalidValue {
                        field: 'n',
                        detail: e.to_string(),
                    }
                })?;
                name = Some(text.to_string());
                buf.advance(len);
            }
            KEY_PARENT => {
                ensure_unset(&parent, key)?;
                let collection = CollectionId::from(take_entity(&mut buf, "parent")?);
                let serial = take_varint(&mut buf, "parent serial")?;
                if serial == 0 {
                    return Err(CodecError::InvalidValue {
                        field: 'p',
                        detail: "serial 0".to_string(),
                    });
                }
                parent = Some(FolderId::new(collection, serial));
            }
            KEY_DEPTH => {
                ensure_unset(&depth, key)?;
                depth = Some(take_u8(&mut buf, "depth")?);
            }
            KEY_OWNER => {
                ensure_unset(&owner, key)?;
                owner = Some(AccountId::from(take_entity(&mut buf, "owner")?));
            }
            other => return Err(CodecError::UnknownKey(other)),
        }
    }

    let kind = kind.ok_or(CodecError::MissingField('k'))?;
    let name = name.ok_or(CodecError::MissingField('n'))?;
    let owner = owner.ok_or(CodecError::MissingField('o'))?;
    let depth = depth.unwrap_or(0);

    if parent.is_some() != (depth > 0) {
        return Err(CodecError::InconsistentDepth {
            has_parent: parent.is_some(),
            depth,
        });
    }

    Ok(FolderMetadata {
        kind,
        name,
        parent,
        depth,
        owner,
    })
}

fn ensure_unset<T>(slot: &Option<T>, key: u8) -> Result<(), CodecError> {
    match slot {
        Some(_) => Err(CodecError::DuplicateField(key as char)),
        None => Ok(()),
    }
}

fn take_u8(buf: &mut &[u8], what: &'static str) -> Result<u8, CodecError> {
    if buf.has_remaining() {
        Ok(buf.get_u8())
    } else {
        Err(CodecError::Truncated(what))
    }
}

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

fn take_varint(buf: &mut &[u8], what: &'static str) -> Result<u64, CodecError> {
    let mut value: u64 = 0;
    for i in 0..MAX_U64_VARINT {
        let byte = take_u8(buf, what)?;
        let bits = u64::from(byte & 0x7f);
        if i == MAX_U64_VARINT - 1 && bits > 1 {
            return Err(CodecError::InvalidValue {
                field: '#',
                detail: format!("{what} overflows u64"),
            });
        }
        value |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(CodecError::InvalidValue {
        field: '#',
        detail: format!("{what} varint too long"),
    })
}

fn put_entity(buf: &mut BytesMut, id: EntityId) {
    put_varint(buf, u64::from(id.shard));
    put_varint(buf, u64::from(id.realm));
    put_varint(buf, id.num);
}

fn take_entity(buf: &mut &[u8], what: &'static str) -> Result<EntityId, CodecError> {
    let narrow = |value: u64| {
        u16::try_from(value).map_err(|_| CodecError::InvalidValue {
            field: '#',
            detail: format!("{what} shard/realm {value} out of range"),
        })
    };
    let shard = narrow(take_varint(buf, what)?)?;
    let realm = narrow(take_varint(buf, what)?)?;
    let num = take_varint(buf, what)?;
    Ok(EntityId::new(shard, realm, num))
}
