// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Version Objects
//!
//! Content-addressable objects behind resource versions: datastream
//! content, resource snapshots, and version records. All objects are
//! immutable once created.

use crate::node::{NodeKind, Property};
use blake3::Hasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Object ID - BLAKE3 hash (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub [u8; 32]);

impl ObjectId {
    /// Create from content (content-addressable)
    pub fn from_content(content: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(content);
        Self(hasher.finalize().into())
    }

    /// Short hex form (14 chars), used in version subjects
    pub fn short(&self) -> String {
        hex::encode(&self.0[..7])
    }

    /// Full hex representation
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(hex_str: &str) -> Result<Self, ObjectIdError> {
        let bytes = hex::decode(hex_str).map_err(|_| ObjectIdError::InvalidHex)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ObjectIdError::InvalidLength)?;
        Ok(Self(arr))
    }

    /// Check if this ID starts with the given hex prefix
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.to_hex().starts_with(&prefix.to_ascii_lowercase())
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short())
    }
}

/// Parse errors for ObjectId
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObjectIdError {
    #[error("Invalid hex string")]
    InvalidHex,

    #[error("Invalid length (expected 32 bytes)")]
    InvalidLength,
}

/// Object type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectType {
    /// Raw datastream bytes
    Content = 1,
    /// State of one resource
    Snapshot = 2,
    /// Entry in a resource's version history
    Version = 3,
}

/// Datastream content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub data: Vec<u8>,
}

impl Content {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Reference from a datastream to its stored content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    /// Stored `Content` object
    pub oid: ObjectId,
    /// MIME type supplied by the client
    pub mime_type: String,
    pub size: u64,
    /// BLAKE3 of the raw bytes, hex
    pub digest: String,
}

impl ContentRef {
    pub fn describe(oid: ObjectId, data: &[u8], mime_type: impl Into<String>) -> Self {
        Self {
            oid,
            mime_type: mime_type.into(),
            size: data.len() as u64,
            digest: blake3::hash(data).to_hex().to_string(),
        }
    }
}

/// Versionable state of a resource.
///
/// Timestamps and labels are not part of a snapshot, so an unchanged
/// resource always hashes to the same id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub kind: NodeKind,
    /// Sorted user properties
    pub properties: Vec<Property>,
    pub content: Option<ContentRef>,
}

/// One version of a resource: a snapshot plus its place in the history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub snapshot: ObjectId,
    /// Previous version, `None` for the first
    pub parent: Option<ObjectId>,
    /// Timestamp (microseconds since epoch)
    pub timestamp_us: u64,
}

/// Trait for stored objects
pub trait VersionObject: Sized + Serialize + for<'de> Deserialize<'de> {
    /// Object type constant
    const TYPE: ObjectType;

    /// Serialize to bytes
    fn serialize_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from bytes
    fn deserialize_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }

    /// Compute object ID
    fn compute_oid(&self) -> Result<ObjectId, bincode::Error> {
        Ok(ObjectId::from_content(&self.serialize_bytes()?))
    }
}

impl VersionObject for Content {
    const TYPE: ObjectType = ObjectType::Content;
}

impl VersionObject for Snapshot {
    const TYPE: ObjectType = ObjectType::Snapshot;
}

impl VersionObject for VersionRecord {
    const TYPE: ObjectType = ObjectType::Version;
}
