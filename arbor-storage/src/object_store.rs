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

//! Object Store - Content-Addressable Storage
//!
//! Holds datastream content, snapshots and version records. Identical
//! objects are stored once. Objects written by a session wait in an
//! `ObjectBatch` until its commit is applied.

use crate::error::StoreError;
use crate::objects::{Content, ObjectId, ObjectType, Snapshot, VersionObject, VersionRecord};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stored object with type prefix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredObject {
    obj_type: ObjectType,
    data: Vec<u8>,
}

impl StoredObject {
    fn encode<T: VersionObject>(obj: &T) -> Result<(ObjectId, Self), StoreError> {
        let data = obj.serialize_bytes()?;
        let oid = ObjectId::from_content(&data);
        Ok((
            oid,
            Self {
                obj_type: T::TYPE,
                data,
            },
        ))
    }

    fn decode<T: VersionObject>(&self) -> Result<T, StoreError> {
        if self.obj_type != T::TYPE {
            return Err(StoreError::TypeMismatch {
                expected: T::TYPE,
                actual: self.obj_type,
            });
        }
        Ok(T::deserialize_bytes(&self.data)?)
    }
}

/// Objects staged by one session, not yet visible in the store
#[derive(Debug, Default)]
pub(crate) struct ObjectBatch {
    objects: BTreeMap<ObjectId, StoredObject>,
}

impl ObjectBatch {
    pub(crate) fn add<T: VersionObject>(&mut self, obj: &T) -> Result<ObjectId, StoreError> {
        let (oid, stored) = StoredObject::encode(obj)?;
        self.objects.entry(oid).or_insert(stored);
        Ok(oid)
    }

    pub(crate) fn get<T: VersionObject>(&self, oid: &ObjectId) -> Result<Option<T>, StoreError> {
        self.objects.get(oid).map(|stored| stored.decode::<T>()).transpose()
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn clear(&mut self) {
        self.objects.clear();
    }
}

/// Object store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_objects: u64,
    pub content_count: u64,
    pub snapshot_count: u64,
    pub version_count: u64,
    pub total_size_bytes: u64,
}

/// In-memory object store
pub struct ObjectStore {
    /// Object storage: ObjectId -> StoredObject
    objects: DashMap<ObjectId, StoredObject>,
    content_count: AtomicU64,
    snapshot_count: AtomicU64,
    version_count: AtomicU64,
    total_size: AtomicU64,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            content_count: AtomicU64::new(0),
            snapshot_count: AtomicU64::new(0),
            version_count: AtomicU64::new(0),
            total_size: AtomicU64::new(0),
        }
    }

    /// Store an object (idempotent - same content = same ID)
    pub fn put<T: VersionObject>(&self, obj: &T) -> Result<ObjectId, StoreError> {
        let (oid, stored) = StoredObject::encode(obj)?;
        self.insert(oid, stored);
        Ok(oid)
    }

    /// Make a committed batch visible
    pub(crate) fn insert_batch(&self, batch: ObjectBatch) {
        for (oid, stored) in batch.objects {
            self.insert(oid, stored);
        }
    }

    fn insert(&self, oid: ObjectId, stored: StoredObject) {
        let size = stored.data.len() as u64;
        let obj_type = stored.obj_type;
        if let dashmap::mapref::entry::Entry::Vacant(slot) = self.objects.entry(oid) {
            slot.insert(stored);
            let counter = match obj_type {
                ObjectType::Content => &self.content_count,
                ObjectType::Snapshot => &self.snapshot_count,
                ObjectType::Version => &self.version_count,
            };
            counter.fetch_add(1, Ordering::Relaxed);
            self.total_size.fetch_add(size, Ordering::Relaxed);
        }
    }

    /// Get an object by ID
    pub fn get<T: VersionObject>(&self, oid: &ObjectId) -> Result<Option<T>, StoreError> {
        match self.objects.get(oid) {
            Some(stored) => stored.decode().map(Some),
            None => Ok(None),
        }
    }

    /// Get an object, returning error if not found
    pub fn get_required<T: VersionObject>(&self, oid: &ObjectId) -> Result<T, StoreError> {
        self.get(oid)?.ok_or(StoreError::ObjectNotFound(*oid))
    }

    pub fn exists(&self, oid: &ObjectId) -> bool {
        self.objects.contains_key(oid)
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            total_objects: self.objects.len() as u64,
            content_count: self.content_count.load(Ordering::Relaxed),
            snapshot_count: self.snapshot_count.load(Ordering::Relaxed),
            version_count: self.version_count.load(Ordering::Relaxed),
            total_size_bytes: self.total_size.load(Ordering::Relaxed),
        }
    }

    // === Convenience methods ===

    pub fn put_content(&self, content: &Content) -> Result<ObjectId, StoreError> {
        self.put(content)
    }

    pub fn get_content(&self, oid: &ObjectId) -> Result<Content, StoreError> {
        self.get_required(oid)
    }

    pub fn get_snapshot(&self, oid: &ObjectId) -> Result<Snapshot, StoreError> {
        self.get_required(oid)
    }

    pub fn get_version(&self, oid: &ObjectId) -> Result<VersionRecord, StoreError> {
        self.get_required(oid)
    }

    // === Persistence ===

    /// All stored objects plus those of a pending batch, for persistence
    pub(crate) fn export(&self, pending: &ObjectBatch) -> Vec<(ObjectId, StoredObject)> {
        let mut all: Vec<_> = self
            .objects
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();
        all.extend(
            pending
                .objects
                .iter()
                .filter(|(oid, _)| !self.objects.contains_key(*oid))
                .map(|(oid, stored)| (*oid, stored.clone())),
        );
        all
    }

    /// Rebuild a store from exported objects
    pub(crate) fn import(objects: Vec<(ObjectId, StoredObject)>) -> Self {
        let store = Self::new();
        for (oid, stored) in objects {
            store.insert(oid, stored);
        }
        store
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}
