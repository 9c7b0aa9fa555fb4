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

//! Store errors

use crate::objects::{ObjectId, ObjectType};
use arbor_core::RepoPath;
use thiserror::Error;

/// Errors raised by the object store, the repository tree and sessions.
///
/// Occupancy and missing-path conditions are distinct variants so services
/// can map them to their own error kinds.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("Type mismatch: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error("Path not found: {0}")]
    PathNotFound(RepoPath),

    #[error("Item already exists: {0}")]
    ItemExists(RepoPath),

    #[error("Cannot place {source_path} at {destination}")]
    InvalidDestination {
        source_path: RepoPath,
        destination: RepoPath,
    },

    #[error("The root resource cannot be removed or replaced")]
    RootImmutable,

    #[error("Parent {0} cannot have children")]
    NotAContainer(RepoPath),

    #[error("Resource {0} has no committed version")]
    NoVersion(RepoPath),

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Label '{label}' already names another version of {path}")]
    LabelConflict { label: String, path: RepoPath },

    #[error("{0} was changed by another session")]
    ConcurrentModification(RepoPath),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<bincode::Error> for StoreError {
    fn from(e: bincode::Error) -> Self {
        StoreError::SerializationError(e.to_string())
    }
}
