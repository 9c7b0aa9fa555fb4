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

//! Arbor Storage Layer
//!
//! The transactional resource tree behind the repository.
//!
//! ## Architecture
//!
//! - **Repository**: committed tree of path-addressed nodes plus a
//!   content-addressed object store; autoversions resources on commit
//! - **Session**: request-scoped unit of work staging changes over the tree
//! - **RdfStream**: lazy triple output that owns its session until released
//! - **Services**: `VersionManager`, `PathOperationCoordinator`, `NodeService`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use arbor_storage::{Repository, VersionManager};
//!
//! let repo = Repository::new()?;
//! let versions = VersionManager::new(subjects);
//! versions.add_label(repo.begin(), &path, "v1")?;
//! ```

pub mod error;
pub mod history;
pub mod node;
pub mod nodes;
pub mod object_store;
pub mod objects;
pub mod paths;
pub mod repository;
pub mod session;
pub mod stream;
pub mod triples;
pub mod versions;

pub use error::StoreError;
pub use history::{validate_label, LabelOutcome, VersionEntry, VersionHistory};
pub use node::{Node, NodeKind, Property};
pub use nodes::{DatastreamContent, NodeError, NodeService, NodeSpec, PutOutcome};
pub use object_store::{ObjectStore, StoreStats};
pub use objects::{Content, ContentRef, ObjectId, Snapshot, VersionRecord};
pub use paths::{PathOperationCoordinator, PathOperationError, SubtreeOperation};
pub use repository::{CommitSummary, Repository};
pub use session::Session;
pub use stream::{RdfStream, SessionLease, StreamOutcome, TripleIter};
pub use versions::{ResolvedVersion, VersionError, VersionManager};
