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

//! Repository - the committed resource tree.
//!
//! The tree maps paths to nodes. Sessions stage changes against it and
//! apply them in one step on commit, at which point every changed resource
//! whose snapshot differs from its latest version gets a new version.
//! When a data file is configured the prospective repository is written
//! (temp file + rename) before a commit becomes visible, and reloaded on
//! open. A commit that cannot be persisted changes nothing.

use crate::error::StoreError;
use crate::history::VersionEntry;
use crate::node::Node;
use crate::object_store::{ObjectBatch, ObjectStore, StoredObject};
use crate::objects::{ObjectId, VersionRecord};
use crate::session::Session;
use arbor_core::{current_timestamp_us, RepoPath};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Staged changes: `None` marks a removal
pub(crate) type ChangeSet = BTreeMap<RepoPath, Option<Arc<Node>>>;

type Tree = BTreeMap<RepoPath, Arc<Node>>;

/// Everything a session hands over on commit
pub(crate) struct Staged {
    pub changes: ChangeSet,
    /// Committed state of each changed path when the session first saw it
    pub bases: ChangeSet,
    pub objects: ObjectBatch,
}

/// On-disk form of the repository
#[derive(Serialize, Deserialize)]
struct PersistedRepository {
    nodes: Vec<(RepoPath, Node)>,
    objects: Vec<(ObjectId, StoredObject)>,
}

/// Summary of one commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub changed: usize,
    pub removed: usize,
    pub versions_created: usize,
}

pub struct Repository {
    tree: RwLock<Tree>,
    objects: ObjectStore,
    data_file: Option<PathBuf>,
    /// Serializes commit application and persistence
    commit_lock: Mutex<()>,
    open_sessions: AtomicUsize,
    commits: AtomicU64,
}

impl Repository {
    /// In-memory repository holding only the root container
    pub fn new() -> Result<Arc<Self>, StoreError> {
        Self::with_data_file(None, BTreeMap::new(), ObjectStore::new())
    }

    /// Open a file-backed repository, loading it when the file exists
    pub fn open(data_file: impl AsRef<Path>) -> Result<Arc<Self>, StoreError> {
        let path = data_file.as_ref().to_path_buf();
        if path.exists() {
            let bytes = std::fs::read(&path)?;
            let persisted: PersistedRepository = bincode::deserialize(&bytes)?;
            let tree = persisted
                .nodes
                .into_iter()
                .map(|(p, node)| (p, Arc::new(node)))
                .collect();
            info!(path = %path.display(), "Loaded repository");
            Self::with_data_file(Some(path), tree, ObjectStore::import(persisted.objects))
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            info!(path = %path.display(), "Creating repository");
            Self::with_data_file(Some(path), BTreeMap::new(), ObjectStore::new())
        }
    }

    fn with_data_file(
        data_file: Option<PathBuf>,
        tree: Tree,
        objects: ObjectStore,
    ) -> Result<Arc<Self>, StoreError> {
        let needs_root = !tree.contains_key(&RepoPath::root());
        let repo = Arc::new(Self {
            tree: RwLock::new(tree),
            objects,
            data_file,
            commit_lock: Mutex::new(()),
            open_sessions: AtomicUsize::new(0),
            commits: AtomicU64::new(0),
        });

        if needs_root {
            let mut changes = ChangeSet::new();
            changes.insert(RepoPath::root(), Some(Arc::new(Node::container())));
            let mut bases = ChangeSet::new();
            bases.insert(RepoPath::root(), None);
            repo.apply(Staged {
                changes,
                bases,
                objects: ObjectBatch::default(),
            })?;
        }
        Ok(repo)
    }

    /// Start a session
    pub fn begin(self: &Arc<Self>) -> Session {
        let open = self.open_sessions.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(open_sessions = open, "Session opened");
        Session::new(Arc::clone(self))
    }

    /// Sessions begun and not yet committed or released
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::Acquire)
    }

    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    /// Number of committed resources, root included
    pub fn resource_count(&self) -> usize {
        self.tree.read().len()
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub(crate) fn session_closed(&self) {
        let open = self.open_sessions.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!(open_sessions = open, "Session closed");
    }

    /// Committed node at `path`
    pub(crate) fn committed(&self, path: &RepoPath) -> Option<Arc<Node>> {
        self.tree.read().get(path).cloned()
    }

    /// Committed nodes at `root` and below, in path order
    pub(crate) fn committed_subtree(&self, root: &RepoPath) -> Vec<(RepoPath, Arc<Node>)> {
        self.tree
            .read()
            .range(root.clone()..)
            .take_while(|(p, _)| root.contains(p))
            .map(|(p, n)| (p.clone(), Arc::clone(n)))
            .collect()
    }

    /// Apply staged changes atomically and version every changed resource.
    ///
    /// Fails without touching anything when a changed path no longer holds
    /// the session's base, or when the new state cannot be persisted.
    pub(crate) fn apply(&self, staged: Staged) -> Result<CommitSummary, StoreError> {
        let Staged {
            mut changes,
            bases,
            mut objects,
        } = staged;
        let _guard = self.commit_lock.lock();

        {
            let tree = self.tree.read();
            for (path, base) in &bases {
                let unchanged = match (tree.get(path), base) {
                    (Some(current), Some(base)) => Arc::ptr_eq(current, base),
                    (None, None) => true,
                    _ => false,
                };
                if !unchanged {
                    return Err(StoreError::ConcurrentModification(path.clone()));
                }
            }
        }

        let mut summary = CommitSummary::default();
        for (path, change) in changes.iter_mut() {
            match change {
                Some(node) => {
                    summary.changed += 1;
                    if autoversion(Arc::make_mut(node), &mut objects)? {
                        summary.versions_created += 1;
                        debug!(path = %path, versions = node.history.len(), "Autoversioned");
                    }
                }
                None => summary.removed += 1,
            }
        }

        match &self.data_file {
            Some(file) => {
                let mut next = self.tree.read().clone();
                apply_changes(&mut next, changes);
                self.persist(file, &next, &objects)?;
                self.objects.insert_batch(objects);
                *self.tree.write() = next;
            }
            None => {
                self.objects.insert_batch(objects);
                apply_changes(&mut self.tree.write(), changes);
            }
        }

        self.commits.fetch_add(1, Ordering::Relaxed);
        Ok(summary)
    }

    fn persist(&self, file: &Path, tree: &Tree, pending: &ObjectBatch) -> Result<(), StoreError> {
        let persisted = PersistedRepository {
            nodes: tree
                .iter()
                .map(|(p, n)| (p.clone(), Node::clone(n)))
                .collect(),
            objects: self.objects.export(pending),
        };
        let data = bincode::serialize(&persisted)?;

        let tmp = file.with_extension("bin.tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, file)?;
        debug!(path = %file.display(), "Repository persisted");
        Ok(())
    }
}

fn apply_changes(tree: &mut Tree, changes: ChangeSet) {
    for (path, change) in changes {
        match change {
            Some(node) => {
                tree.insert(path, node);
            }
            None => {
                tree.remove(&path);
            }
        }
    }
}

/// Append a version when the node's state differs from its latest one
fn autoversion(node: &mut Node, objects: &mut ObjectBatch) -> Result<bool, StoreError> {
    let snapshot = objects.add(&node.snapshot())?;
    let parent = match node.history.latest() {
        Some(latest) if latest.snapshot == snapshot => return Ok(false),
        Some(latest) => Some(latest.id),
        None => None,
    };

    let timestamp_us = current_timestamp_us()
        .max(node.history.latest().map_or(0, |l| l.created_us + 1));
    let record = VersionRecord {
        snapshot,
        parent,
        timestamp_us,
    };
    let id = objects.add(&record)?;
    node.history.push(VersionEntry {
        id,
        snapshot,
        created_us: timestamp_us,
    });
    Ok(true)
}
