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

//! Transactional sessions.
//!
//! A session stages changes over the committed tree; reads see the staged
//! state first. A session ends exactly once: by `commit`, by `release`, or
//! by being dropped, which discards staged changes.
//!
//! The first committed state a session sees for each path is its base. A
//! commit fails with `ConcurrentModification` when another session has
//! committed a change to any staged path since.

use crate::error::StoreError;
use crate::history::LabelOutcome;
use crate::node::Node;
use crate::object_store::ObjectBatch;
use crate::objects::{Content, ObjectId};
use crate::repository::{ChangeSet, CommitSummary, Repository, Staged};
use arbor_core::RepoPath;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Session {
    repo: Arc<Repository>,
    changes: ChangeSet,
    /// Committed state per path when this session first saw it
    bases: Mutex<ChangeSet>,
    objects: ObjectBatch,
    finished: bool,
}

impl Session {
    pub(crate) fn new(repo: Arc<Repository>) -> Self {
        Self {
            repo,
            changes: ChangeSet::new(),
            bases: Mutex::new(ChangeSet::new()),
            objects: ObjectBatch::default(),
            finished: false,
        }
    }

    pub fn repository(&self) -> &Arc<Repository> {
        &self.repo
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Node at `path` as seen by this session
    pub fn get(&self, path: &RepoPath) -> Option<Arc<Node>> {
        match self.changes.get(path) {
            Some(staged) => staged.clone(),
            None => {
                let committed = self.repo.committed(path);
                self.bases
                    .lock()
                    .entry(path.clone())
                    .or_insert_with(|| committed.clone());
                committed
            }
        }
    }

    pub fn exists(&self, path: &RepoPath) -> bool {
        self.get(path).is_some()
    }

    /// Node at `root` and all its descendants, in path order
    pub fn subtree(&self, root: &RepoPath) -> Vec<(RepoPath, Arc<Node>)> {
        let mut merged: BTreeMap<RepoPath, Arc<Node>> =
            self.repo.committed_subtree(root).into_iter().collect();
        {
            let mut bases = self.bases.lock();
            for (path, node) in &merged {
                bases
                    .entry(path.clone())
                    .or_insert_with(|| Some(Arc::clone(node)));
            }
        }
        for (path, staged) in self
            .changes
            .range(root.clone()..)
            .take_while(|(p, _)| root.contains(p))
        {
            match staged {
                Some(node) => {
                    merged.insert(path.clone(), Arc::clone(node));
                }
                None => {
                    merged.remove(path);
                }
            }
        }
        merged.into_iter().collect()
    }

    /// Direct children of `path`
    pub fn children(&self, path: &RepoPath) -> Vec<RepoPath> {
        let depth = path.depth() + 1;
        self.subtree(path)
            .into_iter()
            .map(|(p, _)| p)
            .filter(|p| p.depth() == depth)
            .collect()
    }

    /// Stage a new node; missing ancestors are created as objects
    pub fn create(&mut self, path: &RepoPath, node: Node) -> Result<(), StoreError> {
        if self.exists(path) {
            return Err(StoreError::ItemExists(path.clone()));
        }
        self.ensure_ancestors(path)?;
        self.stage(path.clone(), Some(Arc::new(node)));
        Ok(())
    }

    /// Stage a new state for an existing node
    pub fn replace(&mut self, path: &RepoPath, node: Node) -> Result<(), StoreError> {
        if !self.exists(path) {
            return Err(StoreError::PathNotFound(path.clone()));
        }
        self.stage(path.clone(), Some(Arc::new(node)));
        Ok(())
    }

    /// Stage removal of `path` and its subtree; returns the number removed
    pub fn remove(&mut self, path: &RepoPath) -> Result<usize, StoreError> {
        if path.is_root() {
            return Err(StoreError::RootImmutable);
        }
        let doomed = self.subtree(path);
        if doomed.is_empty() {
            return Err(StoreError::PathNotFound(path.clone()));
        }
        for (p, _) in &doomed {
            self.stage(p.clone(), None);
        }
        Ok(doomed.len())
    }

    /// Copy a subtree; copies start with an empty history
    pub fn copy(&mut self, source: &RepoPath, destination: &RepoPath) -> Result<(), StoreError> {
        let subtree = self.check_subtree_operation(source, destination)?;
        self.ensure_ancestors(destination)?;
        for (path, node) in subtree {
            if let Some(target) = path.rebase(source, destination) {
                self.stage(target, Some(Arc::new(node.fresh_copy())));
            }
        }
        Ok(())
    }

    /// Move a subtree; nodes keep their history
    pub fn move_to(&mut self, source: &RepoPath, destination: &RepoPath) -> Result<(), StoreError> {
        if source.is_root() {
            return Err(StoreError::RootImmutable);
        }
        let subtree = self.check_subtree_operation(source, destination)?;
        self.ensure_ancestors(destination)?;
        for (path, _) in &subtree {
            self.stage(path.clone(), None);
        }
        for (path, node) in subtree {
            if let Some(target) = path.rebase(source, destination) {
                self.stage(target, Some(node));
            }
        }
        Ok(())
    }

    /// Label the latest version of `path`
    pub fn add_label(&mut self, path: &RepoPath, label: &str) -> Result<LabelOutcome, StoreError> {
        let current = self
            .get(path)
            .ok_or_else(|| StoreError::PathNotFound(path.clone()))?;
        let mut node = Node::clone(&current);
        let outcome = node.history.label_latest(label, path)?;
        if outcome == LabelOutcome::Added {
            self.stage(path.clone(), Some(Arc::new(node)));
        }
        Ok(outcome)
    }

    /// Hold datastream content until commit
    pub fn stage_content(&mut self, content: &Content) -> Result<ObjectId, StoreError> {
        self.objects.add(content)
    }

    /// Content staged by this session or already committed
    pub fn content(&self, oid: &ObjectId) -> Result<Content, StoreError> {
        match self.objects.get(oid)? {
            Some(content) => Ok(content),
            None => self.repo.objects().get_content(oid),
        }
    }

    /// Apply staged changes and end the session
    pub fn commit(mut self) -> Result<CommitSummary, StoreError> {
        let changes = std::mem::take(&mut self.changes);
        let objects = std::mem::take(&mut self.objects);
        let bases = {
            let seen = self.bases.get_mut();
            changes
                .keys()
                .map(|path| (path.clone(), seen.get(path).cloned().flatten()))
                .collect()
        };
        self.finish();
        let summary = self.repo.apply(Staged {
            changes,
            bases,
            objects,
        })?;
        info!(
            changed = summary.changed,
            removed = summary.removed,
            versions = summary.versions_created,
            "Session committed"
        );
        Ok(summary)
    }

    /// End the session, discarding staged changes
    pub fn release(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if !self.changes.is_empty() || self.objects.len() > 0 {
            debug!(
                discarded = self.changes.len(),
                objects = self.objects.len(),
                "Discarding staged changes"
            );
            self.changes.clear();
            self.objects.clear();
        }
        self.repo.session_closed();
    }

    /// Validate a copy or move before anything is staged
    fn check_subtree_operation(
        &self,
        source: &RepoPath,
        destination: &RepoPath,
    ) -> Result<Vec<(RepoPath, Arc<Node>)>, StoreError> {
        let subtree = self.subtree(source);
        if subtree.is_empty() {
            return Err(StoreError::PathNotFound(source.clone()));
        }
        if self.exists(destination) {
            return Err(StoreError::ItemExists(destination.clone()));
        }
        if source.contains(destination) {
            return Err(StoreError::InvalidDestination {
                source_path: source.clone(),
                destination: destination.clone(),
            });
        }
        for ancestor in destination.ancestors() {
            if let Some(node) = self.get(&ancestor) {
                if !node.kind.can_have_children() {
                    return Err(StoreError::NotAContainer(ancestor));
                }
            }
        }
        Ok(subtree)
    }

    fn ensure_ancestors(&mut self, path: &RepoPath) -> Result<(), StoreError> {
        for ancestor in path.ancestors() {
            match self.get(&ancestor) {
                Some(node) if !node.kind.can_have_children() => {
                    return Err(StoreError::NotAContainer(ancestor));
                }
                Some(_) => {}
                None => {
                    self.stage(ancestor, Some(Arc::new(Node::object())));
                }
            }
        }
        Ok(())
    }

    fn stage(&mut self, path: RepoPath, change: Option<Arc<Node>>) {
        if !self.changes.contains_key(&path) {
            // record the base before the first write
            let _ = self.get(&path);
        }
        self.changes.insert(path, change);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.finish();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("staged", &self.changes.len())
            .field("objects", &self.objects.len())
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{NodeKind, Property};
    use crate::objects::ContentRef;
    use arbor_core::Term;

    fn path(p: &str) -> RepoPath {
        RepoPath::parse(p).unwrap()
    }

    fn datastream() -> Node {
        Node::datastream(ContentRef::describe(
            ObjectId::from_content(b"x"),
            b"x",
            "text/plain",
        ))
    }

    #[test]
    fn test_staged_changes_are_isolated() {
        let repo = Repository::new().unwrap();
        let mut writer = repo.begin();
        writer.create(&path("/a"), Node::object()).unwrap();

        let reader = repo.begin();
        assert!(writer.exists(&path("/a")));
        assert!(!reader.exists(&path("/a")));
        assert_eq!(repo.open_sessions(), 2);

        writer.commit().unwrap();
        assert!(reader.exists(&path("/a")));
        reader.release();
        assert_eq!(repo.open_sessions(), 0);
    }

    #[test]
    fn test_drop_discards() {
        let repo = Repository::new().unwrap();
        {
            let mut session = repo.begin();
            session.create(&path("/a"), Node::object()).unwrap();
        }
        assert_eq!(repo.open_sessions(), 0);
        assert!(repo.committed(&path("/a")).is_none());
        assert_eq!(repo.commit_count(), 1);
    }

    #[test]
    fn test_create_makes_ancestors() {
        let repo = Repository::new().unwrap();
        let mut session = repo.begin();
        session.create(&path("/a/b/c"), Node::object()).unwrap();
        assert_eq!(session.get(&path("/a/b")).unwrap().kind, NodeKind::Object);
        assert_eq!(session.children(&path("/a")), vec![path("/a/b")]);
        assert!(matches!(
            session.create(&path("/a"), Node::object()),
            Err(StoreError::ItemExists(_))
        ));
    }

    #[test]
    fn test_datastream_cannot_have_children() {
        let repo = Repository::new().unwrap();
        let mut session = repo.begin();
        session.create(&path("/ds"), datastream()).unwrap();
        assert!(matches!(
            session.create(&path("/ds/x"), Node::object()),
            Err(StoreError::NotAContainer(_))
        ));
    }

    #[test]
    fn test_remove_cascades() {
        let repo = Repository::new().unwrap();
        let mut session = repo.begin();
        session.create(&path("/a/b/c"), Node::object()).unwrap();
        session.create(&path("/ab"), Node::object()).unwrap();
        session.commit().unwrap();

        let mut session = repo.begin();
        assert_eq!(session.remove(&path("/a")).unwrap(), 3);
        assert!(!session.exists(&path("/a/b/c")));
        assert!(session.exists(&path("/ab")));
        assert!(matches!(session.remove(&path("/a")), Err(StoreError::PathNotFound(_))));
        assert!(matches!(session.remove(&RepoPath::root()), Err(StoreError::RootImmutable)));
        session.commit().unwrap();
        assert_eq!(repo.resource_count(), 2);
    }

    #[test]
    fn test_copy_and_move() {
        let repo = Repository::new().unwrap();
        let mut session = repo.begin();
        session.create(&path("/foo/child"), Node::object()).unwrap();
        session.commit().unwrap();

        let mut session = repo.begin();
        session.copy(&path("/foo"), &path("/bar")).unwrap();
        session.commit().unwrap();
        let copied = repo.committed(&path("/bar/child")).unwrap();
        assert_eq!(copied.history.len(), 1);
        assert!(repo.committed(&path("/foo/child")).is_some());

        let original_versions = repo.committed(&path("/foo")).unwrap().history.clone();
        let mut session = repo.begin();
        session.move_to(&path("/foo"), &path("/deep/er/baz")).unwrap();
        session.commit().unwrap();
        assert!(repo.committed(&path("/foo")).is_none());
        assert!(repo.committed(&path("/foo/child")).is_none());
        assert!(repo.committed(&path("/deep/er")).is_some());
        let moved = repo.committed(&path("/deep/er/baz")).unwrap();
        assert_eq!(moved.history, original_versions);
    }

    #[test]
    fn test_subtree_operation_conflicts() {
        let repo = Repository::new().unwrap();
        let mut session = repo.begin();
        session.create(&path("/foo"), Node::object()).unwrap();
        session.create(&path("/baz"), Node::object()).unwrap();

        assert!(matches!(
            session.copy(&path("/missing"), &path("/x")),
            Err(StoreError::PathNotFound(_))
        ));
        assert!(matches!(
            session.copy(&path("/foo"), &path("/baz")),
            Err(StoreError::ItemExists(_))
        ));
        assert!(matches!(
            session.move_to(&path("/foo"), &path("/foo/inside")),
            Err(StoreError::InvalidDestination { .. })
        ));
        assert!(matches!(
            session.move_to(&RepoPath::root(), &path("/x")),
            Err(StoreError::RootImmutable)
        ));
        // onto itself: the destination is occupied before it is nested
        assert!(matches!(
            session.copy(&path("/foo"), &path("/foo")),
            Err(StoreError::ItemExists(_))
        ));
        assert!(matches!(
            session.move_to(&path("/foo"), &path("/foo")),
            Err(StoreError::ItemExists(_))
        ));
        assert!(session.exists(&path("/foo")));
        assert!(!session.exists(&path("/foo/inside")));
    }

    #[test]
    fn test_label_is_staged() {
        let repo = Repository::new().unwrap();
        let mut session = repo.begin();
        session.create(&path("/a"), Node::object()).unwrap();
        session.commit().unwrap();

        let mut session = repo.begin();
        assert_eq!(session.add_label(&path("/a"), "v1").unwrap(), LabelOutcome::Added);
        drop(session);
        assert!(repo.committed(&path("/a")).unwrap().history.resolve("v1").is_none());

        let mut session = repo.begin();
        session.add_label(&path("/a"), "v1").unwrap();
        session.commit().unwrap();
        let mut session = repo.begin();
        assert_eq!(session.add_label(&path("/a"), "v1").unwrap(), LabelOutcome::Unchanged);
        assert!(!session.has_changes());
    }

    #[test]
    fn test_stale_label_does_not_overwrite_newer_commit() {
        let repo = Repository::new().unwrap();
        let mut session = repo.begin();
        session.create(&path("/a"), Node::object()).unwrap();
        session.commit().unwrap();

        let mut labeller = repo.begin();
        labeller.add_label(&path("/a"), "v1").unwrap();

        let mut writer = repo.begin();
        let mut node = Node::clone(&writer.get(&path("/a")).unwrap());
        node.set_properties(vec![Property::new("http://x/p", Term::string("v"))]);
        writer.replace(&path("/a"), node).unwrap();
        writer.commit().unwrap();

        let err = labeller.commit().unwrap_err();
        assert!(matches!(err, StoreError::ConcurrentModification(ref p) if *p == path("/a")));
        assert_eq!(repo.open_sessions(), 0);

        let committed = repo.committed(&path("/a")).unwrap();
        assert_eq!(committed.history.len(), 2);
        assert_eq!(committed.properties().len(), 1);
        assert!(committed.history.resolve("v1").is_none());

        // retrying on the new state succeeds
        let mut session = repo.begin();
        session.add_label(&path("/a"), "v1").unwrap();
        session.commit().unwrap();
        let committed = repo.committed(&path("/a")).unwrap();
        assert_eq!(committed.properties().len(), 1);
        assert!(committed.history.resolve("v1").is_some());
    }

    #[test]
    fn test_concurrent_creates_of_same_path_conflict() {
        let repo = Repository::new().unwrap();
        let mut first = repo.begin();
        let mut second = repo.begin();
        first.create(&path("/a/b"), Node::object()).unwrap();
        second.create(&path("/a/c"), Node::object()).unwrap();

        first.commit().unwrap();
        // both staged the missing parent /a
        assert!(matches!(
            second.commit(),
            Err(StoreError::ConcurrentModification(p)) if p == path("/a")
        ));
        assert!(repo.committed(&path("/a/c")).is_none());
    }

    #[test]
    fn test_unrelated_commits_do_not_conflict() {
        let repo = Repository::new().unwrap();
        let mut session = repo.begin();
        session.create(&path("/a"), Node::object()).unwrap();
        session.create(&path("/b"), Node::object()).unwrap();
        session.commit().unwrap();

        let mut slow = repo.begin();
        // reading a path does not make it part of the commit check
        assert!(slow.exists(&path("/b")));
        slow.add_label(&path("/a"), "v1").unwrap();

        let mut fast = repo.begin();
        fast.remove(&path("/b")).unwrap();
        fast.commit().unwrap();

        slow.commit().unwrap();
        assert!(repo.committed(&path("/a")).unwrap().history.resolve("v1").is_some());
        assert!(repo.committed(&path("/b")).is_none());
    }

    #[test]
    fn test_staged_content_stays_private() {
        let repo = Repository::new().unwrap();
        let before = repo.objects().stats();

        let mut session = repo.begin();
        let content = Content::new(b"staged bytes".to_vec());
        let oid = session.stage_content(&content).unwrap();
        assert_eq!(session.content(&oid).unwrap(), content);
        assert!(repo.begin().content(&oid).is_err());
        drop(session);
        assert_eq!(repo.objects().stats(), before);

        let mut session = repo.begin();
        let oid = session.stage_content(&content).unwrap();
        session
            .create(&path("/ds"), Node::datastream(ContentRef::describe(oid, &content.data, "text/plain")))
            .unwrap();
        session.commit().unwrap();
        assert_eq!(repo.objects().get_content(&oid).unwrap(), content);
    }
}
