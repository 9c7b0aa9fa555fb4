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

//! Cross-module storage tests: concurrent sessions and subtree operations
//! over generated trees.

use arbor_core::{GraphSubjects, RepoPath};
use arbor_storage::{Node, PathOperationCoordinator, PathOperationError, Repository, VersionManager};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

fn subjects() -> GraphSubjects {
    GraphSubjects::new("http://localhost/rest/").unwrap()
}

fn relative_paths(repo: &Arc<Repository>, root: &RepoPath) -> BTreeSet<Vec<String>> {
    let session = repo.begin();
    session
        .subtree(root)
        .into_iter()
        .map(|(p, _)| p.segments()[root.depth()..].to_vec())
        .collect()
}

#[test]
fn test_concurrent_sessions_all_released() {
    let repo = Repository::new().unwrap();
    let versions = VersionManager::new(subjects());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let repo = Arc::clone(&repo);
            let versions = versions.clone();
            thread::spawn(move || {
                let path = RepoPath::parse(&format!("/t{}", i)).unwrap();
                let mut session = repo.begin();
                session.create(&path, Node::object()).unwrap();
                session.commit().unwrap();

                versions.add_label(repo.begin(), &path, "v1").unwrap();
                let listed = versions.list_versions(repo.begin(), &path).unwrap();
                assert!(!listed.collect_triples().is_empty());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(repo.open_sessions(), 0);
    assert_eq!(repo.resource_count(), 9);
}

#[test]
fn test_move_onto_occupied_is_atomic() {
    let repo = Repository::new().unwrap();
    let mut session = repo.begin();
    for p in ["/foo/a", "/foo/b/c", "/baz/x"] {
        session.create(&RepoPath::parse(p).unwrap(), Node::object()).unwrap();
    }
    session.commit().unwrap();

    let foo = RepoPath::parse("/foo").unwrap();
    let baz = RepoPath::parse("/baz").unwrap();
    let before_foo = relative_paths(&repo, &foo);
    let before_baz = relative_paths(&repo, &baz);

    let paths = PathOperationCoordinator::new(subjects());
    let err = paths
        .move_subtree(repo.begin(), &foo, "http://localhost/rest/baz")
        .unwrap_err();
    assert!(matches!(err, PathOperationError::DestinationOccupied(_)));

    assert_eq!(relative_paths(&repo, &foo), before_foo);
    assert_eq!(relative_paths(&repo, &baz), before_baz);
    assert_eq!(repo.open_sessions(), 0);
}

fn tree_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec("[a-d]{1,2}", 1..4), 1..8)
}

proptest! {
    #[test]
    fn prop_copy_preserves_structure(tree in tree_strategy()) {
        let repo = Repository::new().unwrap();
        let source = RepoPath::parse("/src").unwrap();
        let mut session = repo.begin();
        session.create(&source, Node::object()).unwrap();
        for segments in &tree {
            let path = RepoPath::from_segments(
                std::iter::once("src".to_string()).chain(segments.iter().cloned()),
            )
            .unwrap();
            if !session.exists(&path) {
                session.create(&path, Node::object()).unwrap();
            }
        }
        session.commit().unwrap();

        let paths = PathOperationCoordinator::new(subjects());
        let dest = paths.copy(repo.begin(), &source, "/rest/dst").unwrap();

        prop_assert_eq!(relative_paths(&repo, &source), relative_paths(&repo, &dest));
        prop_assert_eq!(repo.open_sessions(), 0);
    }

    #[test]
    fn prop_move_preserves_structure(tree in tree_strategy()) {
        let repo = Repository::new().unwrap();
        let source = RepoPath::parse("/src").unwrap();
        let mut session = repo.begin();
        session.create(&source, Node::object()).unwrap();
        for segments in &tree {
            let path = RepoPath::from_segments(
                std::iter::once("src".to_string()).chain(segments.iter().cloned()),
            )
            .unwrap();
            if !session.exists(&path) {
                session.create(&path, Node::object()).unwrap();
            }
        }
        session.commit().unwrap();
        let before = relative_paths(&repo, &source);

        let paths = PathOperationCoordinator::new(subjects());
        let dest = paths.move_subtree(repo.begin(), &source, "dst").unwrap();

        prop_assert_eq!(relative_paths(&repo, &dest), before);
        prop_assert!(!repo.begin().exists(&source));
    }
}
