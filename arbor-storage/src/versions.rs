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

//! Version listing, labeling and retrieval.
//!
//! Every operation takes ownership of the session it runs in. Reads hand
//! the session on inside the returned `RdfStream`; writes commit it on
//! success. On any error the session is dropped, which releases it.

use crate::error::StoreError;
use crate::history::{LabelOutcome, VersionEntry};
use crate::session::Session;
use crate::stream::RdfStream;
use crate::triples::snapshot_triples;
use arbor_core::rdf::vocab::{
    RDF_TYPE, REPO_CREATED, REPO_HAS_VERSION, REPO_HAS_VERSION_LABEL, REPO_VERSION,
};
use arbor_core::{datetime_literal, GraphSubjects, RepoPath, Term, Triple};
use thiserror::Error;
use tracing::info;

/// Version errors
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("Resource not found: {0}")]
    NotFound(RepoPath),

    #[error("No version '{label}' of {path}")]
    LabelNotFound { path: RepoPath, label: String },

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Label '{label}' already names another version of {path}")]
    LabelConflict { label: String, path: RepoPath },

    #[error("Conflicting change to {0}")]
    Conflict(RepoPath),

    #[error("Repository failure: {0}")]
    Repository(StoreError),
}

impl From<StoreError> for VersionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::PathNotFound(path) => VersionError::NotFound(path),
            StoreError::InvalidLabel(msg) => VersionError::InvalidLabel(msg),
            StoreError::LabelConflict { label, path } => VersionError::LabelConflict { label, path },
            StoreError::ConcurrentModification(path) => VersionError::Conflict(path),
            other => VersionError::Repository(other),
        }
    }
}

/// A version resolved by `get_version`
#[derive(Debug)]
pub struct ResolvedVersion {
    pub entry: VersionEntry,
    pub labels: Vec<String>,
    pub triples: RdfStream,
}

#[derive(Debug, Clone)]
pub struct VersionManager {
    subjects: GraphSubjects,
}

impl VersionManager {
    pub fn new(subjects: GraphSubjects) -> Self {
        Self { subjects }
    }

    /// Stream the version graph of `path`, oldest version first.
    pub fn list_versions(&self, session: Session, path: &RepoPath) -> Result<RdfStream, VersionError> {
        let node = session
            .get(path)
            .ok_or_else(|| VersionError::NotFound(path.clone()))?;

        let history = node.history.clone();
        let entries = history.entries().to_vec();
        let subject = self.subjects.subject_term(path);
        let subjects = self.subjects.clone();
        let path = path.clone();

        let triples = entries.into_iter().flat_map(move |entry| {
            let version = Term::Iri(subjects.version_subject(&path, &entry.id.to_hex()));
            let mut triples = vec![
                Triple::new(subject.clone(), REPO_HAS_VERSION, version.clone()),
                Triple::new(version.clone(), RDF_TYPE, Term::iri(REPO_VERSION)),
                Triple::new(version.clone(), REPO_CREATED, datetime_literal(entry.created_us)),
            ];
            for label in history.labels_for(&entry.id) {
                triples.push(Triple::new(
                    version.clone(),
                    REPO_HAS_VERSION_LABEL,
                    Term::string(label),
                ));
            }
            triples
        });

        Ok(RdfStream::new(triples, session))
    }

    /// Label the current version of `path` and commit.
    pub fn add_label(
        &self,
        mut session: Session,
        path: &RepoPath,
        label: &str,
    ) -> Result<LabelOutcome, VersionError> {
        let outcome = session.add_label(path, label)?;
        session.commit()?;
        if outcome == LabelOutcome::Added {
            info!(path = %path, label = %label, "Version labeled");
        }
        Ok(outcome)
    }

    /// Resolve `label` (or a version id) and stream that version's triples.
    pub fn get_version(
        &self,
        session: Session,
        path: &RepoPath,
        label: &str,
    ) -> Result<ResolvedVersion, VersionError> {
        let node = session
            .get(path)
            .ok_or_else(|| VersionError::NotFound(path.clone()))?;
        let entry = node
            .history
            .resolve(label)
            .cloned()
            .ok_or_else(|| VersionError::LabelNotFound {
                path: path.clone(),
                label: label.to_string(),
            })?;

        let snapshot = session
            .repository()
            .objects()
            .get_snapshot(&entry.snapshot)?;
        let labels = node.history.labels_for(&entry.id);
        let triples = snapshot_triples(self.subjects.subject_term(path), snapshot);

        Ok(ResolvedVersion {
            entry,
            labels,
            triples: RdfStream::new(triples, session),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, Property};
    use crate::repository::Repository;
    use std::sync::Arc;

    fn path(p: &str) -> RepoPath {
        RepoPath::parse(p).unwrap()
    }

    fn setup() -> (Arc<Repository>, VersionManager) {
        let repo = Repository::new().unwrap();
        let mut session = repo.begin();
        session.create(&path("/obj"), Node::object()).unwrap();
        session.commit().unwrap();
        let subjects = GraphSubjects::new("http://localhost/rest/").unwrap();
        (repo, VersionManager::new(subjects))
    }

    fn set_title(repo: &Arc<Repository>, title: &str) {
        let mut session = repo.begin();
        let mut node = Node::clone(&session.get(&path("/obj")).unwrap());
        node.set_properties(vec![Property::new("http://x/title", Term::string(title))]);
        session.replace(&path("/obj"), node).unwrap();
        session.commit().unwrap();
    }

    #[test]
    fn test_list_versions() {
        let (repo, versions) = setup();
        set_title(&repo, "one");

        let triples = versions
            .list_versions(repo.begin(), &path("/obj"))
            .unwrap()
            .collect_triples();
        let subject = Term::iri("http://localhost/rest/obj");
        let listed: Vec<_> = triples
            .iter()
            .filter(|t| t.subject == subject && t.predicate == REPO_HAS_VERSION)
            .collect();
        assert_eq!(listed.len(), 2);
        assert!(listed[0]
            .object
            .as_iri()
            .unwrap()
            .starts_with("http://localhost/rest/obj/arb:versions/"));
        assert_eq!(repo.open_sessions(), 0);
    }

    #[test]
    fn test_list_versions_missing() {
        let (repo, versions) = setup();
        let err = versions.list_versions(repo.begin(), &path("/nope")).unwrap_err();
        assert!(matches!(err, VersionError::NotFound(_)));
        assert_eq!(repo.open_sessions(), 0);
    }

    #[test]
    fn test_label_then_get_returns_labeled_state() {
        let (repo, versions) = setup();
        set_title(&repo, "before");
        versions.add_label(repo.begin(), &path("/obj"), "v1").unwrap();
        set_title(&repo, "after");

        let resolved = versions.get_version(repo.begin(), &path("/obj"), "v1").unwrap();
        assert_eq!(resolved.labels, vec!["v1"]);
        let triples = resolved.triples.collect_triples();
        let subject = Term::iri("http://localhost/rest/obj");
        assert!(triples.contains(&Triple::new(subject.clone(), "http://x/title", Term::string("before"))));
        assert!(!triples.contains(&Triple::new(subject, "http://x/title", Term::string("after"))));
        assert_eq!(repo.open_sessions(), 0);
    }

    #[test]
    fn test_label_idempotent_and_unique() {
        let (repo, versions) = setup();
        assert_eq!(
            versions.add_label(repo.begin(), &path("/obj"), "v1").unwrap(),
            LabelOutcome::Added
        );
        assert_eq!(
            versions.add_label(repo.begin(), &path("/obj"), "v1").unwrap(),
            LabelOutcome::Unchanged
        );
        versions.add_label(repo.begin(), &path("/obj"), "also").unwrap();
        assert!(versions.get_version(repo.begin(), &path("/obj"), "v1").is_ok());

        set_title(&repo, "changed");
        let err = versions.add_label(repo.begin(), &path("/obj"), "v1").unwrap_err();
        assert!(matches!(err, VersionError::LabelConflict { .. }));
        assert_eq!(repo.open_sessions(), 0);
    }

    #[test]
    fn test_label_errors_release_session() {
        let (repo, versions) = setup();
        let err = versions.add_label(repo.begin(), &path("/nope"), "v1").unwrap_err();
        assert!(matches!(err, VersionError::NotFound(_)));
        let err = versions.add_label(repo.begin(), &path("/obj"), "bad label").unwrap_err();
        assert!(matches!(err, VersionError::InvalidLabel(_)));
        let err = versions.get_version(repo.begin(), &path("/obj"), "missing").unwrap_err();
        assert!(matches!(err, VersionError::LabelNotFound { .. }));
        assert_eq!(repo.open_sessions(), 0);
    }
}
