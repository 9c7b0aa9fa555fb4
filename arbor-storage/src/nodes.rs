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

//! Resource creation, update, deletion and description.

use crate::error::StoreError;
use crate::node::{Node, NodeKind, Property};
use crate::objects::{Content, ContentRef};
use crate::session::Session;
use crate::stream::RdfStream;
use crate::triples::resource_triples;
use arbor_core::rdf::vocab::is_server_managed;
use arbor_core::{
    GraphSubjects, IdentifierMinter, MintError, PairtreeShape, PathError, RepoPath, Triple,
};
use thiserror::Error;
use tracing::info;

/// Node service errors
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Resource not found: {0}")]
    NotFound(RepoPath),

    #[error("Resource already exists: {0}")]
    AlreadyExists(RepoPath),

    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("Identifier minting failed: {0}")]
    Mint(#[from] MintError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflicting change to {0}")]
    Conflict(RepoPath),

    #[error("Repository failure: {0}")]
    Repository(StoreError),
}

impl From<StoreError> for NodeError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::PathNotFound(p) => NodeError::NotFound(p),
            StoreError::ItemExists(p) => NodeError::AlreadyExists(p),
            StoreError::NotAContainer(p) => {
                NodeError::BadRequest(format!("{} cannot have children", p))
            }
            StoreError::RootImmutable => {
                NodeError::BadRequest("the root cannot be removed or replaced".to_string())
            }
            StoreError::ConcurrentModification(p) => NodeError::Conflict(p),
            other => NodeError::Repository(other),
        }
    }
}

/// Initial state of a new resource
#[derive(Debug, Clone)]
pub enum NodeSpec {
    Object { properties: Vec<Triple> },
    Datastream { data: Vec<u8>, mime_type: String },
}

/// Whether a PUT created or replaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Created,
    Replaced,
}

/// Datastream bytes with their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatastreamContent {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub digest: String,
}

#[derive(Debug, Clone)]
pub struct NodeService {
    subjects: GraphSubjects,
    minter: IdentifierMinter,
    shape: PairtreeShape,
}

impl NodeService {
    pub fn new(subjects: GraphSubjects, minter: IdentifierMinter, shape: PairtreeShape) -> Self {
        Self {
            subjects,
            minter,
            shape,
        }
    }

    pub fn subjects(&self) -> &GraphSubjects {
        &self.subjects
    }

    /// Create a resource at `path`
    pub fn create(&self, mut session: Session, path: &RepoPath, spec: NodeSpec) -> Result<RepoPath, NodeError> {
        self.create_in(&mut session, path, spec)?;
        session.commit()?;
        info!(path = %path, "Resource created");
        Ok(path.clone())
    }

    /// Create a child of `parent`, named by `slug` or a minted identifier
    pub fn create_child(
        &self,
        mut session: Session,
        parent: &RepoPath,
        slug: Option<&str>,
        spec: NodeSpec,
    ) -> Result<RepoPath, NodeError> {
        let path = self.child_path(&session, parent, slug)?;
        self.create_in(&mut session, &path, spec)?;
        session.commit()?;
        info!(path = %path, "Child created");
        Ok(path)
    }

    /// Path a new child of `parent` would get: the slug when given,
    /// otherwise a freshly minted pairtree identifier.
    pub fn child_path(
        &self,
        session: &Session,
        parent: &RepoPath,
        slug: Option<&str>,
    ) -> Result<RepoPath, NodeError> {
        let parent_node = session
            .get(parent)
            .ok_or_else(|| NodeError::NotFound(parent.clone()))?;
        if !parent_node.kind.can_have_children() {
            return Err(NodeError::BadRequest(format!("{} cannot have children", parent)));
        }

        match slug.map(str::trim).filter(|s| !s.is_empty()) {
            Some(slug) => Ok(parent.child(slug)?),
            None => Ok(parent.join(&self.minter.mint_shaped(self.shape)?)?),
        }
    }

    /// Replace the user properties of an existing resource
    pub fn replace_properties(
        &self,
        mut session: Session,
        path: &RepoPath,
        triples: Vec<Triple>,
    ) -> Result<(), NodeError> {
        self.replace_properties_in(&mut session, path, triples)?;
        session.commit()?;
        Ok(())
    }

    /// Replace the content of an existing datastream
    pub fn replace_content(
        &self,
        mut session: Session,
        path: &RepoPath,
        data: Vec<u8>,
        mime_type: &str,
    ) -> Result<(), NodeError> {
        self.replace_content_in(&mut session, path, data, mime_type)?;
        session.commit()?;
        Ok(())
    }

    /// Create or replace from a PUT body
    pub fn put(&self, mut session: Session, path: &RepoPath, spec: NodeSpec) -> Result<PutOutcome, NodeError> {
        let outcome = match (session.get(path), spec) {
            (None, spec) => {
                self.create_in(&mut session, path, spec)?;
                PutOutcome::Created
            }
            (Some(_), NodeSpec::Object { properties }) => {
                self.replace_properties_in(&mut session, path, properties)?;
                PutOutcome::Replaced
            }
            (Some(_), NodeSpec::Datastream { data, mime_type }) => {
                self.replace_content_in(&mut session, path, data, &mime_type)?;
                PutOutcome::Replaced
            }
        };
        session.commit()?;
        info!(path = %path, outcome = ?outcome, "Resource stored");
        Ok(outcome)
    }

    /// Delete `path` and everything below it
    pub fn delete(&self, mut session: Session, path: &RepoPath) -> Result<usize, NodeError> {
        let removed = session.remove(path)?;
        session.commit()?;
        info!(path = %path, removed, "Resource deleted");
        Ok(removed)
    }

    /// Stream the current description of `path`
    pub fn describe(&self, session: Session, path: &RepoPath) -> Result<RdfStream, NodeError> {
        let node = session
            .get(path)
            .ok_or_else(|| NodeError::NotFound(path.clone()))?;
        let children = session.children(path);
        let triples = resource_triples(&self.subjects, path, &node, children);
        Ok(RdfStream::new(triples, session))
    }

    /// Binary content of a datastream
    pub fn content(&self, session: Session, path: &RepoPath) -> Result<DatastreamContent, NodeError> {
        let node = session
            .get(path)
            .ok_or_else(|| NodeError::NotFound(path.clone()))?;
        let cref = node
            .content
            .as_ref()
            .ok_or_else(|| NodeError::BadRequest(format!("{} is not a datastream", path)))?;
        let content = session.content(&cref.oid)?;
        let result = DatastreamContent {
            data: content.data,
            mime_type: cref.mime_type.clone(),
            digest: cref.digest.clone(),
        };
        session.release();
        Ok(result)
    }

    fn create_in(&self, session: &mut Session, path: &RepoPath, spec: NodeSpec) -> Result<(), NodeError> {
        if session.exists(path) {
            return Err(NodeError::AlreadyExists(path.clone()));
        }
        let node = match spec {
            NodeSpec::Object { properties } => {
                let mut node = Node::object();
                node.set_properties(self.accept_properties(path, properties)?);
                node
            }
            NodeSpec::Datastream { data, mime_type } => {
                Node::datastream(store_content(session, data, &mime_type)?)
            }
        };
        session.create(path, node)?;
        Ok(())
    }

    fn replace_properties_in(
        &self,
        session: &mut Session,
        path: &RepoPath,
        triples: Vec<Triple>,
    ) -> Result<(), NodeError> {
        let current = session
            .get(path)
            .ok_or_else(|| NodeError::NotFound(path.clone()))?;
        let mut node = Node::clone(&current);
        node.set_properties(self.accept_properties(path, triples)?);
        session.replace(path, node)?;
        Ok(())
    }

    fn replace_content_in(
        &self,
        session: &mut Session,
        path: &RepoPath,
        data: Vec<u8>,
        mime_type: &str,
    ) -> Result<(), NodeError> {
        let current = session
            .get(path)
            .ok_or_else(|| NodeError::NotFound(path.clone()))?;
        if current.kind != NodeKind::Datastream {
            return Err(NodeError::BadRequest(format!("{} is not a datastream", path)));
        }
        let mut node = Node::clone(&current);
        node.set_content(store_content(session, data, mime_type)?);
        session.replace(path, node)?;
        Ok(())
    }

    /// Keep only statements about the resource itself, rejecting
    /// server-managed predicates.
    fn accept_properties(&self, path: &RepoPath, triples: Vec<Triple>) -> Result<Vec<Property>, NodeError> {
        let subject = self.subjects.subject_term(path);
        triples
            .into_iter()
            .map(|t| {
                if t.subject != subject {
                    return Err(NodeError::BadRequest(format!(
                        "subject {} is not {}",
                        t.subject, subject
                    )));
                }
                if is_server_managed(&t.predicate) {
                    return Err(NodeError::BadRequest(format!(
                        "predicate <{}> is managed by the server",
                        t.predicate
                    )));
                }
                Ok(Property::new(t.predicate, t.object))
            })
            .collect()
    }
}

fn store_content(session: &mut Session, data: Vec<u8>, mime_type: &str) -> Result<ContentRef, NodeError> {
    let content = Content::new(data);
    let oid = session.stage_content(&content)?;
    Ok(ContentRef::describe(oid, &content.data, mime_type))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;
    use arbor_core::rdf::vocab::{REPO_CREATED, REPO_HAS_CHILD};
    use arbor_core::{Term, TokenForm};
    use std::sync::Arc;

    fn path(p: &str) -> RepoPath {
        RepoPath::parse(p).unwrap()
    }

    fn setup() -> (Arc<Repository>, NodeService) {
        let subjects = GraphSubjects::new("http://localhost/rest/").unwrap();
        let service = NodeService::new(
            subjects,
            IdentifierMinter::new(TokenForm::Hyphenated),
            PairtreeShape::default(),
        );
        (Repository::new().unwrap(), service)
    }

    fn title(subject: &str, value: &str) -> Triple {
        Triple::new(Term::iri(subject), "http://purl.org/dc/terms/title", Term::string(value))
    }

    #[test]
    fn test_create_and_describe() {
        let (repo, nodes) = setup();
        let spec = NodeSpec::Object {
            properties: vec![title("http://localhost/rest/a", "A")],
        };
        nodes.create(repo.begin(), &path("/a"), spec).unwrap();

        let triples = nodes.describe(repo.begin(), &path("/a")).unwrap().collect_triples();
        assert!(triples.contains(&title("http://localhost/rest/a", "A")));

        let root = nodes.describe(repo.begin(), &RepoPath::root()).unwrap().collect_triples();
        assert!(root.contains(&Triple::new(
            Term::iri("http://localhost/rest/"),
            REPO_HAS_CHILD,
            Term::iri("http://localhost/rest/a")
        )));
        assert_eq!(repo.open_sessions(), 0);
    }

    #[test]
    fn test_create_existing_fails() {
        let (repo, nodes) = setup();
        let spec = NodeSpec::Object { properties: vec![] };
        nodes.create(repo.begin(), &path("/a"), spec.clone()).unwrap();
        let err = nodes.create(repo.begin(), &path("/a"), spec).unwrap_err();
        assert!(matches!(err, NodeError::AlreadyExists(_)));
        assert_eq!(repo.open_sessions(), 0);
    }

    #[test]
    fn test_create_child_minted_and_slug() {
        let (repo, nodes) = setup();
        let spec = NodeSpec::Object { properties: vec![] };
        let minted = nodes
            .create_child(repo.begin(), &RepoPath::root(), None, spec.clone())
            .unwrap();
        assert_eq!(minted.depth(), 5);
        assert_eq!(minted.file_name().unwrap().len(), 36);

        let named = nodes
            .create_child(repo.begin(), &RepoPath::root(), Some("named"), spec.clone())
            .unwrap();
        assert_eq!(named, path("/named"));

        let err = nodes
            .create_child(repo.begin(), &path("/missing"), None, spec)
            .unwrap_err();
        assert!(matches!(err, NodeError::NotFound(_)));
    }

    #[test]
    fn test_rejects_foreign_subject_and_managed_predicate() {
        let (repo, nodes) = setup();
        let spec = NodeSpec::Object {
            properties: vec![title("http://localhost/rest/other", "X")],
        };
        assert!(matches!(
            nodes.create(repo.begin(), &path("/a"), spec),
            Err(NodeError::BadRequest(_))
        ));

        let spec = NodeSpec::Object {
            properties: vec![Triple::new(
                Term::iri("http://localhost/rest/a"),
                REPO_CREATED,
                Term::string("now"),
            )],
        };
        assert!(matches!(
            nodes.create(repo.begin(), &path("/a"), spec),
            Err(NodeError::BadRequest(_))
        ));
        assert!(!repo.begin().exists(&path("/a")));
    }

    #[test]
    fn test_put_and_replace() {
        let (repo, nodes) = setup();
        let spec = NodeSpec::Object {
            properties: vec![title("http://localhost/rest/a", "one")],
        };
        assert_eq!(nodes.put(repo.begin(), &path("/a"), spec).unwrap(), PutOutcome::Created);

        nodes
            .replace_properties(repo.begin(), &path("/a"), vec![title("http://localhost/rest/a", "two")])
            .unwrap();
        let triples = nodes.describe(repo.begin(), &path("/a")).unwrap().collect_triples();
        assert!(triples.contains(&title("http://localhost/rest/a", "two")));
        assert!(!triples.contains(&title("http://localhost/rest/a", "one")));

        let err = nodes
            .replace_properties(repo.begin(), &path("/missing"), vec![])
            .unwrap_err();
        assert!(matches!(err, NodeError::NotFound(_)));
    }

    #[test]
    fn test_datastream_content() {
        let (repo, nodes) = setup();
        let spec = NodeSpec::Datastream {
            data: b"hello".to_vec(),
            mime_type: "text/plain".to_string(),
        };
        nodes.create(repo.begin(), &path("/obj/ds"), spec).unwrap();

        let content = nodes.content(repo.begin(), &path("/obj/ds")).unwrap();
        assert_eq!(content.data, b"hello");
        assert_eq!(content.mime_type, "text/plain");

        nodes
            .replace_content(repo.begin(), &path("/obj/ds"), b"bye".to_vec(), "text/x-bye")
            .unwrap();
        let content = nodes.content(repo.begin(), &path("/obj/ds")).unwrap();
        assert_eq!(content.data, b"bye");

        assert!(matches!(
            nodes.content(repo.begin(), &path("/obj")),
            Err(NodeError::BadRequest(_))
        ));
        assert!(matches!(
            nodes.replace_content(repo.begin(), &path("/obj"), vec![], "text/plain"),
            Err(NodeError::BadRequest(_))
        ));
        assert_eq!(repo.open_sessions(), 0);
    }

    #[test]
    fn test_delete() {
        let (repo, nodes) = setup();
        nodes
            .create(repo.begin(), &path("/a/b"), NodeSpec::Object { properties: vec![] })
            .unwrap();
        assert_eq!(nodes.delete(repo.begin(), &path("/a")).unwrap(), 2);
        assert!(matches!(
            nodes.delete(repo.begin(), &path("/a")),
            Err(NodeError::NotFound(_))
        ));
        assert!(matches!(
            nodes.delete(repo.begin(), &RepoPath::root()),
            Err(NodeError::BadRequest(_))
        ));
    }

    #[test]
    fn test_failed_write_stores_no_content() {
        let (repo, nodes) = setup();
        let datastream = |data: &[u8]| NodeSpec::Datastream {
            data: data.to_vec(),
            mime_type: "application/octet-stream".to_string(),
        };
        nodes.create(repo.begin(), &path("/ds"), datastream(b"parent")).unwrap();
        let stats = repo.objects().stats();

        // a datastream cannot have children
        assert!(matches!(
            nodes.put(repo.begin(), &path("/ds/child"), datastream(b"orphaned bytes")),
            Err(NodeError::BadRequest(_))
        ));
        assert_eq!(repo.objects().stats(), stats);

        // staged but never committed
        let mut session = repo.begin();
        store_content(&mut session, b"discarded bytes".to_vec(), "text/plain").unwrap();
        session.release();
        assert_eq!(repo.objects().stats(), stats);
        assert_eq!(repo.open_sessions(), 0);
    }
}
