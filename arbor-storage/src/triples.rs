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

//! RDF descriptions of resources and their snapshots.
//!
//! The subject of every description is the resource's graph subject, so a
//! historical snapshot and the current resource describe the same node.

use crate::node::{Node, NodeKind, Property};
use crate::objects::{ContentRef, Snapshot};
use arbor_core::rdf::vocab::{
    RDF_TYPE, REPO_CREATED, REPO_DIGEST, REPO_HAS_CHILD, REPO_HAS_PARENT, REPO_HAS_VERSIONS,
    REPO_LAST_MODIFIED, REPO_MIME_TYPE, REPO_SIZE, XSD_LONG,
};
use arbor_core::{datetime_literal, GraphSubjects, RepoPath, Term, Triple};

/// Current description: state plus server-managed hierarchy and timestamps
pub fn resource_triples(
    subjects: &GraphSubjects,
    path: &RepoPath,
    node: &Node,
    children: Vec<RepoPath>,
) -> impl Iterator<Item = Triple> + Send + 'static {
    let subject = subjects.subject_term(path);

    let mut managed = vec![
        Triple::new(subject.clone(), REPO_CREATED, datetime_literal(node.created_us)),
        Triple::new(
            subject.clone(),
            REPO_LAST_MODIFIED,
            datetime_literal(node.last_modified_us),
        ),
    ];
    if let Some(parent) = path.parent() {
        managed.push(Triple::new(
            subject.clone(),
            REPO_HAS_PARENT,
            subjects.subject_term(&parent),
        ));
    }
    if !node.history.is_empty() {
        managed.push(Triple::new(
            subject.clone(),
            REPO_HAS_VERSIONS,
            Term::Iri(subjects.versions_subject(path)),
        ));
    }

    let child_subject = subject.clone();
    let subjects = subjects.clone();
    let child_triples = children.into_iter().map(move |child| {
        Triple::new(
            child_subject.clone(),
            REPO_HAS_CHILD,
            subjects.subject_term(&child),
        )
    });

    state_triples(
        subject,
        node.kind,
        node.content.clone(),
        node.properties().to_vec(),
    )
    .chain(managed)
    .chain(child_triples)
}

/// Description of a stored snapshot under the resource's subject
pub fn snapshot_triples(
    subject: Term,
    snapshot: Snapshot,
) -> impl Iterator<Item = Triple> + Send + 'static {
    state_triples(subject, snapshot.kind, snapshot.content, snapshot.properties)
}

fn state_triples(
    subject: Term,
    kind: NodeKind,
    content: Option<ContentRef>,
    properties: Vec<Property>,
) -> impl Iterator<Item = Triple> + Send + 'static {
    let type_subject = subject.clone();
    let types = kind
        .rdf_types()
        .into_iter()
        .map(move |t| Triple::new(type_subject.clone(), RDF_TYPE, Term::iri(t)));

    let content_subject = subject.clone();
    let content = content.into_iter().flat_map(move |c| {
        [
            Triple::new(content_subject.clone(), REPO_MIME_TYPE, Term::string(c.mime_type)),
            Triple::new(
                content_subject.clone(),
                REPO_SIZE,
                Term::typed(c.size.to_string(), XSD_LONG),
            ),
            Triple::new(
                content_subject.clone(),
                REPO_DIGEST,
                Term::iri(format!("urn:blake3:{}", c.digest)),
            ),
        ]
    });

    let user = properties
        .into_iter()
        .map(move |p| Triple::new(subject.clone(), p.predicate, p.object));

    types.chain(content).chain(user)
}
