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

//! Resource nodes held in the repository tree.

use crate::history::VersionHistory;
use crate::objects::{ContentRef, Snapshot};
use arbor_core::rdf::vocab::{REPO_CONTAINER, REPO_DATASTREAM, REPO_OBJECT, REPO_RESOURCE};
use arbor_core::{current_timestamp_us, Term};
use serde::{Deserialize, Serialize};

/// Kind of resource at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// The repository root
    Container,
    Object,
    /// Binary content with a MIME type
    Datastream,
}

impl NodeKind {
    /// `rdf:type` values for this kind
    pub fn rdf_types(self) -> [&'static str; 2] {
        match self {
            NodeKind::Container => [REPO_RESOURCE, REPO_CONTAINER],
            NodeKind::Object => [REPO_RESOURCE, REPO_OBJECT],
            NodeKind::Datastream => [REPO_RESOURCE, REPO_DATASTREAM],
        }
    }

    pub fn can_have_children(self) -> bool {
        !matches!(self, NodeKind::Datastream)
    }
}

/// A user-supplied property of a resource; the subject is implicit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Property {
    pub predicate: String,
    pub object: Term,
}

impl Property {
    pub fn new(predicate: impl Into<String>, object: Term) -> Self {
        Self {
            predicate: predicate.into(),
            object,
        }
    }
}

/// A resource in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    properties: Vec<Property>,
    pub content: Option<ContentRef>,
    pub created_us: u64,
    pub last_modified_us: u64,
    pub history: VersionHistory,
}

impl Node {
    fn new(kind: NodeKind, content: Option<ContentRef>) -> Self {
        let now = current_timestamp_us();
        Self {
            kind,
            properties: Vec::new(),
            content,
            created_us: now,
            last_modified_us: now,
            history: VersionHistory::new(),
        }
    }

    pub fn container() -> Self {
        Self::new(NodeKind::Container, None)
    }

    pub fn object() -> Self {
        Self::new(NodeKind::Object, None)
    }

    pub fn datastream(content: ContentRef) -> Self {
        Self::new(NodeKind::Datastream, Some(content))
    }

    /// User properties, sorted and free of duplicates
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn set_properties(&mut self, mut properties: Vec<Property>) {
        properties.sort();
        properties.dedup();
        self.properties = properties;
        self.touch();
    }

    pub fn set_content(&mut self, content: ContentRef) {
        self.content = Some(content);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_modified_us = current_timestamp_us().max(self.last_modified_us);
    }

    /// Copy of this node with a fresh history, as placed by a subtree copy
    pub fn fresh_copy(&self) -> Self {
        let now = current_timestamp_us();
        Self {
            kind: self.kind,
            properties: self.properties.clone(),
            content: self.content.clone(),
            created_us: now,
            last_modified_us: now,
            history: VersionHistory::new(),
        }
    }

    /// Versionable state
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            kind: self.kind,
            properties: self.properties.clone(),
            content: self.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_sorted_and_deduplicated() {
        let mut node = Node::object();
        node.set_properties(vec![
            Property::new("http://x/b", Term::string("2")),
            Property::new("http://x/a", Term::string("1")),
            Property::new("http://x/b", Term::string("2")),
        ]);
        let preds: Vec<_> = node.properties().iter().map(|p| p.predicate.as_str()).collect();
        assert_eq!(preds, vec!["http://x/a", "http://x/b"]);
    }

    #[test]
    fn test_snapshot_ignores_timestamps() {
        let a = Node::object();
        let mut b = a.clone();
        b.created_us += 10;
        b.touch();
        assert_eq!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_kinds() {
        assert!(NodeKind::Container.can_have_children());
        assert!(!NodeKind::Datastream.can_have_children());
        assert_eq!(NodeKind::Object.rdf_types()[1], REPO_OBJECT);
    }
}
