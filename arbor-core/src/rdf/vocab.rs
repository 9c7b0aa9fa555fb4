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

//! Vocabulary used for server-managed triples.

pub const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";
pub const REPO_NS: &str = "http://arbor-repo.org/ns/repository#";

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";

pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_LONG: &str = "http://www.w3.org/2001/XMLSchema#long";
pub const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

// Classes
pub const REPO_RESOURCE: &str = "http://arbor-repo.org/ns/repository#Resource";
pub const REPO_CONTAINER: &str = "http://arbor-repo.org/ns/repository#Container";
pub const REPO_OBJECT: &str = "http://arbor-repo.org/ns/repository#Object";
pub const REPO_DATASTREAM: &str = "http://arbor-repo.org/ns/repository#Datastream";
pub const REPO_VERSION: &str = "http://arbor-repo.org/ns/repository#Version";

// Properties
pub const REPO_CREATED: &str = "http://arbor-repo.org/ns/repository#created";
pub const REPO_LAST_MODIFIED: &str = "http://arbor-repo.org/ns/repository#lastModified";
pub const REPO_HAS_PARENT: &str = "http://arbor-repo.org/ns/repository#hasParent";
pub const REPO_HAS_CHILD: &str = "http://arbor-repo.org/ns/repository#hasChild";
pub const REPO_HAS_VERSIONS: &str = "http://arbor-repo.org/ns/repository#hasVersions";
pub const REPO_HAS_VERSION: &str = "http://arbor-repo.org/ns/repository#hasVersion";
pub const REPO_HAS_VERSION_LABEL: &str = "http://arbor-repo.org/ns/repository#hasVersionLabel";
pub const REPO_MIME_TYPE: &str = "http://arbor-repo.org/ns/repository#mimeType";
pub const REPO_SIZE: &str = "http://arbor-repo.org/ns/repository#size";
pub const REPO_DIGEST: &str = "http://arbor-repo.org/ns/repository#digest";

/// Prefixes emitted by the Turtle-family writers.
pub const PREFIXES: &[(&str, &str)] = &[("rdf", RDF_NS), ("xsd", XSD_NS), ("repo", REPO_NS)];

/// Predicates in the repository namespace are maintained by the server and
/// may not be written by clients.
pub fn is_server_managed(predicate: &str) -> bool {
    predicate.starts_with(REPO_NS)
}
