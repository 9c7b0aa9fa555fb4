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

//! Arbor Core
//!
//! Storage-independent building blocks of the repository: paths, identifier
//! minting, the RDF model and vocabulary, subject resolution, content
//! negotiation and the streaming serializers.

pub mod identifier;
pub mod media;
pub mod negotiate;
pub mod path;
pub mod rdf;
pub mod subjects;
pub mod time;
pub mod writer;

pub use identifier::{pairtree_from_token, IdentifierMinter, MintError, PairtreeShape, TokenForm};
pub use media::{RdfFormat, POSSIBLE_RDF_VARIANTS};
pub use negotiate::{select, NegotiationError};
pub use path::{PathError, RepoPath, RESERVED_PREFIX};
pub use rdf::{parse_ntriples, Literal, ParseError, Term, Triple};
pub use subjects::{GraphSubjects, SubjectError, VERSIONS_SEGMENT};
pub use time::{current_timestamp_us, datetime_literal, format_timestamp};
pub use writer::{serialize, writer_for, RdfWriter, WriteError};
