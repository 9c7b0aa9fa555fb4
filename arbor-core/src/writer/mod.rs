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

//! Streaming RDF writers.
//!
//! A writer is fed one triple at a time and appends bytes to a caller-owned
//! buffer, so the HTTP layer can flush chunks while the triple source is
//! still being drained. Writers that need the whole graph (RDF/JSON) buffer
//! internally and emit on `finish`.

mod ntriples;
mod rdfjson;
mod rdfxml;
mod turtle;

pub use ntriples::NTriplesWriter;
pub use rdfjson::RdfJsonWriter;
pub use rdfxml::RdfXmlWriter;
pub use turtle::TurtleWriter;

use crate::media::RdfFormat;
use crate::rdf::Triple;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WriteError {
    /// RDF/XML needs an element name for every predicate
    #[error("predicate <{0}> cannot be written as an RDF/XML element")]
    NoElementName(String),

    #[error("XML output failed: {0}")]
    Xml(String),
}

/// Incremental serializer for one RDF graph.
pub trait RdfWriter {
    /// Emit any preamble. Called once before the first triple.
    fn start(&mut self, out: &mut Vec<u8>) -> Result<(), WriteError>;

    fn write(&mut self, triple: &Triple, out: &mut Vec<u8>) -> Result<(), WriteError>;

    /// Emit any trailer. Called once after the last triple.
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), WriteError>;
}

/// Writer for a negotiated format.
pub fn writer_for(format: RdfFormat) -> Box<dyn RdfWriter + Send> {
    match format {
        RdfFormat::Turtle | RdfFormat::N3Text | RdfFormat::N3Application | RdfFormat::N3Legacy => {
            Box::new(TurtleWriter::new())
        }
        RdfFormat::TriG => Box::new(TurtleWriter::graph_block()),
        RdfFormat::RdfXml => Box::new(RdfXmlWriter::new()),
        RdfFormat::RdfJson => Box::new(RdfJsonWriter::new()),
        // default graph only, so N-Quads lines are N-Triples lines
        RdfFormat::NTriples | RdfFormat::NQuads => Box::new(NTriplesWriter),
    }
}

/// Serialize a whole graph in one go.
pub fn serialize<'a, I>(format: RdfFormat, triples: I) -> Result<Vec<u8>, WriteError>
where
    I: IntoIterator<Item = &'a Triple>,
{
    let mut writer = writer_for(format);
    let mut out = Vec::new();
    writer.start(&mut out)?;
    for triple in triples {
        writer.write(triple, &mut out)?;
    }
    writer.finish(&mut out)?;
    Ok(out)
}

/// Split an IRI into namespace and local name at the last `#` or `/`.
///
/// The local name must be usable as a Turtle prefixed-name local part and
/// an XML element name.
pub(crate) fn split_iri(iri: &str) -> Option<(&str, &str)> {
    let idx = iri.rfind(|c| c == '#' || c == '/')?;
    let (ns, local) = iri.split_at(idx + 1);
    let mut chars = local.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        Some((ns, local))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::POSSIBLE_RDF_VARIANTS;
    use crate::rdf::vocab::{RDF_TYPE, REPO_OBJECT};
    use crate::rdf::Term;

    fn sample() -> Vec<Triple> {
        vec![
            Triple::new(Term::iri("http://h/rest/a"), RDF_TYPE, Term::iri(REPO_OBJECT)),
            Triple::new(
                Term::iri("http://h/rest/a"),
                "http://purl.org/dc/terms/title",
                Term::string("A \"quoted\" title"),
            ),
        ]
    }

    #[test]
    fn test_split_iri() {
        assert_eq!(
            split_iri("http://purl.org/dc/terms/title"),
            Some(("http://purl.org/dc/terms/", "title"))
        );
        assert_eq!(split_iri("http://x/1abc"), None);
        assert_eq!(split_iri("http://x/"), None);
    }

    #[test]
    fn test_no_format_drops_triples() {
        let triples = vec![Triple::new(
            Term::iri("http://h/a"),
            "http://example.org/terms/has.dot",
            Term::string("kept"),
        )];
        for &format in POSSIBLE_RDF_VARIANTS {
            let text = String::from_utf8(serialize(format, &triples).unwrap()).unwrap();
            assert!(text.contains("kept"), "{format} output: {text}");
        }
    }

    #[test]
    fn test_every_format_produces_output() {
        let triples = sample();
        for &format in POSSIBLE_RDF_VARIANTS {
            let out = serialize(format, &triples).unwrap();
            let text = String::from_utf8(out).unwrap();
            assert!(text.contains("http://h/rest/a"), "{format} output: {text}");
        }
    }
}
