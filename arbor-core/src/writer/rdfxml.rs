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

use super::{RdfWriter, WriteError};
use crate::rdf::vocab::RDF_NS;
use crate::rdf::{Term, Triple};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

/// RDF/XML writer.
///
/// Each subject run becomes one `rdf:Description`; predicate namespaces are
/// declared inline on the property element.
#[derive(Debug, Default)]
pub struct RdfXmlWriter {
    current_subject: Option<Term>,
}

impl RdfXmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn close_description(&mut self, out: &mut Vec<u8>) -> Result<(), WriteError> {
        if self.current_subject.take().is_some() {
            emit(out, "  ", [Event::End(BytesEnd::new("rdf:Description"))])?;
        }
        Ok(())
    }
}

impl RdfWriter for RdfXmlWriter {
    fn start(&mut self, out: &mut Vec<u8>) -> Result<(), WriteError> {
        let mut root = BytesStart::new("rdf:RDF");
        root.push_attribute(("xmlns:rdf", RDF_NS));
        emit(out, "", [Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None))])?;
        emit(out, "", [Event::Start(root)])
    }

    fn write(&mut self, triple: &Triple, out: &mut Vec<u8>) -> Result<(), WriteError> {
        let (ns, local) = element_name_split(&triple.predicate)
            .ok_or_else(|| WriteError::NoElementName(triple.predicate.clone()))?;

        if self.current_subject.as_ref() != Some(&triple.subject) {
            self.close_description(out)?;
            let mut description = BytesStart::new("rdf:Description");
            match &triple.subject {
                Term::BlankNode(label) => description.push_attribute(("rdf:nodeID", label.as_str())),
                other => description.push_attribute(("rdf:about", other.as_iri().unwrap_or_default())),
            }
            emit(out, "  ", [Event::Start(description)])?;
            self.current_subject = Some(triple.subject.clone());
        }

        let name = format!("p:{local}");
        let mut property = BytesStart::new(name.as_str());
        property.push_attribute(("xmlns:p", ns));
        match &triple.object {
            Term::Iri(iri) => {
                property.push_attribute(("rdf:resource", iri.as_str()));
                emit(out, "    ", [Event::Empty(property)])
            }
            Term::BlankNode(label) => {
                property.push_attribute(("rdf:nodeID", label.as_str()));
                emit(out, "    ", [Event::Empty(property)])
            }
            Term::Literal(lit) => {
                match (&lit.language, &lit.datatype) {
                    (Some(lang), _) => property.push_attribute(("xml:lang", lang.as_str())),
                    (None, Some(dt)) => property.push_attribute(("rdf:datatype", dt.as_str())),
                    (None, None) => {}
                }
                emit(
                    out,
                    "    ",
                    [
                        Event::Start(property),
                        Event::Text(BytesText::new(&lit.value)),
                        Event::End(BytesEnd::new(name.as_str())),
                    ],
                )
            }
        }
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), WriteError> {
        self.close_description(out)?;
        emit(out, "", [Event::End(BytesEnd::new("rdf:RDF"))])
    }
}

/// Write one line of events at the given indent.
fn emit<'a, const N: usize>(
    out: &mut Vec<u8>,
    indent: &str,
    events: [Event<'a>; N],
) -> Result<(), WriteError> {
    out.extend_from_slice(indent.as_bytes());
    {
        let mut writer = Writer::new(&mut *out);
        for event in events {
            writer
                .write_event(event)
                .map_err(|e| WriteError::Xml(e.to_string()))?;
        }
    }
    out.push(b'\n');
    Ok(())
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

/// Split a predicate IRI into a namespace and an XML element local name.
///
/// The local name is the longest tail of name characters that starts with a
/// letter or underscore. Returns `None` when no such tail exists.
fn element_name_split(iri: &str) -> Option<(&str, &str)> {
    let tail_start = iri
        .char_indices()
        .rev()
        .take_while(|&(_, c)| is_name_char(c))
        .last()
        .map(|(i, _)| i)?;
    let offset = iri[tail_start..].find(is_name_start)?;
    let (ns, local) = iri.split_at(tail_start + offset);
    if ns.is_empty() {
        return None;
    }
    Some((ns, local))
}
