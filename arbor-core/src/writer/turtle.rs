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

use super::{split_iri, RdfWriter, WriteError};
use crate::rdf::vocab::{PREFIXES, RDF_TYPE};
use crate::rdf::{escape_iri, escape_literal, Term, Triple};

/// Turtle writer, also used for the N3 variants and TriG.
///
/// Consecutive triples sharing a subject are grouped with `;`. Input is not
/// sorted, so a subject that reappears later opens a new block.
#[derive(Debug, Default)]
pub struct TurtleWriter {
    current_subject: Option<Term>,
    graph_block: bool,
}

impl TurtleWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// TriG: wrap the statements in a default-graph block.
    pub fn graph_block() -> Self {
        Self {
            current_subject: None,
            graph_block: true,
        }
    }

    fn indent(&self) -> &'static str {
        if self.graph_block {
            "  "
        } else {
            ""
        }
    }

    fn close_subject(&mut self, out: &mut Vec<u8>) {
        if self.current_subject.take().is_some() {
            out.extend_from_slice(b" .\n");
        }
    }
}

impl RdfWriter for TurtleWriter {
    fn start(&mut self, out: &mut Vec<u8>) -> Result<(), WriteError> {
        for (prefix, ns) in PREFIXES {
            out.extend_from_slice(format!("@prefix {}: <{}> .\n", prefix, ns).as_bytes());
        }
        out.push(b'\n');
        if self.graph_block {
            out.extend_from_slice(b"{\n");
        }
        Ok(())
    }

    fn write(&mut self, triple: &Triple, out: &mut Vec<u8>) -> Result<(), WriteError> {
        let predicate = if triple.predicate == RDF_TYPE {
            "a".to_string()
        } else {
            iri_ref(&triple.predicate)
        };
        let object = term(&triple.object);

        if self.current_subject.as_ref() == Some(&triple.subject) {
            out.extend_from_slice(
                format!(" ;\n{}    {} {}", self.indent(), predicate, object).as_bytes(),
            );
            return Ok(());
        }

        self.close_subject(out);
        out.extend_from_slice(
            format!(
                "{}{} {} {}",
                self.indent(),
                term(&triple.subject),
                predicate,
                object
            )
            .as_bytes(),
        );
        self.current_subject = Some(triple.subject.clone());
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), WriteError> {
        self.close_subject(out);
        if self.graph_block {
            out.extend_from_slice(b"}\n");
        }
        Ok(())
    }
}

fn iri_ref(iri: &str) -> String {
    if let Some((ns, local)) = split_iri(iri) {
        if let Some((prefix, _)) = PREFIXES.iter().find(|(_, p)| *p == ns) {
            return format!("{}:{}", prefix, local);
        }
    }
    format!("<{}>", escape_iri(iri))
}

fn term(term: &Term) -> String {
    match term {
        Term::Iri(iri) => iri_ref(iri),
        Term::BlankNode(label) => format!("_:{}", label),
        Term::Literal(lit) => {
            let quoted = format!("\"{}\"", escape_literal(&lit.value));
            match (&lit.language, &lit.datatype) {
                (Some(lang), _) => format!("{}@{}", quoted, lang),
                (None, Some(dt)) => format!("{}^^{}", quoted, iri_ref(dt)),
                (None, None) => quoted,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::vocab::{REPO_CREATED, REPO_OBJECT, XSD_DATE_TIME};

    fn render(mut writer: TurtleWriter, triples: &[Triple]) -> String {
        let mut out = Vec::new();
        writer.start(&mut out).unwrap();
        for t in triples {
            writer.write(t, &mut out).unwrap();
        }
        writer.finish(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_groups_by_subject() {
        let s = Term::iri("http://h/rest/a");
        let triples = vec![
            Triple::new(s.clone(), RDF_TYPE, Term::iri(REPO_OBJECT)),
            Triple::new(
                s.clone(),
                REPO_CREATED,
                Term::typed("2025-01-01T00:00:00Z", XSD_DATE_TIME),
            ),
            Triple::new(Term::iri("http://h/rest/b"), "http://x/p", Term::string("v")),
        ];
        let text = render(TurtleWriter::new(), &triples);
        assert!(text.starts_with("@prefix rdf:"));
        assert!(text.contains("<http://h/rest/a> a repo:Object ;\n    repo:created \"2025-01-01T00:00:00Z\"^^xsd:dateTime .\n"));
        assert!(text.contains("<http://h/rest/b> <http://x/p> \"v\" .\n"));
    }

    #[test]
    fn test_trig_block() {
        let triples = vec![Triple::new(Term::iri("http://h/a"), "http://x/p", Term::string("v"))];
        let text = render(TurtleWriter::graph_block(), &triples);
        assert!(text.contains("{\n  <http://h/a> <http://x/p> \"v\" .\n}\n"));
    }

    #[test]
    fn test_empty_graph() {
        let text = render(TurtleWriter::new(), &[]);
        assert!(text
            .lines()
            .all(|line| line.is_empty() || line.starts_with("@prefix")));
    }
}
