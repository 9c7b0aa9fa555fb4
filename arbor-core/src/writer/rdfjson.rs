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
use crate::rdf::{Term, Triple};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// RDF/JSON (`{ subject: { predicate: [ object, ... ] } }`).
///
/// The format nests by subject, so the graph is buffered until `finish`.
#[derive(Debug, Default)]
pub struct RdfJsonWriter {
    graph: BTreeMap<String, BTreeMap<String, Vec<Value>>>,
}

impl RdfJsonWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RdfWriter for RdfJsonWriter {
    fn start(&mut self, _out: &mut Vec<u8>) -> Result<(), WriteError> {
        Ok(())
    }

    fn write(&mut self, triple: &Triple, _out: &mut Vec<u8>) -> Result<(), WriteError> {
        let subject = match &triple.subject {
            Term::BlankNode(label) => format!("_:{}", label),
            other => other.as_iri().unwrap_or_default().to_string(),
        };
        self.graph
            .entry(subject)
            .or_default()
            .entry(triple.predicate.clone())
            .or_default()
            .push(object_value(&triple.object));
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), WriteError> {
        let graph = std::mem::take(&mut self.graph);
        let root: Map<String, Value> = graph
            .into_iter()
            .map(|(subject, predicates)| {
                let predicates: Map<String, Value> = predicates
                    .into_iter()
                    .map(|(p, objects)| (p, Value::Array(objects)))
                    .collect();
                (subject, Value::Object(predicates))
            })
            .collect();
        out.extend_from_slice(Value::Object(root).to_string().as_bytes());
        Ok(())
    }
}

fn object_value(term: &Term) -> Value {
    match term {
        Term::Iri(iri) => json!({ "type": "uri", "value": iri }),
        Term::BlankNode(label) => json!({ "type": "bnode", "value": format!("_:{}", label) }),
        Term::Literal(lit) => {
            let mut value = json!({ "type": "literal", "value": lit.value });
            if let Some(lang) = &lit.language {
                value["lang"] = json!(lang);
            } else if let Some(dt) = &lit.datatype {
                value["datatype"] = json!(dt);
            }
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::vocab::XSD_INTEGER;

    #[test]
    fn test_nested_output() {
        let s = Term::iri("http://h/a");
        let mut writer = RdfJsonWriter::new();
        let mut out = Vec::new();
        writer.start(&mut out).unwrap();
        writer.write(&Triple::new(s.clone(), "http://x/p", Term::string("one")), &mut out).unwrap();
        writer.write(&Triple::new(s.clone(), "http://x/p", Term::typed("2", XSD_INTEGER)), &mut out).unwrap();
        writer.write(&Triple::new(s, "http://x/q", Term::blank("n")), &mut out).unwrap();
        assert!(out.is_empty());
        writer.finish(&mut out).unwrap();

        let parsed: Value = serde_json::from_slice(&out).unwrap();
        let values = &parsed["http://h/a"]["http://x/p"];
        assert_eq!(values.as_array().unwrap().len(), 2);
        assert_eq!(values[0]["value"], "one");
        assert!(values[0].get("datatype").is_none());
        assert_eq!(values[1]["datatype"], XSD_INTEGER);
        assert_eq!(parsed["http://h/a"]["http://x/q"][0]["type"], "bnode");
    }
}
