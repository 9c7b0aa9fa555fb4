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
use crate::rdf::Triple;

/// N-Triples, one statement per line.
#[derive(Debug, Default)]
pub struct NTriplesWriter;

impl RdfWriter for NTriplesWriter {
    fn start(&mut self, _out: &mut Vec<u8>) -> Result<(), WriteError> {
        Ok(())
    }

    fn write(&mut self, triple: &Triple, out: &mut Vec<u8>) -> Result<(), WriteError> {
        out.extend_from_slice(triple.to_ntriples().as_bytes());
        out.push(b'\n');
        Ok(())
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<(), WriteError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::{parse_ntriples, Term};

    #[test]
    fn test_output_parses_back() {
        let triples = vec![
            Triple::new(Term::iri("http://h/a"), "http://h/p", Term::string("line\nbreak")),
            Triple::new(Term::blank("b0"), "http://h/p", Term::iri("http://h/a")),
        ];
        let mut out = Vec::new();
        let mut writer = NTriplesWriter;
        for t in &triples {
            writer.write(t, &mut out).unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert_eq!(parse_ntriples(&text, "http://h/").unwrap(), triples);
    }
}
