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

//! RDF serialization media types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// RDF serializations offered to clients.
///
/// The three N3 variants share one syntax but are negotiated as distinct
/// media types so the response echoes the spelling the client asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RdfFormat {
    Turtle,
    RdfXml,
    NTriples,
    RdfJson,
    N3Text,
    N3Application,
    N3Legacy,
    TriG,
    NQuads,
}

/// Offered formats in server-preferred order.
pub const POSSIBLE_RDF_VARIANTS: &[RdfFormat] = &[
    RdfFormat::Turtle,
    RdfFormat::RdfXml,
    RdfFormat::NTriples,
    RdfFormat::RdfJson,
    RdfFormat::N3Text,
    RdfFormat::N3Application,
    RdfFormat::N3Legacy,
    RdfFormat::TriG,
    RdfFormat::NQuads,
];

impl RdfFormat {
    /// Media type, without parameters
    pub const fn media_type(self) -> &'static str {
        match self {
            RdfFormat::Turtle => "text/turtle",
            RdfFormat::RdfXml => "application/rdf+xml",
            RdfFormat::NTriples => "application/n-triples",
            RdfFormat::RdfJson => "application/rdf+json",
            RdfFormat::N3Text => "text/rdf+n3",
            RdfFormat::N3Application => "application/rdf+n3",
            RdfFormat::N3Legacy => "text/n3",
            RdfFormat::TriG => "application/trig",
            RdfFormat::NQuads => "application/n-quads",
        }
    }

    /// `Content-Type` header value for responses.
    pub fn content_type(self) -> String {
        format!("{};charset=utf-8", self.media_type())
    }

    /// Look up a format by media type; parameters and case are ignored.
    pub fn from_media_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or("").trim();
        POSSIBLE_RDF_VARIANTS
            .iter()
            .copied()
            .find(|f| f.media_type().eq_ignore_ascii_case(essence))
    }
}

impl fmt::Display for RdfFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.media_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_media_type() {
        assert_eq!(
            RdfFormat::from_media_type("Text/Turtle; charset=utf-8"),
            Some(RdfFormat::Turtle)
        );
        assert_eq!(RdfFormat::from_media_type("text/n3"), Some(RdfFormat::N3Legacy));
        assert_eq!(RdfFormat::from_media_type("text/plain"), None);
    }

    #[test]
    fn test_offer_order() {
        assert_eq!(POSSIBLE_RDF_VARIANTS.len(), 9);
        assert_eq!(POSSIBLE_RDF_VARIANTS[0], RdfFormat::Turtle);
        assert_eq!(POSSIBLE_RDF_VARIANTS[8], RdfFormat::NQuads);
    }
}
