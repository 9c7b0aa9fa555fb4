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

//! Content negotiation over RDF serializations.
//!
//! Standard quality-value negotiation: each offered type takes the `q` of
//! the most specific client range that matches it (`type/subtype` beats
//! `type/*` beats `*/*`). The highest non-zero quality wins and ties go to
//! the earlier offer.

use crate::media::RdfFormat;
use thiserror::Error;

/// Negotiation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NegotiationError {
    #[error("No acceptable representation for: {0}")]
    NotAcceptable(String),
}

/// One parsed range from an `Accept` header.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRange {
    pub main: String,
    pub sub: String,
    pub quality: f32,
}

impl MediaRange {
    fn specificity(&self) -> u8 {
        match (self.main.as_str(), self.sub.as_str()) {
            ("*", "*") => 1,
            (_, "*") => 2,
            _ => 3,
        }
    }

    fn matches(&self, media_type: &str) -> bool {
        let (main, sub) = media_type.split_once('/').unwrap_or((media_type, ""));
        (self.main == "*" || self.main.eq_ignore_ascii_case(main))
            && (self.sub == "*" || self.sub.eq_ignore_ascii_case(sub))
    }
}

/// Parse an `Accept` header. Malformed ranges are skipped.
pub fn parse_accept(header: &str) -> Vec<MediaRange> {
    header
        .split(',')
        .filter_map(|part| {
            let mut params = part.split(';');
            let essence = params.next()?.trim();
            let (main, sub) = essence.split_once('/')?;
            if main.is_empty() || sub.is_empty() || (main == "*" && sub != "*") {
                return None;
            }

            let mut quality = 1.0f32;
            for param in params {
                if let Some((key, value)) = param.split_once('=') {
                    if key.trim().eq_ignore_ascii_case("q") {
                        quality = value.trim().parse().ok().filter(|q| (0.0..=1.0).contains(q))?;
                    }
                }
            }

            Some(MediaRange {
                main: main.to_ascii_lowercase(),
                sub: sub.to_ascii_lowercase(),
                quality,
            })
        })
        .collect()
}

/// Quality the client assigns to `format`, if any range matches.
fn quality_of(ranges: &[MediaRange], format: RdfFormat) -> Option<f32> {
    ranges
        .iter()
        .filter(|r| r.matches(format.media_type()))
        .max_by_key(|r| r.specificity())
        .map(|r| r.quality)
}

/// Select the response format for `offered` given the client's `Accept`.
///
/// A missing or empty header accepts anything, so the first offer wins. A
/// header with no well-formed range is treated the same way.
pub fn select(offered: &[RdfFormat], accept: Option<&str>) -> Result<RdfFormat, NegotiationError> {
    let header = accept.map(str::trim).unwrap_or("");
    let first = offered
        .first()
        .copied()
        .ok_or_else(|| NegotiationError::NotAcceptable(header.to_string()))?;
    if header.is_empty() {
        return Ok(first);
    }

    let ranges = parse_accept(header);
    if ranges.is_empty() {
        return Ok(first);
    }
    let mut best: Option<(RdfFormat, f32)> = None;
    for &format in offered {
        if let Some(q) = quality_of(&ranges, format) {
            // strict comparison keeps the earlier offer on ties
            if q > 0.0 && best.map_or(true, |(_, bq)| q > bq) {
                best = Some((format, q));
            }
        }
    }

    best.map(|(format, _)| format)
        .ok_or_else(|| NegotiationError::NotAcceptable(header.to_string()))
}
