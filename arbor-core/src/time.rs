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

//! Timestamps. Stored as microseconds since the Unix epoch, rendered as
//! `xsd:dateTime` literals.

use crate::rdf::vocab::XSD_DATE_TIME;
use crate::rdf::Term;
use chrono::{DateTime, SecondsFormat, Utc};

/// Microseconds since the Unix epoch.
pub fn current_timestamp_us() -> u64 {
    Utc::now().timestamp_micros().max(0) as u64
}

/// RFC 3339 rendering with millisecond precision.
pub fn format_timestamp(us: u64) -> String {
    let dt = DateTime::<Utc>::from_timestamp_micros(us as i64).unwrap_or_default();
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn datetime_literal(us: u64) -> Term {
    Term::typed(format_timestamp(us), XSD_DATE_TIME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00.000Z");
        assert_eq!(format_timestamp(1_500_000), "1970-01-01T00:00:01.500Z");
        assert!(current_timestamp_us() > 1_600_000_000_000_000);
    }
}
