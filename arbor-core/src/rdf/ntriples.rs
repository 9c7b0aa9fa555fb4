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

//! N-Triples reader for request bodies.
//!
//! Line-oriented: one statement per line, `#` comments and blank lines are
//! skipped. Relative IRIs (including the empty IRI `<>`) resolve against the
//! supplied base, which lets clients refer to the target resource without
//! knowing its absolute URI.

use super::term::{Literal, Term, Triple};
use thiserror::Error;
use url::Url;

/// Parse errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("invalid base IRI: {0}")]
    InvalidBase(String),
}

/// Parse an N-Triples document.
pub fn parse_ntriples(input: &str, base: &str) -> Result<Vec<Triple>, ParseError> {
    let base = Url::parse(base).map_err(|_| ParseError::InvalidBase(base.to_string()))?;
    let mut triples = Vec::new();

    for (idx, raw) in input.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut reader = LineReader {
            chars: line.chars().collect(),
            pos: 0,
            line: idx + 1,
            base: &base,
        };
        triples.push(reader.statement()?);
    }

    Ok(triples)
}

struct LineReader<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    base: &'a Url,
}

impl LineReader<'_> {
    fn statement(&mut self) -> Result<Triple, ParseError> {
        let subject = self.term()?;
        if subject.is_literal() {
            return Err(self.error("subject may not be a literal"));
        }
        self.skip_ws();
        let predicate = match self.term()? {
            Term::Iri(iri) => iri,
            _ => return Err(self.error("predicate must be an IRI")),
        };
        self.skip_ws();
        let object = self.term()?;
        self.skip_ws();
        self.expect('.')?;
        self.skip_ws();
        match self.peek() {
            None | Some('#') => Ok(Triple::new(subject, predicate, object)),
            Some(c) => Err(self.error(&format!("unexpected '{}' after statement", c))),
        }
    }

    fn term(&mut self) -> Result<Term, ParseError> {
        self.skip_ws();
        match self.peek() {
            Some('<') => Ok(Term::Iri(self.iri()?)),
            Some('_') => self.blank(),
            Some('"') => self.literal(),
            Some(c) => Err(self.error(&format!("unexpected '{}'", c))),
            None => Err(self.error("unexpected end of line")),
        }
    }

    fn iri(&mut self) -> Result<String, ParseError> {
        self.expect('<')?;
        let mut raw = String::new();
        loop {
            match self.next() {
                Some('>') => break,
                Some('\\') => raw.push(self.unicode_escape()?),
                Some(c) if c.is_whitespace() => return Err(self.error("whitespace in IRI")),
                Some(c) => raw.push(c),
                None => return Err(self.error("unterminated IRI")),
            }
        }
        self.resolve(&raw)
    }

    fn resolve(&self, raw: &str) -> Result<String, ParseError> {
        if Url::parse(raw).is_ok() {
            return Ok(raw.to_string());
        }
        self.base
            .join(raw)
            .map(|url| url.to_string())
            .map_err(|_| self.error(&format!("cannot resolve IRI <{}>", raw)))
    }

    fn blank(&mut self) -> Result<Term, ParseError> {
        self.expect('_')?;
        self.expect(':')?;
        let mut label = String::new();
        while let Some(c) = self.peek() {
            let continues = c.is_alphanumeric()
                || c == '_'
                || c == '-'
                || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_alphanumeric()));
            if !continues {
                break;
            }
            label.push(c);
            self.pos += 1;
        }
        if label.is_empty() {
            return Err(self.error("empty blank node label"));
        }
        Ok(Term::BlankNode(label))
    }

    fn literal(&mut self) -> Result<Term, ParseError> {
        self.expect('"')?;
        let mut value = String::new();
        loop {
            match self.next() {
                Some('"') => break,
                Some('\\') => match self.next() {
                    Some('t') => value.push('\t'),
                    Some('b') => value.push('\u{8}'),
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('f') => value.push('\u{c}'),
                    Some('"') => value.push('"'),
                    Some('\'') => value.push('\''),
                    Some('\\') => value.push('\\'),
                    Some('u') | Some('U') => {
                        self.pos -= 1;
                        value.push(self.unicode_escape()?);
                    }
                    _ => return Err(self.error("invalid escape in literal")),
                },
                Some(c) => value.push(c),
                None => return Err(self.error("unterminated literal")),
            }
        }

        match self.peek() {
            Some('@') => {
                self.pos += 1;
                let mut lang = String::new();
                while let Some(c) = self.peek() {
                    if !(c.is_ascii_alphanumeric() || c == '-') {
                        break;
                    }
                    lang.push(c);
                    self.pos += 1;
                }
                if lang.is_empty() {
                    return Err(self.error("empty language tag"));
                }
                Ok(Term::Literal(Literal::lang(value, lang)))
            }
            Some('^') => {
                self.expect('^')?;
                self.expect('^')?;
                let datatype = self.iri()?;
                Ok(Term::Literal(Literal::typed(value, datatype)))
            }
            _ => Ok(Term::Literal(Literal::string(value))),
        }
    }

    /// Reads `uXXXX` or `UXXXXXXXX`; the backslash is already consumed.
    fn unicode_escape(&mut self) -> Result<char, ParseError> {
        let width = match self.next() {
            Some('u') => 4,
            Some('U') => 8,
            _ => return Err(self.error("invalid escape")),
        };
        if self.pos + width > self.chars.len() {
            return Err(self.error("truncated unicode escape"));
        }
        let hex: String = self.chars[self.pos..self.pos + width].iter().collect();
        self.pos += width;
        u32::from_str_radix(&hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| self.error(&format!("invalid code point \\u{}", hex)))
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        match self.next() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(self.error(&format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(&format!("expected '{}'", expected))),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError::Syntax {
            line: self.line,
            message: message.to_string(),
        }
    }
}
