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

//! Identifier minting for unnamed children.
//!
//! Tokens are random 128-bit UUIDs. A pairtree identifier slices the token's
//! string form into `count` prefix segments of `length` characters each,
//! followed by the full token:
//!
//! ```text
//! mint_pairtree(2, 4)  =>  "a1/b2/c3/d4/a1b2c3d4-...."
//! ```
//!
//! Minting holds no shared state; uniqueness rests on the random source.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Minting errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MintError {
    /// `length * count` exceeds the token length. This is a configuration
    /// error, not bad client input.
    #[error("Pairtree of {count} segments x {length} chars exceeds token length {available}")]
    OutOfRange {
        length: usize,
        count: usize,
        available: usize,
    },
}

/// String form of the minted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenForm {
    /// Canonical dashed form, 36 characters.
    #[default]
    Hyphenated,
    /// Dash-free lowercase hex, 32 characters.
    Simple,
}

impl TokenForm {
    /// Length of a token in this form.
    pub const fn len(self) -> usize {
        match self {
            TokenForm::Hyphenated => 36,
            TokenForm::Simple => 32,
        }
    }

    fn render(self, uuid: Uuid) -> String {
        match self {
            TokenForm::Hyphenated => uuid.hyphenated().to_string(),
            TokenForm::Simple => uuid.simple().to_string(),
        }
    }
}

impl std::str::FromStr for TokenForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hyphenated" => Ok(TokenForm::Hyphenated),
            "simple" => Ok(TokenForm::Simple),
            other => Err(format!("unknown token form: {}", other)),
        }
    }
}

/// Pairtree shape used when minting children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairtreeShape {
    /// Characters per prefix segment
    pub length: usize,
    /// Number of prefix segments; 0 mints flat identifiers
    pub count: usize,
}

impl Default for PairtreeShape {
    fn default() -> Self {
        Self {
            length: 2,
            count: 4,
        }
    }
}

/// Identifier minter. Stateless apart from its configured token form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentifierMinter {
    form: TokenForm,
}

impl IdentifierMinter {
    pub fn new(form: TokenForm) -> Self {
        Self { form }
    }

    pub fn token_form(&self) -> TokenForm {
        self.form
    }

    /// Mint a flat identifier.
    pub fn mint(&self) -> String {
        self.form.render(Uuid::new_v4())
    }

    /// Mint a pairtree identifier; `count == 0` yields a flat identifier.
    pub fn mint_pairtree(&self, length: usize, count: usize) -> Result<String, MintError> {
        pairtree_from_token(&self.mint(), length, count)
    }

    /// Mint using a configured shape.
    pub fn mint_shaped(&self, shape: PairtreeShape) -> Result<String, MintError> {
        self.mint_pairtree(shape.length, shape.count)
    }

    /// Check a shape against the token length without minting.
    pub fn check_shape(&self, shape: PairtreeShape) -> Result<(), MintError> {
        check_range(shape.length, shape.count, self.form.len())
    }
}

/// Build a pairtree identifier from an existing token.
pub fn pairtree_from_token(token: &str, length: usize, count: usize) -> Result<String, MintError> {
    if count == 0 {
        return Ok(token.to_string());
    }
    check_range(length, count, token.len())?;

    let mut id = String::with_capacity(count * (length + 1) + token.len());
    for i in 0..count {
        id.push_str(&token[i * length..(i + 1) * length]);
        id.push('/');
    }
    id.push_str(token);
    Ok(id)
}

fn check_range(length: usize, count: usize, available: usize) -> Result<(), MintError> {
    let needed = length.checked_mul(count);
    match needed {
        Some(needed) if needed <= available => Ok(()),
        _ => Err(MintError::OutOfRange {
            length,
            count,
            available,
        }),
    }
}
