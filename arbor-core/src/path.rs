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

//! Repository paths.
//!
//! A `RepoPath` is an absolute, slash-delimited sequence of segments. The
//! root is `/`. Segments are never empty, `.` or `..`, and may not start
//! with the reserved `arb:` prefix (used for sub-resources such as
//! `arb:versions`).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Prefix reserved for server-defined sub-resources.
pub const RESERVED_PREFIX: &str = "arb:";

/// Path errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Path must be absolute: {0}")]
    NotAbsolute(String),

    #[error("Invalid path segment '{segment}' in {path}")]
    InvalidSegment { path: String, segment: String },

    #[error("Reserved path segment '{0}'")]
    ReservedSegment(String),
}

/// Absolute hierarchical repository path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepoPath {
    segments: Vec<String>,
}

impl RepoPath {
    /// The root path `/`.
    pub fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse an absolute path. A trailing slash is tolerated.
    pub fn parse(path: &str) -> Result<Self, PathError> {
        let rest = path
            .strip_prefix('/')
            .ok_or_else(|| PathError::NotAbsolute(path.to_string()))?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        if rest.is_empty() {
            return Ok(Self::root());
        }

        let mut segments = Vec::new();
        for segment in rest.split('/') {
            validate_segment(path, segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Build a path from already-split segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut path = Self::root();
        for segment in segments {
            path = path.child(&segment.into())?;
        }
        Ok(path)
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments (root is 0).
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Last segment, `None` for the root.
    pub fn file_name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// Parent path, `None` for the root.
    pub fn parent(&self) -> Option<RepoPath> {
        if self.is_root() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Append a single segment.
    pub fn child(&self, segment: &str) -> Result<RepoPath, PathError> {
        validate_segment(&self.to_string(), segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Ok(Self { segments })
    }

    /// Append a relative, possibly multi-segment path such as a minted
    /// pairtree identifier (`ab/cd/abcd...`).
    pub fn join(&self, relative: &str) -> Result<RepoPath, PathError> {
        let mut path = self.clone();
        for segment in relative.trim_matches('/').split('/') {
            path = path.child(segment)?;
        }
        Ok(path)
    }

    /// True when `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &RepoPath) -> bool {
        other.segments.len() > self.segments.len() && other.segments.starts_with(&self.segments)
    }

    /// True when `other` equals `self` or lies beneath it.
    pub fn contains(&self, other: &RepoPath) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// Re-root `self` from under `from` onto `to`.
    ///
    /// Returns `None` when `self` is not within `from`.
    pub fn rebase(&self, from: &RepoPath, to: &RepoPath) -> Option<RepoPath> {
        if !from.contains(self) {
            return None;
        }
        let mut segments = to.segments.clone();
        segments.extend_from_slice(&self.segments[from.segments.len()..]);
        Some(Self { segments })
    }

    /// All strict ancestors, root first.
    pub fn ancestors(&self) -> Vec<RepoPath> {
        (0..self.segments.len())
            .map(|len| Self {
                segments: self.segments[..len].to_vec(),
            })
            .collect()
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for RepoPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn validate_segment(path: &str, segment: &str) -> Result<(), PathError> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains('/') {
        return Err(PathError::InvalidSegment {
            path: path.to_string(),
            segment: segment.to_string(),
        });
    }
    if segment.starts_with(RESERVED_PREFIX) {
        return Err(PathError::ReservedSegment(segment.to_string()));
    }
    Ok(())
}
