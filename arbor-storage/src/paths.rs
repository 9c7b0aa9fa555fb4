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

//! Subtree copy and move.

use crate::error::StoreError;
use crate::session::Session;
use arbor_core::{GraphSubjects, RepoPath};
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Subtree operation errors
#[derive(Debug, Error)]
pub enum PathOperationError {
    /// The destination lies outside this repository
    #[error("Destination is not in this repository: {0}")]
    ForeignDestination(String),

    #[error("Source does not exist: {0}")]
    SourceMissing(RepoPath),

    #[error("Destination already exists: {0}")]
    DestinationOccupied(RepoPath),

    #[error("Invalid destination '{destination}': {reason}")]
    InvalidDestination { destination: String, reason: String },

    #[error("Conflicting change to {0}")]
    Conflict(RepoPath),

    #[error("Repository failure: {0}")]
    Repository(StoreError),
}

/// Which subtree operation to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtreeOperation {
    Copy,
    Move,
}

impl fmt::Display for SubtreeOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubtreeOperation::Copy => write!(f, "copy"),
            SubtreeOperation::Move => write!(f, "move"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathOperationCoordinator {
    subjects: GraphSubjects,
}

impl PathOperationCoordinator {
    pub fn new(subjects: GraphSubjects) -> Self {
        Self { subjects }
    }

    pub fn copy(
        &self,
        session: Session,
        source: &RepoPath,
        destination_uri: &str,
    ) -> Result<RepoPath, PathOperationError> {
        self.run(SubtreeOperation::Copy, session, source, destination_uri)
    }

    pub fn move_subtree(
        &self,
        session: Session,
        source: &RepoPath,
        destination_uri: &str,
    ) -> Result<RepoPath, PathOperationError> {
        self.run(SubtreeOperation::Move, session, source, destination_uri)
    }

    /// Copy or move `source` to the path named by `destination_uri` and
    /// commit. Nothing is staged unless every check passes.
    pub fn run(
        &self,
        operation: SubtreeOperation,
        mut session: Session,
        source: &RepoPath,
        destination_uri: &str,
    ) -> Result<RepoPath, PathOperationError> {
        let destination = self
            .subjects
            .path_for(destination_uri)
            .map_err(|e| PathOperationError::InvalidDestination {
                destination: destination_uri.to_string(),
                reason: e.to_string(),
            })?
            .ok_or_else(|| PathOperationError::ForeignDestination(destination_uri.to_string()))?;

        if !session.exists(source) {
            return Err(PathOperationError::SourceMissing(source.clone()));
        }

        let staged = match operation {
            SubtreeOperation::Copy => session.copy(source, &destination),
            SubtreeOperation::Move => session.move_to(source, &destination),
        };
        staged.map_err(|e| match e {
            StoreError::PathNotFound(p) => PathOperationError::SourceMissing(p),
            StoreError::ItemExists(p) => PathOperationError::DestinationOccupied(p),
            StoreError::InvalidDestination { destination, .. } => {
                PathOperationError::InvalidDestination {
                    destination: destination.to_string(),
                    reason: "destination lies inside the source".to_string(),
                }
            }
            StoreError::NotAContainer(p) => PathOperationError::InvalidDestination {
                destination: destination_uri.to_string(),
                reason: format!("{} cannot have children", p),
            },
            StoreError::RootImmutable => PathOperationError::InvalidDestination {
                destination: destination_uri.to_string(),
                reason: "the root cannot be moved".to_string(),
            },
            other => PathOperationError::Repository(other),
        })?;

        session.commit().map_err(|e| match e {
            StoreError::ConcurrentModification(p) => PathOperationError::Conflict(p),
            other => PathOperationError::Repository(other),
        })?;
        info!(
            operation = %operation,
            source = %source,
            destination = %destination,
            "Subtree operation committed"
        );
        Ok(destination)
    }
}
