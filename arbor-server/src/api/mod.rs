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

//! HTTP API: shared state, error mapping and request targets.

pub mod health;
pub mod resources;
pub mod streaming;
pub mod versions;

pub use health::health_check;
pub use resources::dispatch;

use crate::config::ServerConfig;
use arbor_core::{
    select, NegotiationError, ParseError, PathError, RdfFormat, RepoPath, POSSIBLE_RDF_VARIANTS,
    VERSIONS_SEGMENT,
};
use arbor_storage::{
    NodeError, NodeService, PathOperationCoordinator, PathOperationError, Repository,
    VersionError, VersionManager,
};
use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("Bad gateway: {0}")]
    BadGateway(String),

    #[error("Not acceptable: {0}")]
    NotAcceptable(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::PreconditionFailed(msg) => (StatusCode::PRECONDITION_FAILED, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::NotAcceptable(msg) => (StatusCode::NOT_ACCEPTABLE, msg),
            ApiError::UnsupportedMediaType(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg),
            ApiError::MethodNotAllowed(msg) => (StatusCode::METHOD_NOT_ALLOWED, msg),
            ApiError::Internal(msg) => {
                tracing::error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<NodeError> for ApiError {
    fn from(e: NodeError) -> Self {
        match e {
            NodeError::NotFound(_) => ApiError::NotFound(e.to_string()),
            NodeError::AlreadyExists(_) | NodeError::Conflict(_) => ApiError::Conflict(e.to_string()),
            NodeError::InvalidPath(_) | NodeError::BadRequest(_) => ApiError::BadRequest(e.to_string()),
            NodeError::Mint(_) | NodeError::Repository(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<VersionError> for ApiError {
    fn from(e: VersionError) -> Self {
        match e {
            VersionError::NotFound(_) | VersionError::LabelNotFound { .. } => {
                ApiError::NotFound(e.to_string())
            }
            VersionError::InvalidLabel(_) => ApiError::BadRequest(e.to_string()),
            VersionError::LabelConflict { .. } | VersionError::Conflict(_) => {
                ApiError::Conflict(e.to_string())
            }
            VersionError::Repository(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<PathOperationError> for ApiError {
    fn from(e: PathOperationError) -> Self {
        match e {
            PathOperationError::ForeignDestination(_) => ApiError::BadGateway(e.to_string()),
            PathOperationError::SourceMissing(_) | PathOperationError::Conflict(_) => {
                ApiError::Conflict(e.to_string())
            }
            PathOperationError::DestinationOccupied(_) => ApiError::PreconditionFailed(e.to_string()),
            PathOperationError::InvalidDestination { .. } => ApiError::BadRequest(e.to_string()),
            PathOperationError::Repository(_) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<NegotiationError> for ApiError {
    fn from(e: NegotiationError) -> Self {
        ApiError::NotAcceptable(e.to_string())
    }
}

impl From<PathError> for ApiError {
    fn from(e: PathError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<ParseError> for ApiError {
    fn from(e: ParseError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<Repository>,
    pub nodes: NodeService,
    pub versions: VersionManager,
    pub paths: PathOperationCoordinator,
    pub stream_chunk_triples: usize,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(repository: Arc<Repository>, config: &ServerConfig) -> anyhow::Result<Self> {
        let subjects = config.subjects()?;
        Ok(Self {
            repository,
            nodes: NodeService::new(subjects.clone(), config.minter(), config.pairtree_shape()),
            versions: VersionManager::new(subjects.clone()),
            paths: PathOperationCoordinator::new(subjects),
            stream_chunk_triples: config.server.stream_chunk_triples.max(1),
            started_at: Instant::now(),
        })
    }

    /// Open the configured repository and build state around it
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let repository = match config.data_file() {
            Some(file) => Repository::open(file)?,
            None => Repository::new()?,
        };
        Self::new(repository, config)
    }

    /// Path component of the base URL, with trailing slash
    pub fn base_path(&self) -> &str {
        self.nodes.subjects().base().path()
    }
}

/// Run repository work off the async runtime.
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("worker failed: {}", e)))?
}

/// Pick the response serialization from the `Accept` header.
pub(crate) fn negotiate(headers: &HeaderMap) -> Result<RdfFormat, ApiError> {
    let accept = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok());
    Ok(select(POSSIBLE_RDF_VARIANTS, accept)?)
}

/// What a request path addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Resource(RepoPath),
    /// `{path}/arb:versions`
    Versions(RepoPath),
    /// `{path}/arb:versions/{label}`
    Version { path: RepoPath, label: String },
}

/// Split a request path below `base_path` into its target
pub fn parse_target(base_path: &str, uri_path: &str) -> Result<Target, ApiError> {
    let base = base_path.trim_end_matches('/');
    let relative = uri_path.strip_prefix(base).unwrap_or(uri_path);

    let mut segments = Vec::new();
    for raw in relative.split('/').filter(|s| !s.is_empty()) {
        let decoded = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| ApiError::BadRequest(format!("invalid path segment '{}'", raw)))?;
        segments.push(decoded.into_owned());
    }

    match segments.iter().position(|s| s == VERSIONS_SEGMENT) {
        None => Ok(Target::Resource(RepoPath::from_segments(segments)?)),
        Some(idx) => {
            let rest = segments.split_off(idx + 1);
            segments.pop();
            let path = RepoPath::from_segments(segments)?;
            match rest.as_slice() {
                [] => Ok(Target::Versions(path)),
                [label] => Ok(Target::Version {
                    path,
                    label: label.clone(),
                }),
                _ => Err(ApiError::BadRequest(format!(
                    "unexpected path below {}: {}",
                    VERSIONS_SEGMENT,
                    rest.join("/")
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> RepoPath {
        RepoPath::parse(p).unwrap()
    }

    #[test]
    fn test_parse_target() {
        assert_eq!(
            parse_target("/rest/", "/rest/a/b").unwrap(),
            Target::Resource(path("/a/b"))
        );
        assert_eq!(
            parse_target("/rest/", "/rest").unwrap(),
            Target::Resource(RepoPath::root())
        );
        assert_eq!(
            parse_target("/", "/a%20b/").unwrap(),
            Target::Resource(path("/a b"))
        );
        assert_eq!(
            parse_target("/rest/", "/rest/a/arb:versions").unwrap(),
            Target::Versions(path("/a"))
        );
        assert_eq!(
            parse_target("/rest/", "/rest/a/arb:versions/v1").unwrap(),
            Target::Version {
                path: path("/a"),
                label: "v1".to_string()
            }
        );
    }

    #[test]
    fn test_parse_target_rejects() {
        assert!(matches!(
            parse_target("/rest/", "/rest/a/arb:versions/v1/x"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            parse_target("/rest/", "/rest/arb:other"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            parse_target("/rest/", "/rest/a/.."),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn test_error_statuses() {
        let cases = [
            (ApiError::from(PathOperationError::ForeignDestination("x".into())), StatusCode::BAD_GATEWAY),
            (
                ApiError::from(PathOperationError::SourceMissing(RepoPath::root())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(PathOperationError::DestinationOccupied(RepoPath::root())),
                StatusCode::PRECONDITION_FAILED,
            ),
            (
                ApiError::from(NegotiationError::NotAcceptable("image/png".into())),
                StatusCode::NOT_ACCEPTABLE,
            ),
            (
                ApiError::from(VersionError::NotFound(RepoPath::root())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::from(VersionError::Conflict(RepoPath::root())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(NodeError::Conflict(RepoPath::root())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::from(PathOperationError::Conflict(RepoPath::root())),
                StatusCode::CONFLICT,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
