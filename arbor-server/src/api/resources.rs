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

//! Resource endpoints: everything that is not a version sub-resource.

use super::{blocking, negotiate, parse_target, versions, ApiError, AppState, Target};
use crate::api::streaming::{rdf_head_response, rdf_response};
use arbor_core::{parse_ntriples, GraphSubjects, RdfFormat, RepoPath};
use arbor_storage::{NodeError, NodeKind, NodeSpec, PutOutcome, SubtreeOperation};
use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tracing::debug;

const DEFAULT_BINARY_TYPE: &str = "application/octet-stream";

/// Entry point for every request below the base path.
pub async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    match parse_target(state.base_path(), uri.path())? {
        Target::Resource(path) => resource(state, method, path, headers, body).await,
        Target::Versions(path) => versions::version_list(state, method, path, headers).await,
        Target::Version { path, label } => {
            versions::version(state, method, path, label, headers).await
        }
    }
}

async fn resource(
    state: AppState,
    method: Method,
    path: RepoPath,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    match method.as_str() {
        "GET" => get_resource(state, path, &headers, false).await,
        "HEAD" => get_resource(state, path, &headers, true).await,
        "PUT" => put_resource(state, path, headers, body).await,
        "POST" => post_child(state, path, headers, body).await,
        "DELETE" => delete_resource(state, path).await,
        "COPY" => subtree_operation(state, SubtreeOperation::Copy, path, &headers).await,
        "MOVE" => subtree_operation(state, SubtreeOperation::Move, path, &headers).await,
        other => Err(ApiError::MethodNotAllowed(format!("{} on {}", other, path))),
    }
}

async fn get_resource(
    state: AppState,
    path: RepoPath,
    headers: &HeaderMap,
    head: bool,
) -> Result<Response, ApiError> {
    let session = state.repository.begin();
    let kind = session
        .get(&path)
        .map(|node| node.kind)
        .ok_or_else(|| NodeError::NotFound(path.clone()))?;

    if kind == NodeKind::Datastream {
        let content = state.nodes.content(session, &path)?;
        let mut response = if head {
            Response::new(Body::empty())
        } else {
            Response::new(Body::from(content.data))
        };
        set_header(&mut response, header::CONTENT_TYPE, &content.mime_type);
        set_header(&mut response, header::ETAG, &format!("\"{}\"", content.digest));
        return Ok(response);
    }

    let format = negotiate(headers)?;
    let stream = state.nodes.describe(session, &path)?;
    if head {
        return Ok(rdf_head_response(stream, format));
    }
    Ok(rdf_response(stream, format, state.stream_chunk_triples, move |outcome| {
        debug!(path = %path, ?outcome, "Description streamed");
    }))
}

async fn put_resource(
    state: AppState,
    path: RepoPath,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let spec = body_spec(state.nodes.subjects(), &path, &headers, body)?;
    let subjects = state.nodes.subjects().clone();
    let target = path.clone();
    let outcome = blocking(move || {
        let session = state.repository.begin();
        Ok(state.nodes.put(session, &target, spec)?)
    })
    .await?;

    Ok(match outcome {
        PutOutcome::Created => created(&subjects, &path),
        PutOutcome::Replaced => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn post_child(
    state: AppState,
    parent: RepoPath,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let slug = match headers.get("slug") {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| ApiError::BadRequest("Slug header is not ASCII".to_string()))?
                .to_string(),
        ),
        None => None,
    };

    let subjects = state.nodes.subjects().clone();
    let path = blocking(move || {
        let session = state.repository.begin();
        let child = state.nodes.child_path(&session, &parent, slug.as_deref())?;
        let spec = body_spec(state.nodes.subjects(), &child, &headers, body)?;
        Ok(state.nodes.create(session, &child, spec)?)
    })
    .await?;

    Ok(created(&subjects, &path))
}

async fn delete_resource(state: AppState, path: RepoPath) -> Result<Response, ApiError> {
    blocking(move || {
        let session = state.repository.begin();
        Ok(state.nodes.delete(session, &path)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn subtree_operation(
    state: AppState,
    operation: SubtreeOperation,
    source: RepoPath,
    headers: &HeaderMap,
) -> Result<Response, ApiError> {
    let destination = headers
        .get("destination")
        .ok_or_else(|| ApiError::BadRequest(format!("{} requires a Destination header", operation)))?
        .to_str()
        .map_err(|_| ApiError::BadRequest("Destination header is not ASCII".to_string()))?
        .trim()
        .to_string();

    let subjects = state.nodes.subjects().clone();
    let path = blocking(move || {
        let session = state.repository.begin();
        Ok(state.paths.run(operation, session, &source, &destination)?)
    })
    .await?;

    Ok(created(&subjects, &path))
}

/// Interpret a request body as object properties or datastream content.
fn body_spec(
    subjects: &GraphSubjects,
    path: &RepoPath,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<NodeSpec, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match content_type {
        None if body.is_empty() => Ok(NodeSpec::Object { properties: Vec::new() }),
        None => Ok(NodeSpec::Datastream {
            data: body.to_vec(),
            mime_type: DEFAULT_BINARY_TYPE.to_string(),
        }),
        Some(content_type) => match RdfFormat::from_media_type(content_type) {
            Some(RdfFormat::NTriples) => {
                let text = std::str::from_utf8(&body)
                    .map_err(|_| ApiError::BadRequest("RDF body is not UTF-8".to_string()))?;
                let properties = parse_ntriples(text, &subjects.subject_for(path))?;
                Ok(NodeSpec::Object { properties })
            }
            Some(format) => Err(ApiError::UnsupportedMediaType(format!(
                "{} request bodies are not accepted; send {}",
                format.media_type(),
                RdfFormat::NTriples.media_type()
            ))),
            None => Ok(NodeSpec::Datastream {
                data: body.to_vec(),
                mime_type: content_type.to_string(),
            }),
        },
    }
}

fn created(subjects: &GraphSubjects, path: &RepoPath) -> Response {
    let location = subjects.subject_for(path);
    let mut response = (StatusCode::CREATED, location.clone()).into_response();
    set_header(&mut response, header::LOCATION, &location);
    response
}

pub(crate) fn set_header(response: &mut Response, name: header::HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response.headers_mut().insert(name, value);
    }
}
