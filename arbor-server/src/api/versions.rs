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

//! Version sub-resources: `{path}/arb:versions` and `{path}/arb:versions/{label}`.

use super::resources::set_header;
use super::streaming::{rdf_head_response, rdf_response};
use super::{blocking, negotiate, ApiError, AppState};
use arbor_core::RepoPath;
use arbor_storage::LabelOutcome;
use axum::{
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::debug;

/// GET/HEAD the version listing of `path`.
pub async fn version_list(
    state: AppState,
    method: Method,
    path: RepoPath,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let head = match method {
        Method::GET => false,
        Method::HEAD => true,
        other => {
            return Err(ApiError::MethodNotAllowed(format!(
                "{} on the versions of {}",
                other, path
            )))
        }
    };

    let format = negotiate(&headers)?;
    let stream = state.versions.list_versions(state.repository.begin(), &path)?;
    if head {
        return Ok(rdf_head_response(stream, format));
    }
    Ok(rdf_response(stream, format, state.stream_chunk_triples, move |outcome| {
        debug!(path = %path, ?outcome, "Version list streamed");
    }))
}

/// Retrieve (GET/HEAD) or attach (POST/PUT) the version named `label`.
pub async fn version(
    state: AppState,
    method: Method,
    path: RepoPath,
    label: String,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    match method {
        Method::GET | Method::HEAD => {
            let format = negotiate(&headers)?;
            let resolved = state
                .versions
                .get_version(state.repository.begin(), &path, &label)?;

            let location = state
                .nodes
                .subjects()
                .version_subject(&path, &resolved.entry.id.to_hex());

            let mut response = if method == Method::HEAD {
                rdf_head_response(resolved.triples, format)
            } else {
                rdf_response(resolved.triples, format, state.stream_chunk_triples, move |outcome| {
                    debug!(path = %path, label = %label, ?outcome, "Version streamed");
                })
            };
            set_header(&mut response, header::CONTENT_LOCATION, &location);
            Ok(response)
        }
        Method::POST | Method::PUT => {
            let outcome = blocking(move || {
                let session = state.repository.begin();
                Ok(state.versions.add_label(session, &path, &label)?)
            })
            .await?;
            if outcome == LabelOutcome::Unchanged {
                debug!("Label already names the current version");
            }
            Ok(StatusCode::NO_CONTENT.into_response())
        }
        other => Err(ApiError::MethodNotAllowed(format!(
            "{} on version '{}' of {}",
            other, label, path
        ))),
    }
}
