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

//! Chunked RDF response bodies.
//!
//! Triples are serialized on a blocking worker and handed to the body in
//! chunks. The session behind the stream is released exactly once, when the
//! writer finishes or the client goes away.

use arbor_core::{writer_for, RdfFormat, Triple, WriteError};
use arbor_storage::{RdfStream, StreamOutcome};
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Chunks buffered between the writer and the body
const CHANNEL_DEPTH: usize = 4;

/// Build a streaming response for `stream` in `format`.
///
/// `on_complete` runs on the writer thread after the session is released.
pub fn rdf_response<F>(
    stream: RdfStream,
    format: RdfFormat,
    chunk_triples: usize,
    on_complete: F,
) -> Response
where
    F: FnOnce(StreamOutcome) + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Result<Bytes, std::io::Error>>(CHANNEL_DEPTH);
    let chunk_triples = chunk_triples.max(1);

    tokio::task::spawn_blocking(move || {
        let (triples, mut lease) = stream.into_parts();
        let outcome = pump(triples, format, chunk_triples, &tx);

        lease.release();
        match outcome {
            StreamOutcome::Completed => debug!(?outcome, %format, "RDF stream closed"),
            StreamOutcome::Aborted => warn!(?outcome, %format, "RDF stream closed early"),
        }
        on_complete(outcome);
    });

    let body = Body::from_stream(futures::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    }));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    if let Ok(value) = HeaderValue::from_str(&format.content_type()) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}

/// Serialize `triples` into `tx` in chunks of `chunk_triples`.
fn pump<I>(
    triples: I,
    format: RdfFormat,
    chunk_triples: usize,
    tx: &mpsc::Sender<Result<Bytes, std::io::Error>>,
) -> StreamOutcome
where
    I: Iterator<Item = Triple>,
{
    let mut writer = writer_for(format);
    let mut buf = Vec::new();

    let written = (|| -> Result<bool, WriteError> {
        let mut pending = 0usize;
        writer.start(&mut buf)?;
        for triple in triples {
            writer.write(&triple, &mut buf)?;
            pending += 1;
            if pending >= chunk_triples {
                pending = 0;
                if tx.blocking_send(Ok(Bytes::from(std::mem::take(&mut buf)))).is_err() {
                    return Ok(false);
                }
            }
        }
        writer.finish(&mut buf)?;
        Ok(true)
    })();

    match written {
        Ok(true) => {
            if !buf.is_empty() && tx.blocking_send(Ok(Bytes::from(buf))).is_err() {
                return StreamOutcome::Aborted;
            }
            StreamOutcome::Completed
        }
        Ok(false) => StreamOutcome::Aborted,
        Err(e) => {
            warn!(error = %e, %format, "RDF serialization failed");
            // flush what was written so far, then fail the body
            if !buf.is_empty() {
                let _ = tx.blocking_send(Ok(Bytes::from(buf)));
            }
            let _ = tx.blocking_send(Err(std::io::Error::other(e.to_string())));
            StreamOutcome::Aborted
        }
    }
}

/// Headers only: the stream is dropped unread and its session released.
pub fn rdf_head_response(stream: RdfStream, format: RdfFormat) -> Response {
    drop(stream);
    let mut response = Response::new(Body::empty());
    if let Ok(value) = HeaderValue::from_str(&format.content_type()) {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::Term;
    use arbor_storage::Repository;
    use std::sync::{Arc, Mutex};

    fn sample() -> Vec<Triple> {
        (0..5)
            .map(|i| {
                Triple::new(
                    Term::iri("http://localhost/rest/a"),
                    "http://x/p",
                    Term::string(format!("v{}", i)),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_stream_completes_and_releases() {
        let repo = Repository::new().unwrap();
        let stream = RdfStream::new(sample().into_iter(), repo.begin());
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();

        let response = rdf_response(stream, RdfFormat::NTriples, 2, move |outcome| {
            *sink.lock().unwrap() = Some(outcome);
        });
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/n-triples;charset=utf-8"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(text.lines().count(), 5);
        assert!(text.contains("\"v4\""));

        // the writer thread releases before the channel closes
        assert_eq!(repo.open_sessions(), 0);
        assert_eq!(*seen.lock().unwrap(), Some(StreamOutcome::Completed));
    }

    #[tokio::test]
    async fn test_dropped_body_aborts() {
        let repo = Repository::new().unwrap();
        let triples = (0..10_000).map(|i| {
            Triple::new(
                Term::iri("http://localhost/rest/a"),
                "http://x/p",
                Term::string(format!("value {}", i)),
            )
        });
        let stream = RdfStream::new(triples, repo.begin());
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        let response = rdf_response(stream, RdfFormat::Turtle, 1, move |outcome| {
            let _ = done_tx.send(outcome);
        });
        drop(response);

        assert_eq!(done_rx.await.unwrap(), StreamOutcome::Aborted);
        assert_eq!(repo.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_serialization_error_fails_body_and_releases() {
        let repo = Repository::new().unwrap();
        let triples = vec![
            Triple::new(Term::iri("http://localhost/rest/a"), "http://x/p", Term::string("ok")),
            Triple::new(Term::iri("http://localhost/rest/a"), "http://x/123", Term::string("no")),
        ];
        let stream = RdfStream::new(triples.into_iter(), repo.begin());
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();

        let response = rdf_response(stream, RdfFormat::RdfXml, 1, move |outcome| {
            let _ = done_tx.send(outcome);
        });

        assert!(axum::body::to_bytes(response.into_body(), usize::MAX).await.is_err());
        assert_eq!(done_rx.await.unwrap(), StreamOutcome::Aborted);
        assert_eq!(repo.open_sessions(), 0);
    }

    #[test]
    fn test_head_releases() {
        let repo = Repository::new().unwrap();
        let stream = RdfStream::new(sample().into_iter(), repo.begin());
        let response = rdf_head_response(stream, RdfFormat::Turtle);
        assert_eq!(repo.open_sessions(), 0);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/turtle;charset=utf-8"
        );
    }
}
