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

//! Lazy triple streams bound to a session.
//!
//! A read hands back an `RdfStream`: a once-only triple iterator plus the
//! lease on the session that produced it. The consumer serializes the
//! triples and then releases the lease; releasing twice is a no-op and an
//! unreleased lease releases on drop.

use crate::session::Session;
use arbor_core::Triple;
use std::fmt;
use tracing::debug;

/// How a stream consumer finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// Every triple was written
    Completed,
    /// Output stopped early (client gone, write error)
    Aborted,
}

/// Ownership of an open session for the lifetime of a stream
pub struct SessionLease {
    session: Option<Session>,
}

impl SessionLease {
    pub fn new(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// Release the session. Returns `false` when already released.
    pub fn release(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                session.release();
                true
            }
            None => false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.session.is_none()
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        if self.release() {
            debug!("Session lease released on drop");
        }
    }
}

impl fmt::Debug for SessionLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionLease")
            .field("released", &self.is_released())
            .finish()
    }
}

pub type TripleIter = Box<dyn Iterator<Item = Triple> + Send>;

/// A lazily produced RDF graph, consumable once
pub struct RdfStream {
    triples: TripleIter,
    lease: SessionLease,
}

impl RdfStream {
    pub fn new<I>(triples: I, session: Session) -> Self
    where
        I: Iterator<Item = Triple> + Send + 'static,
    {
        Self {
            triples: Box::new(triples),
            lease: SessionLease::new(session),
        }
    }

    /// Split into the triple source and the session lease
    pub fn into_parts(self) -> (TripleIter, SessionLease) {
        (self.triples, self.lease)
    }

    /// Drain the stream into memory and release the session
    pub fn collect_triples(self) -> Vec<Triple> {
        let (triples, mut lease) = self.into_parts();
        let collected = triples.collect();
        lease.release();
        collected
    }
}

impl fmt::Debug for RdfStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RdfStream").field("lease", &self.lease).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::Repository;
    use arbor_core::Term;

    #[test]
    fn test_lease_releases_once() {
        let repo = Repository::new().unwrap();
        let mut lease = SessionLease::new(repo.begin());
        assert_eq!(repo.open_sessions(), 1);
        assert!(lease.release());
        assert!(!lease.release());
        drop(lease);
        assert_eq!(repo.open_sessions(), 0);
    }

    #[test]
    fn test_stream_is_lazy_and_releases() {
        let repo = Repository::new().unwrap();
        let produced = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = produced.clone();
        let triples = (0..3).map(move |i| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Triple::new(Term::iri("http://h/a"), "http://x/p", Term::string(i.to_string()))
        });

        let stream = RdfStream::new(triples, repo.begin());
        assert_eq!(produced.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(repo.open_sessions(), 1);

        assert_eq!(stream.collect_triples().len(), 3);
        assert_eq!(repo.open_sessions(), 0);
    }

    #[test]
    fn test_dropped_stream_releases() {
        let repo = Repository::new().unwrap();
        let stream = RdfStream::new(std::iter::empty(), repo.begin());
        drop(stream);
        assert_eq!(repo.open_sessions(), 0);
    }
}
