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

//! Graph subject resolution.
//!
//! Maps repository paths to the RDF subject URIs exposed to clients, and
//! back. The mapping is a pure function of the base URI and the path, so
//! the current state of a resource and any of its versions are described
//! with the same subject. Distinct bases (for example different virtual
//! hosts) produce disjoint subject spaces.

use crate::path::RepoPath;
use crate::rdf::Term;
use percent_encoding::percent_decode_str;
use thiserror::Error;
use url::Url;

/// Segment under which versions of a resource are addressed.
pub const VERSIONS_SEGMENT: &str = "arb:versions";

/// Subject resolution errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubjectError {
    #[error("Invalid base URI '{0}': must be an absolute http(s) URI")]
    InvalidBase(String),

    #[error("Invalid URI '{0}'")]
    InvalidUri(String),
}

/// Subject resolver bound to one base URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSubjects {
    /// Always ends with `/`, never carries a query or fragment
    base: Url,
}

impl GraphSubjects {
    pub fn new(base: &str) -> Result<Self, SubjectError> {
        let mut url = Url::parse(base).map_err(|_| SubjectError::InvalidBase(base.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(SubjectError::InvalidBase(base.to_string()));
        }
        url.set_query(None);
        url.set_fragment(None);
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self { base: url })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Subject URI for a path.
    pub fn subject_for(&self, path: &RepoPath) -> String {
        subject_url(&self.base, path).to_string()
    }

    pub fn subject_term(&self, path: &RepoPath) -> Term {
        Term::Iri(self.subject_for(path))
    }

    /// URI of the version listing of the resource at `path`.
    pub fn versions_subject(&self, path: &RepoPath) -> String {
        self.sub_resource(path, &[VERSIONS_SEGMENT])
    }

    /// Subject URI of one version of the resource at `path`.
    pub fn version_subject(&self, path: &RepoPath, version_id: &str) -> String {
        self.sub_resource(path, &[VERSIONS_SEGMENT, version_id])
    }

    fn sub_resource(&self, path: &RepoPath, extra: &[&str]) -> String {
        let mut url = subject_url(&self.base, path);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(extra);
        }
        url.to_string()
    }

    /// Resolve `uri` (absolute, or relative to the base) to a local path.
    ///
    /// Returns `Ok(None)` when the URI lies outside this base: another
    /// scheme, host or port, or a path outside the base path.
    pub fn path_for(&self, uri: &str) -> Result<Option<RepoPath>, SubjectError> {
        let url = self
            .base
            .join(uri)
            .map_err(|_| SubjectError::InvalidUri(uri.to_string()))?;

        if url.scheme() != self.base.scheme()
            || url.host_str() != self.base.host_str()
            || url.port_or_known_default() != self.base.port_or_known_default()
        {
            return Ok(None);
        }

        let base_path = self.base.path();
        let relative = match url.path().strip_prefix(base_path) {
            Some(rest) => rest,
            None if url.path() == base_path.trim_end_matches('/') => "",
            None => return Ok(None),
        };

        let mut segments = Vec::new();
        for raw in relative.split('/').filter(|s| !s.is_empty()) {
            let decoded = percent_decode_str(raw)
                .decode_utf8()
                .map_err(|_| SubjectError::InvalidUri(uri.to_string()))?;
            segments.push(decoded.into_owned());
        }

        RepoPath::from_segments(segments)
            .map(Some)
            .map_err(|_| SubjectError::InvalidUri(uri.to_string()))
    }
}

/// Free-standing form of [`GraphSubjects::subject_for`].
pub fn subject_for(base: &GraphSubjects, path: &RepoPath) -> String {
    base.subject_for(path)
}

fn subject_url(base: &Url, path: &RepoPath) -> Url {
    let mut url = base.clone();
    if !path.is_root() {
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            for segment in path.segments() {
                segments.push(segment);
            }
        }
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn subjects() -> GraphSubjects {
        GraphSubjects::new("http://localhost/repo").unwrap()
    }

    fn path(p: &str) -> RepoPath {
        RepoPath::parse(p).unwrap()
    }

    #[test]
    fn test_subject_for() {
        let s = subjects();
        assert_eq!(s.subject_for(&RepoPath::root()), "http://localhost/repo/");
        assert_eq!(s.subject_for(&path("/foo/bar")), "http://localhost/repo/foo/bar");
        assert_eq!(
            s.subject_for(&path("/a b/c%d")),
            "http://localhost/repo/a%20b/c%25d"
        );
    }

    #[test]
    fn test_version_subject() {
        let s = subjects();
        assert_eq!(
            s.version_subject(&path("/foo"), "abc123"),
            "http://localhost/repo/foo/arb:versions/abc123"
        );
        assert_eq!(
            s.versions_subject(&RepoPath::root()),
            "http://localhost/repo/arb:versions"
        );
    }

    #[test]
    fn test_rejects_bad_base() {
        assert!(GraphSubjects::new("ftp://x/").is_err());
        assert!(GraphSubjects::new("not a uri").is_err());
        assert!(GraphSubjects::new("mailto:x@y").is_err());
    }

    #[test]
    fn test_path_for_local() {
        let s = subjects();
        assert_eq!(
            s.path_for("http://localhost/repo/bar").unwrap(),
            Some(path("/bar"))
        );
        assert_eq!(
            s.path_for("http://localhost/repo").unwrap(),
            Some(RepoPath::root())
        );
        assert_eq!(s.path_for("baz/qux").unwrap(), Some(path("/baz/qux")));
        assert_eq!(
            s.path_for("http://localhost/repo/a%20b").unwrap(),
            Some(path("/a b"))
        );
    }

    #[test]
    fn test_path_for_foreign() {
        let s = subjects();
        assert_eq!(s.path_for("http://somewhere/else/baz").unwrap(), None);
        assert_eq!(s.path_for("https://localhost/repo/baz").unwrap(), None);
        assert_eq!(s.path_for("http://localhost:8081/repo/baz").unwrap(), None);
        assert_eq!(s.path_for("http://localhost/other/baz").unwrap(), None);
    }

    #[test]
    fn test_distinct_bases_are_disjoint() {
        let a = GraphSubjects::new("http://one.example/rest/").unwrap();
        let b = GraphSubjects::new("http://two.example/rest/").unwrap();
        assert_ne!(a.subject_for(&path("/foo")), b.subject_for(&path("/foo")));
    }

    proptest! {
        #[test]
        fn prop_deterministic_and_invertible(segs in prop::collection::vec("[a-zA-Z0-9 %._-]{1,8}", 0..4)) {
            prop_assume!(segs.iter().all(|s| s != "." && s != ".."));
            let s = subjects();
            let p = RepoPath::from_segments(segs).unwrap();
            let subject = s.subject_for(&p);
            prop_assert_eq!(&subject, &s.subject_for(&p));
            prop_assert_eq!(s.path_for(&subject).unwrap(), Some(p));
        }

        #[test]
        fn prop_distinct_paths_distinct_subjects(
            a in prop::collection::vec("[a-z/]{1,6}", 1..3),
            b in prop::collection::vec("[a-z/]{1,6}", 1..3),
        ) {
            let to_path = |v: &Vec<String>| {
                RepoPath::from_segments(v.iter().map(|s| s.replace('/', "_")))
            };
            let (pa, pb) = (to_path(&a).unwrap(), to_path(&b).unwrap());
            prop_assume!(pa != pb);
            let s = subjects();
            prop_assert_ne!(s.subject_for(&pa), s.subject_for(&pb));
        }
    }
}
