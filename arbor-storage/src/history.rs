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

//! Per-resource version history and labels.
//!
//! Versions are append-only. Labels are unique within a resource; one
//! version may carry several labels.

use crate::error::StoreError;
use crate::objects::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Minimum hex prefix accepted when resolving a short version id
pub const MIN_SHORT_ID: usize = 7;

/// One entry of a version history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    /// `VersionRecord` object id; also the public version id
    pub id: ObjectId,
    pub snapshot: ObjectId,
    pub created_us: u64,
}

/// Outcome of attaching a label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelOutcome {
    Added,
    /// The label already named this version
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHistory {
    entries: Vec<VersionEntry>,
    labels: BTreeMap<String, ObjectId>,
}

impl VersionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Versions, oldest first
    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&VersionEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, entry: VersionEntry) {
        self.entries.push(entry);
    }

    /// Labels attached to a version, in name order
    pub fn labels_for(&self, id: &ObjectId) -> Vec<String> {
        self.labels
            .iter()
            .filter(|(_, target)| *target == id)
            .map(|(label, _)| label.clone())
            .collect()
    }

    pub fn labels(&self) -> &BTreeMap<String, ObjectId> {
        &self.labels
    }

    /// Attach `label` to the latest version.
    ///
    /// Errors with `NoVersion` when nothing has been committed yet and with
    /// `LabelConflict` when the label already names an older version.
    pub fn label_latest(
        &mut self,
        label: &str,
        path: &arbor_core::RepoPath,
    ) -> Result<LabelOutcome, StoreError> {
        validate_label(label)?;
        let latest = self
            .latest()
            .map(|e| e.id)
            .ok_or_else(|| StoreError::NoVersion(path.clone()))?;

        match self.labels.get(label) {
            Some(existing) if *existing == latest => Ok(LabelOutcome::Unchanged),
            Some(_) => Err(StoreError::LabelConflict {
                label: label.to_string(),
                path: path.clone(),
            }),
            None => {
                self.labels.insert(label.to_string(), latest);
                Ok(LabelOutcome::Added)
            }
        }
    }

    /// Resolve a label, a full version id, or an unambiguous short id
    pub fn resolve(&self, key: &str) -> Option<&VersionEntry> {
        if let Some(id) = self.labels.get(key) {
            return self.entries.iter().find(|e| e.id == *id);
        }
        if key.len() < MIN_SHORT_ID || !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let mut matches = self.entries.iter().filter(|e| e.id.starts_with(key));
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Some(entry),
            _ => None,
        }
    }
}

/// Validate a version label
pub fn validate_label(label: &str) -> Result<(), StoreError> {
    if label.is_empty() {
        return Err(StoreError::InvalidLabel("empty label".to_string()));
    }

    if label.starts_with('.') || label.contains("..") {
        return Err(StoreError::InvalidLabel(format!(
            "'{}': cannot start with '.' or contain '..'",
            label
        )));
    }

    let invalid_chars = ['/', ':', '\\', '?', '#', '*', '[', ']', '~', '^'];
    for c in label.chars() {
        if c.is_whitespace() || c.is_control() || invalid_chars.contains(&c) {
            return Err(StoreError::InvalidLabel(format!(
                "'{}': cannot contain '{}'",
                label,
                c.escape_default()
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::RepoPath;

    fn entry(n: u8) -> VersionEntry {
        VersionEntry {
            id: ObjectId::from_content(&[n]),
            snapshot: ObjectId::from_content(&[n, n]),
            created_us: n as u64,
        }
    }

    fn path() -> RepoPath {
        RepoPath::parse("/a").unwrap()
    }

    #[test]
    fn test_label_latest() {
        let mut history = VersionHistory::new();
        history.push(entry(1));

        assert_eq!(history.label_latest("v1", &path()).unwrap(), LabelOutcome::Added);
        assert_eq!(history.label_latest("v1", &path()).unwrap(), LabelOutcome::Unchanged);
        assert_eq!(history.label_latest("first", &path()).unwrap(), LabelOutcome::Added);
        assert_eq!(history.labels_for(&entry(1).id), vec!["first", "v1"]);

        history.push(entry(2));
        assert!(matches!(
            history.label_latest("v1", &path()),
            Err(StoreError::LabelConflict { .. })
        ));
        assert_eq!(history.resolve("v1"), Some(&entry(1)));
    }

    #[test]
    fn test_label_without_versions() {
        let mut history = VersionHistory::new();
        assert!(matches!(
            history.label_latest("v1", &path()),
            Err(StoreError::NoVersion(_))
        ));
    }

    #[test]
    fn test_resolve_by_id() {
        let mut history = VersionHistory::new();
        history.push(entry(1));
        history.push(entry(2));

        let id = entry(2).id;
        assert_eq!(history.resolve(&id.to_hex()), Some(&entry(2)));
        assert_eq!(history.resolve(&id.short()), Some(&entry(2)));
        assert_eq!(history.resolve(&id.to_hex()[..3]), None);
        assert_eq!(history.resolve("missing"), None);
    }

    #[test]
    fn test_validate_label() {
        assert!(validate_label("v1.0-final").is_ok());
        assert!(validate_label("").is_err());
        assert!(validate_label("has space").is_err());
        assert!(validate_label("a/b").is_err());
        assert!(validate_label("arb:x").is_err());
        assert!(validate_label("..").is_err());
    }
}
