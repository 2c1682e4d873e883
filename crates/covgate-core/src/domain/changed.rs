//! Changed-line sets extracted from a unified diff.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Per-file set of 1-indexed line numbers touched by a change.
///
/// Paths are normalized, repository-relative and forward-slashed. A path
/// present in the map always carries at least one line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangedLineSet {
    files: BTreeMap<String, BTreeSet<u32>>,
}

impl ChangedLineSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` lines starting at `start`. A zero count adds nothing and
    /// never creates an empty entry.
    pub fn add_range(&mut self, path: &str, start: u32, count: u32) {
        if count == 0 {
            return;
        }
        let end = start.saturating_add(count - 1);
        self.files
            .entry(path.to_string())
            .or_default()
            .extend(start..=end);
    }

    /// Add a single line.
    pub fn add_line(&mut self, path: &str, line: u32) {
        self.add_range(path, line, 1);
    }

    pub fn lines(&self, path: &str) -> Option<&BTreeSet<u32>> {
        self.files.get(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<u32>)> {
        self.files.iter().map(|(p, l)| (p.as_str(), l))
    }

    /// Number of files with at least one changed line.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total changed lines across all files.
    pub fn total_lines(&self) -> usize {
        self.files.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, u32)> for ChangedLineSet {
    fn from_iter<I: IntoIterator<Item = (&'a str, u32)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (path, line) in iter {
            set.add_line(path, line);
        }
        set
    }
}
