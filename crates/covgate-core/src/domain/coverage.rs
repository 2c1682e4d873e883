//! Normalized per-line execution data ingested from a coverage report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-file map of instrumented line number to "executed at least once".
///
/// A line that is present was instrumented; `false` means it was
/// instrumented but never ran. An absent line was never instrumented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineExecutionMap {
    files: BTreeMap<String, BTreeMap<u32, bool>>,
}

/// Instrumented and executed line counts for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLineStats {
    pub instrumented: usize,
    pub executed: usize,
}

impl LineExecutionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one line. Repeated records for the same line are OR-ed, so a
    /// line hit by any record counts as executed.
    pub fn record(&mut self, path: &str, line: u32, executed: bool) {
        let slot = self
            .files
            .entry(path.to_string())
            .or_default()
            .entry(line)
            .or_insert(false);
        *slot |= executed;
    }

    /// Merge a whole file's worth of lines, OR-ing with anything already held.
    pub fn merge_file(&mut self, path: &str, lines: BTreeMap<u32, bool>) {
        let entry = self.files.entry(path.to_string()).or_default();
        for (line, executed) in lines {
            *entry.entry(line).or_insert(false) |= executed;
        }
    }

    pub fn file(&self, path: &str) -> Option<&BTreeMap<u32, bool>> {
        self.files.get(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<u32, bool>)> {
        self.files.iter().map(|(p, l)| (p.as_str(), l))
    }

    /// Tri-state lookup: `None` when the line was never instrumented.
    pub fn executed(&self, path: &str, line: u32) -> Option<bool> {
        self.files.get(path).and_then(|lines| lines.get(&line).copied())
    }

    pub fn stats(&self, path: &str) -> Option<FileLineStats> {
        self.files.get(path).map(|lines| FileLineStats {
            instrumented: lines.len(),
            executed: lines.values().filter(|e| **e).count(),
        })
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instrumented_vs_absent() {
        let mut map = LineExecutionMap::new();
        map.record("src/a.rs", 3, false);
        assert_eq!(map.executed("src/a.rs", 3), Some(false));
        assert_eq!(map.executed("src/a.rs", 4), None);
        assert_eq!(map.executed("src/b.rs", 3), None);
    }

    #[test]
    fn test_repeated_records_or_together() {
        let mut map = LineExecutionMap::new();
        map.record("src/a.rs", 3, true);
        map.record("src/a.rs", 3, false);
        assert_eq!(map.executed("src/a.rs", 3), Some(true));
    }

    #[test]
    fn test_stats() {
        let mut map = LineExecutionMap::new();
        map.merge_file("m.py", BTreeMap::from([(1, true), (2, false), (5, true)]));
        let stats = map.stats("m.py").unwrap();
        assert_eq!(stats.instrumented, 3);
        assert_eq!(stats.executed, 2);
    }
}
