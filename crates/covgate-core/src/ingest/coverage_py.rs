//! coverage.py JSON report ingestion (`coverage json` / `pytest --cov-report=json`).

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{ReportFormat, ReportIngester};
use crate::domain::{LineExecutionMap, Result};
use crate::paths::PathRules;

#[derive(Debug, Clone, Copy, Default)]
pub struct CoveragePyIngester;

#[derive(Debug, Deserialize)]
struct Report {
    #[serde(default)]
    files: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    #[serde(default)]
    executed_lines: Vec<Value>,
    #[serde(default)]
    missing_lines: Vec<Value>,
}

/// Valid line numbers from one list; bad elements are logged and dropped.
fn line_numbers<'a>(
    path: &'a str,
    list: &'static str,
    values: &'a [Value],
) -> impl Iterator<Item = u32> + 'a {
    values.iter().filter_map(move |value| {
        let line = value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0);
        if line.is_none() {
            warn!(file = %path, list, entry = %value, "malformed line number; skipping");
        }
        line
    })
}

impl ReportIngester for CoveragePyIngester {
    fn format(&self) -> ReportFormat {
        ReportFormat::CoveragePy
    }

    fn parse_str(&self, text: &str, rules: &PathRules) -> Result<LineExecutionMap> {
        let report: Report = serde_json::from_str(text)?;
        let mut map = LineExecutionMap::new();

        for (path, raw) in report.files {
            let entry: FileEntry = match serde_json::from_value(raw) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(file = %path, error = %e, "malformed file entry; skipping");
                    continue;
                }
            };

            let mut lines = BTreeMap::new();
            for line in line_numbers(&path, "missing_lines", &entry.missing_lines) {
                lines.insert(line, false);
            }
            for line in line_numbers(&path, "executed_lines", &entry.executed_lines) {
                lines.insert(line, true);
            }
            map.merge_file(&rules.report_path(&path), lines);
        }

        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "meta": {"version": "7.4.0", "format": 2},
        "files": {
            "app/views.py": {
                "executed_lines": [1, 2, 5],
                "missing_lines": [6, 7],
                "excluded_lines": [9],
                "summary": {"covered_lines": 3, "num_statements": 5}
            },
            "app/empty.py": {"executed_lines": [], "missing_lines": []}
        },
        "totals": {"covered_lines": 3}
    }"#;

    #[test]
    fn test_executed_and_missing_lines() {
        let map = CoveragePyIngester
            .parse_str(REPORT, &PathRules::default())
            .unwrap();
        assert_eq!(map.executed("app/views.py", 5), Some(true));
        assert_eq!(map.executed("app/views.py", 6), Some(false));
        // excluded lines are not instrumented
        assert_eq!(map.executed("app/views.py", 9), None);
        assert!(map.file("app/empty.py").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_line_number_keeps_rest_of_file() {
        let text = r#"{"files": {
            "a.py": {"executed_lines": [1, "x", 3, -2, 0], "missing_lines": [4, null]}
        }}"#;
        let map = CoveragePyIngester
            .parse_str(text, &PathRules::default())
            .unwrap();
        assert_eq!(map.executed("a.py", 1), Some(true));
        assert_eq!(map.executed("a.py", 3), Some(true));
        assert_eq!(map.executed("a.py", 4), Some(false));
        assert_eq!(map.file("a.py").unwrap().len(), 3);
    }

    #[test]
    fn test_malformed_file_entry_skipped() {
        let text = r#"{"files": {
            "a.py": {"executed_lines": "1-3"},
            "b.py": {"executed_lines": [3]}
        }}"#;
        let map = CoveragePyIngester
            .parse_str(text, &PathRules::default())
            .unwrap();
        assert!(map.file("a.py").is_none());
        assert_eq!(map.executed("b.py", 3), Some(true));
    }

    #[test]
    fn test_absolute_paths_stripped() {
        let text = r#"{"files": {"/home/ci/repo/backend/app/x.py": {"executed_lines": [1]}}}"#;
        let rules = PathRules::default().with_strip_prefix("/home/ci/repo/backend");
        let map = CoveragePyIngester.parse_str(text, &rules).unwrap();
        assert_eq!(map.executed("app/x.py", 1), Some(true));
    }

    #[test]
    fn test_invalid_document_is_error() {
        assert!(CoveragePyIngester
            .parse_str("[1, 2", &PathRules::default())
            .is_err());
    }
}
