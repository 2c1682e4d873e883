//! Path normalization, partition filtering and diff/report path matching.
//!
//! Diff paths and coverage-report paths rarely agree byte for byte: reports
//! may be keyed by absolute paths, by paths relative to a sub-project, or
//! with Windows separators. Both sides are pushed through the same
//! [`PathRules`] and then matched on whole path components.

use serde::{Deserialize, Serialize};

/// Directory or filename segments that mark a file as a test.
pub const DEFAULT_TEST_MARKERS: &[&str] = &["test", "tests", "spec", "__tests__"];

/// Per-partition path handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathRules {
    /// Repository-relative prefixes owned by the partition. Empty means all.
    pub include: Vec<String>,

    /// Prefixes removed so diff paths line up with report paths.
    pub strip_prefixes: Vec<String>,

    /// Source extensions without the dot. Empty means any extension.
    pub extensions: Vec<String>,

    /// Segments that mark a path as a test file.
    pub test_markers: Vec<String>,
}

impl Default for PathRules {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            strip_prefixes: Vec::new(),
            extensions: Vec::new(),
            test_markers: DEFAULT_TEST_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl PathRules {
    pub fn with_include(mut self, prefix: impl Into<String>) -> Self {
        self.include.push(prefix.into());
        self
    }

    pub fn with_strip_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.strip_prefixes.push(prefix.into());
        self
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Normalize a path taken from a coverage report.
    pub fn report_path(&self, raw: &str) -> String {
        self.strip(&clean(raw)).to_string()
    }

    /// Normalize a path taken from a diff header, or `None` if the file is
    /// outside the partition, not a source file, or a test.
    pub fn diff_path(&self, raw: &str) -> Option<String> {
        let cleaned = clean(raw);
        if !self.is_included(&cleaned) || !self.is_source(&cleaned) || self.is_test_file(&cleaned)
        {
            return None;
        }
        Some(self.strip(&cleaned).to_string())
    }

    pub fn is_included(&self, path: &str) -> bool {
        self.include.is_empty()
            || self
                .include
                .iter()
                .any(|prefix| has_dir_prefix(path, prefix))
    }

    pub fn is_source(&self, path: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let file_name = path.rsplit('/').next().unwrap_or(path);
        match file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self
                .extensions
                .iter()
                .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext)),
            _ => false,
        }
    }

    /// A path is a test file when a directory segment equals a marker, or a
    /// `.`/`_`/`-` separated piece of the file stem does.
    pub fn is_test_file(&self, path: &str) -> bool {
        let mut segments: Vec<&str> = path.split('/').collect();
        let file_name = segments.pop().unwrap_or_default();
        let is_marker = |s: &str| self.test_markers.iter().any(|m| m.eq_ignore_ascii_case(s));

        if segments.iter().any(|dir| is_marker(dir)) {
            return true;
        }

        let stem = match file_name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => file_name,
        };
        stem.split(['.', '_', '-']).any(is_marker)
    }

    fn strip<'a>(&self, path: &'a str) -> &'a str {
        for prefix in &self.strip_prefixes {
            let prefix = clean(prefix);
            let prefix = prefix.trim_end_matches('/');
            if prefix.is_empty() {
                continue;
            }
            if let Some(rest) = path.strip_prefix(prefix) {
                if let Some(rest) = rest.strip_prefix('/') {
                    return rest;
                }
            }
        }
        path
    }
}

/// Forward slashes, no leading `./`, no doubled separators.
pub fn clean(raw: &str) -> String {
    let mut path = raw.trim().replace('\\', "/");
    while path.contains("//") {
        path = path.replace("//", "/");
    }
    let mut trimmed = path.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}

fn has_dir_prefix(path: &str, prefix: &str) -> bool {
    let prefix = clean(prefix);
    let prefix = prefix.trim_end_matches('/');
    prefix.is_empty()
        || path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// True when one path equals the other or ends with it on a component
/// boundary (`web/src/a.ts` matches `src/a.ts` but not `rc/a.ts`).
pub fn paths_match(a: &str, b: &str) -> bool {
    a == b || is_component_suffix(a, b) || is_component_suffix(b, a)
}

fn is_component_suffix(long: &str, short: &str) -> bool {
    !short.is_empty()
        && long.len() > short.len()
        && long.ends_with(short)
        && long.as_bytes()[long.len() - short.len() - 1] == b'/'
}

/// Find the report key for a diff path. An exact key wins; otherwise the
/// matching key sharing the most of the diff path, then the one closest to
/// it in length, then the lexicographically smaller key.
pub fn find_report_key<'a, I>(diff_path: &str, keys: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let rank = |key: &str| {
        let shared = key.len().min(diff_path.len());
        (std::cmp::Reverse(shared), key.len().abs_diff(diff_path.len()))
    };

    let mut best: Option<&'a str> = None;
    for key in keys {
        if key == diff_path {
            return Some(key);
        }
        if !paths_match(diff_path, key) {
            continue;
        }
        best = match best {
            Some(current) if (rank(current), current) <= (rank(key), key) => Some(current),
            _ => Some(key),
        };
    }
    best
}
