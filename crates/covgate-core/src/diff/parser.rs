//! Zero-context unified diff parsing.

use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, warn};

use crate::domain::ChangedLineSet;
use crate::paths::PathRules;

fn hunk_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("hunk header regex")
    })
}

/// A parsed `@@ -a,b +c,d @@` header. Omitted counts default to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_count: u32,
    pub new_start: u32,
    pub new_count: u32,
}

impl HunkHeader {
    pub fn parse(line: &str) -> Option<Self> {
        let caps = hunk_header().captures(line)?;
        let num = |i: usize, default: u32| -> Option<u32> {
            match caps.get(i) {
                Some(m) => m.as_str().parse().ok(),
                None => Some(default),
            }
        };
        Some(Self {
            old_start: num(1, 0)?,
            old_count: num(2, 1)?,
            new_start: num(3, 0)?,
            new_count: num(4, 1)?,
        })
    }
}

/// Body lines still expected for the current hunk. Header-looking lines
/// inside a hunk body are content, not headers.
#[derive(Debug, Default)]
struct HunkBody {
    old_remaining: u32,
    new_remaining: u32,
}

impl HunkBody {
    fn is_open(&self) -> bool {
        self.old_remaining > 0 || self.new_remaining > 0
    }

    /// Returns false when the line does not belong to a hunk body.
    fn consume(&mut self, line: &str) -> bool {
        match line.as_bytes().first() {
            Some(b'+') if self.new_remaining > 0 => self.new_remaining -= 1,
            Some(b'-') if self.old_remaining > 0 => self.old_remaining -= 1,
            Some(b' ') => {
                self.old_remaining = self.old_remaining.saturating_sub(1);
                self.new_remaining = self.new_remaining.saturating_sub(1);
            }
            Some(b'\\') => {}
            _ => return false,
        }
        true
    }
}

/// Extract changed lines from unified diff text.
///
/// `+++ b/<path>` selects the current file (or clears it when `rules`
/// exclude the path), `--- a/<path>` and `diff --git` clear it, and each
/// hunk header adds `new_start..new_start+new_count` to the current file.
pub fn parse_unified_diff(text: &str, rules: &PathRules) -> ChangedLineSet {
    let mut changed = ChangedLineSet::new();
    let mut current: Option<String> = None;
    let mut body = HunkBody::default();

    for line in text.lines() {
        if body.is_open() {
            if body.consume(line) {
                continue;
            }
            warn!(line = %line, "hunk ended early; resuming header scan");
            body = HunkBody::default();
        }

        if line.starts_with("diff --git ") || line.starts_with("--- ") {
            current = None;
        } else if let Some(raw) = line.strip_prefix("+++ ") {
            current = new_file_path(raw).and_then(|p| rules.diff_path(&p));
            if current.is_none() {
                debug!(header = %raw, "file excluded from diff coverage");
            }
        } else if line.starts_with("@@") {
            let Some(hunk) = HunkHeader::parse(line) else {
                warn!(line = %line, "skipping malformed hunk header");
                continue;
            };
            body = HunkBody {
                old_remaining: hunk.old_count,
                new_remaining: hunk.new_count,
            };
            if let Some(path) = &current {
                changed.add_range(path, hunk.new_start, hunk.new_count);
            }
        }
    }

    changed
}

/// Path from a `+++` header, or `None` for deleted files.
fn new_file_path(raw: &str) -> Option<String> {
    let raw = raw.split('\t').next().unwrap_or(raw).trim();
    let raw = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(raw);
    if raw == "/dev/null" {
        return None;
    }
    Some(raw.strip_prefix("b/").unwrap_or(raw).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(set: &ChangedLineSet, path: &str) -> Vec<u32> {
        set.lines(path)
            .map(|l| l.iter().copied().collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_hunk_header_with_counts() {
        let h = HunkHeader::parse("@@ -5,0 +10,3 @@ fn main() {").unwrap();
        assert_eq!(h.new_start, 10);
        assert_eq!(h.new_count, 3);
        assert_eq!(h.old_count, 0);
    }

    #[test]
    fn test_hunk_header_omitted_count_is_one() {
        let h = HunkHeader::parse("@@ -7 +8 @@").unwrap();
        assert_eq!(h.new_start, 8);
        assert_eq!(h.new_count, 1);
    }

    #[test]
    fn test_single_file_hunk() {
        let diff = "\
diff --git a/a.ts b/a.ts
--- a/a.ts
+++ b/a.ts
@@ -5,0 +10,3 @@
+one
+two
+three
";
        let set = parse_unified_diff(diff, &PathRules::default());
        assert_eq!(lines(&set, "a.ts"), vec![10, 11, 12]);
    }

    #[test]
    fn test_pure_deletion_adds_nothing() {
        let diff = "\
--- a/a.py
+++ b/a.py
@@ -3,2 +2,0 @@
-gone
-also gone
";
        let set = parse_unified_diff(diff, &PathRules::default());
        assert!(set.is_empty());
    }

    #[test]
    fn test_deleted_file_clears_cursor() {
        let diff = "\
--- a/old.py
+++ /dev/null
@@ -1,2 +0,0 @@
-a
-b
";
        let set = parse_unified_diff(diff, &PathRules::default());
        assert!(set.is_empty());
    }

    #[test]
    fn test_excluded_file_hunks_ignored() {
        let diff = "\
--- a/docs/readme.md
+++ b/docs/readme.md
@@ -1 +1 @@
-x
+y
--- a/src/lib.py
+++ b/src/lib.py
@@ -1 +1,2 @@
-x
+y
+z
";
        let rules = PathRules::default().with_extensions(["py"]);
        let set = parse_unified_diff(diff, &rules);
        assert_eq!(set.file_count(), 1);
        assert_eq!(lines(&set, "src/lib.py"), vec![1, 2]);
    }

    #[test]
    fn test_hunk_without_file_ignored() {
        let set = parse_unified_diff("@@ -1 +1,4 @@\n+a\n+b\n+c\n+d\n", &PathRules::default());
        assert!(set.is_empty());
    }

    #[test]
    fn test_added_line_resembling_header_is_content() {
        let diff = "\
--- a/src/a.py
+++ b/src/a.py
@@ -0,0 +1,2 @@
+++ b/evil.py
+--- a/evil.py
@@ -9,0 +20 @@
+x
";
        let set = parse_unified_diff(diff, &PathRules::default());
        assert_eq!(set.file_count(), 1);
        assert_eq!(lines(&set, "src/a.py"), vec![1, 2, 20]);
    }

    #[test]
    fn test_test_files_excluded() {
        let diff = "\
--- a/app/tests/test_views.py
+++ b/app/tests/test_views.py
@@ -1 +1 @@
-a
+b
";
        let set = parse_unified_diff(diff, &PathRules::default());
        assert!(set.is_empty());
    }

    #[test]
    fn test_quoted_path_and_prefix_strip() {
        let diff = "\
--- \"a/web/src/my file.ts\"
+++ \"b/web/src/my file.ts\"
@@ -1 +4 @@
-a
+b
";
        let rules = PathRules::default().with_strip_prefix("web");
        let set = parse_unified_diff(diff, &rules);
        assert_eq!(lines(&set, "src/my file.ts"), vec![4]);
    }
}
