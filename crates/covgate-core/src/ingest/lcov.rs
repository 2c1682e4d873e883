//! LCOV tracefile ingestion.
//!
//! Records look like:
//!
//! ```text
//! SF:src/lib.rs
//! DA:3,1
//! DA:4,0
//! end_of_record
//! ```
//!
//! Only `SF`, `DA` and `end_of_record` matter here; function and branch
//! records are ignored.

use std::collections::BTreeMap;

use tracing::warn;

use super::{ReportFormat, ReportIngester};
use crate::domain::{LineExecutionMap, Result};
use crate::paths::PathRules;

#[derive(Debug, Clone, Copy, Default)]
pub struct LcovIngester;

/// The record currently being accumulated.
struct OpenRecord {
    path: String,
    lines: BTreeMap<u32, bool>,
}

impl ReportIngester for LcovIngester {
    fn format(&self) -> ReportFormat {
        ReportFormat::Lcov
    }

    fn parse_str(&self, text: &str, rules: &PathRules) -> Result<LineExecutionMap> {
        let mut map = LineExecutionMap::new();
        let mut open: Option<OpenRecord> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if let Some(path) = line.strip_prefix("SF:") {
                flush(&mut map, open.take());
                open = Some(OpenRecord {
                    path: rules.report_path(path),
                    lines: BTreeMap::new(),
                });
            } else if let Some(data) = line.strip_prefix("DA:") {
                let Some(record) = open.as_mut() else {
                    warn!(line = line_no, "DA entry outside of an SF record; skipping");
                    continue;
                };
                match parse_da(data) {
                    Some((n, hits)) => {
                        *record.lines.entry(n).or_insert(false) |= hits > 0.0;
                    }
                    None => warn!(
                        line = line_no,
                        file = %record.path,
                        entry = %line,
                        "malformed DA entry; skipping"
                    ),
                }
            } else if line == "end_of_record" {
                flush(&mut map, open.take());
            }
        }
        flush(&mut map, open.take());

        Ok(map)
    }
}

fn flush(map: &mut LineExecutionMap, record: Option<OpenRecord>) {
    if let Some(record) = record {
        map.merge_file(&record.path, record.lines);
    }
}

/// `<line>,<hits>[,<checksum>]`. Hit counts may be negative or fractional
/// in some generators; anything above zero counts as executed.
fn parse_da(data: &str) -> Option<(u32, f64)> {
    let mut parts = data.split(',');
    let line: u32 = parts.next()?.trim().parse().ok()?;
    let hits: f64 = parts.next()?.trim().parse().ok()?;
    if line == 0 || !hits.is_finite() {
        return None;
    }
    Some((line, hits))
}
