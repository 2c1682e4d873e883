//! Istanbul / nyc `coverage-final.json` ingestion.
//!
//! Each file entry carries a `statementMap` (statement id to source span)
//! and `s` (statement id to hit count). A line is instrumented when a
//! statement starts on it and executed when any such statement ran.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{ReportFormat, ReportIngester};
use crate::domain::{LineExecutionMap, Result};
use crate::paths::PathRules;

#[derive(Debug, Clone, Copy, Default)]
pub struct IstanbulIngester;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileCoverage {
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    statement_map: BTreeMap<String, Value>,
    #[serde(default)]
    s: BTreeMap<String, Value>,
}

fn start_line(span: &Value) -> Option<u32> {
    span.pointer("/start/line")
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .filter(|n| *n > 0)
}

/// Hit count as executed or not. Missing counts mean never executed.
fn hit(count: Option<&Value>) -> Option<bool> {
    match count {
        None | Some(Value::Null) => Some(false),
        Some(value) => value.as_f64().map(|n| n > 0.0),
    }
}

impl ReportIngester for IstanbulIngester {
    fn format(&self) -> ReportFormat {
        ReportFormat::Istanbul
    }

    fn parse_str(&self, text: &str, rules: &PathRules) -> Result<LineExecutionMap> {
        let report: BTreeMap<String, Value> = serde_json::from_str(text)?;
        let mut map = LineExecutionMap::new();

        for (key, mut raw) in report {
            // Older nyc output nests the entry under "data".
            let nested = raw.get_mut("data").map(Value::take);
            if let Some(data) = nested {
                raw = data;
            }
            let entry: FileCoverage = match serde_json::from_value(raw) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(file = %key, error = %e, "malformed file entry; skipping");
                    continue;
                }
            };

            let mut lines = BTreeMap::new();
            let path = entry.path.as_deref().unwrap_or(&key);
            for (id, span) in &entry.statement_map {
                let Some(line) = start_line(span) else {
                    warn!(file = %path, statement = %id, "malformed statement span; skipping");
                    continue;
                };
                let Some(executed) = hit(entry.s.get(id)) else {
                    warn!(file = %path, statement = %id, "malformed hit count; skipping");
                    continue;
                };
                *lines.entry(line).or_insert(false) |= executed;
            }

            map.merge_file(&rules.report_path(path), lines);
        }

        Ok(map)
    }
}
