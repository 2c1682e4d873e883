//! Log setup for the covgate binary.
//!
//! The human-readable gate report is the only thing covgate writes to
//! stdout. Every tracing event, plain or JSON, goes to stderr, so
//! `covgate run > report.txt` captures the report alone and CI log
//! collectors can parse stderr line by line with `--json`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Crate targets whose events follow the `-v` level.
const COVGATE_TARGETS: [&str; 4] = ["covgate", "covgate_cli", "covgate_ci", "covgate_core"];

/// Filter used when `RUST_LOG` is unset: covgate's own events at `level`,
/// everything else at `warn`.
pub fn default_filter(level: Level) -> String {
    let mut directives = vec!["warn".to_string()];
    directives.extend(COVGATE_TARGETS.iter().map(|t| format!("{t}={level}")));
    directives.join(",")
}

/// Install the global subscriber writing to stderr.
///
/// `RUST_LOG` replaces [`default_filter`] entirely when set. A second call
/// leaves the first subscriber in place.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(level)));
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = if json {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
