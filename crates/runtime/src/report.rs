//! At-exit heap report
//!
//! Dumps heap KPIs when the host shuts the runtime down, controlled by the
//! `TERN_REPORT` env var:
//! - Unset / `0` → no report, zero cost
//! - `1` → human-readable to stderr
//! - `json` → JSON to stderr
//! - `json:/path` → JSON to file
//!
//! JSON output needs the `report-json` feature (enabled by default);
//! without it, `json` falls back to the human format with a warning.

use crate::memory_stats::{self, MemorySnapshot};
use std::io::Write;
use std::sync::OnceLock;

/// Output format
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportFormat {
    Human,
    Json,
}

/// Output destination
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportDestination {
    Stderr,
    File(String),
}

/// Parsed report configuration
#[derive(Clone, Debug)]
pub struct ReportConfig {
    pub format: ReportFormat,
    pub destination: ReportDestination,
}

impl ReportConfig {
    /// Parse a `TERN_REPORT` value. `None` disables the report.
    pub fn parse(value: &str) -> Option<ReportConfig> {
        match value {
            "" | "0" => None,
            "1" => Some(ReportConfig {
                format: ReportFormat::Human,
                destination: ReportDestination::Stderr,
            }),
            "json" => Some(ReportConfig {
                format: ReportFormat::Json,
                destination: ReportDestination::Stderr,
            }),
            s if s.starts_with("json:") => Some(ReportConfig {
                format: ReportFormat::Json,
                destination: ReportDestination::File(s[5..].to_string()),
            }),
            other => {
                eprintln!("Warning: TERN_REPORT='{}' not recognized, ignoring", other);
                None
            }
        }
    }

    /// Read the configuration from the environment.
    pub fn from_env() -> Option<ReportConfig> {
        ReportConfig::parse(&std::env::var("TERN_REPORT").unwrap_or_default())
    }
}

static REPORT_CONFIG: OnceLock<Option<ReportConfig>> = OnceLock::new();

fn get_report_config() -> &'static Option<ReportConfig> {
    REPORT_CONFIG.get_or_init(ReportConfig::from_env)
}

fn format_human(stats: &MemorySnapshot) -> String {
    let mut out = String::new();
    out.push_str("=== TERN REPORT ===\n");
    out.push_str(&format!("Live objects:     {}\n", stats.live_objects));
    out.push_str(&format!("Live bytes:       {}\n", stats.live_bytes));
    out.push_str(&format!("Peak bytes:       {}\n", stats.peak_bytes));
    out.push_str(&format!("Allocations:      {}\n", stats.total_allocations));
    out.push_str(&format!("Interned strings: {}\n", stats.interned_strings));
    out.push_str("===================\n");
    out
}

#[cfg(feature = "report-json")]
fn format_json(stats: &MemorySnapshot) -> String {
    serde_json::to_string(stats).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(not(feature = "report-json"))]
fn format_json(stats: &MemorySnapshot) -> String {
    eprintln!(
        "Warning: TERN_REPORT=json requires the 'report-json' feature. Falling back to human format."
    );
    format_human(stats)
}

/// Emit the at-exit report, if `TERN_REPORT` asks for one.
///
/// Hosts call this once after the last interpreter tick; with the env var
/// unset it returns immediately.
pub fn emit_report() {
    let config = match get_report_config() {
        Some(c) => c,
        None => return,
    };

    let stats = memory_stats::snapshot();
    let output = match config.format {
        ReportFormat::Human => format_human(&stats),
        ReportFormat::Json => format_json(&stats),
    };

    match &config.destination {
        ReportDestination::Stderr => {
            let _ = std::io::stderr().write_all(output.as_bytes());
        }
        ReportDestination::File(path) => {
            if let Ok(mut f) = std::fs::File::create(path) {
                let _ = f.write_all(output.as_bytes());
            } else {
                eprintln!("Warning: could not write report to {}", path);
                let _ = std::io::stderr().write_all(output.as_bytes());
            }
        }
    }
}
