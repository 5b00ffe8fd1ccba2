//! Alert persistence and export.
//!
//! Three artifacts:
//! - **alerts JSONL**: one alert per line, the run's hand-off to the alert sink
//! - **run report JSON**: the full [`ScanReport`], skips included
//! - **latest JSON**: top alerts re-ranked from a JSONL file, for publishing
//!
//! Writers create parent directories and truncate existing files.

use std::fs;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use scanlab_core::domain::Alert;
use scanlab_core::scoring::select;

use crate::runner::ScanReport;

/// Default cap on published alerts.
pub const DEFAULT_PUBLISH_MAX: usize = 20;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

// ─── JSONL ──────────────────────────────────────────────────────────

/// Write alerts as JSON Lines, in the given order.
pub fn save_alerts_jsonl(alerts: &[Alert], path: &Path) -> Result<PathBuf> {
    ensure_parent(path)?;
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for alert in alerts {
        let line = serde_json::to_string(alert).context("failed to serialize alert")?;
        writeln!(out, "{line}")?;
    }
    out.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(path.to_path_buf())
}

/// Read alerts from JSON Lines.
///
/// A missing file is an empty list. Blank lines are skipped; a malformed line
/// is an error naming its line number.
pub fn read_alerts_jsonl(path: &Path) -> Result<Vec<Alert>> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("failed to open {}", path.display())),
    };

    let mut alerts = Vec::new();
    for (i, line) in io::BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let alert = serde_json::from_str(line)
            .with_context(|| format!("{} line {}: invalid alert", path.display(), i + 1))?;
        alerts.push(alert);
    }
    Ok(alerts)
}

// ─── Run report ─────────────────────────────────────────────────────

pub fn save_report_json(report: &ScanReport, path: &Path) -> Result<PathBuf> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(report).context("failed to serialize ScanReport")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path.to_path_buf())
}

// ─── Publish latest ─────────────────────────────────────────────────

/// Payload of the published "latest" file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestPayload {
    pub generated_at_utc: DateTime<Utc>,
    pub alerts: Vec<Alert>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<Value>,
}

/// Report attachment: the parsed file, an error marker if it does not parse,
/// or nothing when the file is absent.
fn load_report_value(path: &Path) -> Option<Value> {
    let text = fs::read_to_string(path).ok()?;
    Some(
        serde_json::from_str(&text)
            .unwrap_or_else(|_| serde_json::json!({ "error": "failed_to_parse_report" })),
    )
}

/// Re-rank the alerts in `input` by total (stable, descending), keep `max`,
/// and write them with an optional report to `output` as pretty JSON.
pub fn publish_latest(
    input: &Path,
    output: &Path,
    max: usize,
    report: Option<&Path>,
) -> Result<LatestPayload> {
    let alerts = read_alerts_jsonl(input)?;
    let payload = LatestPayload {
        generated_at_utc: Utc::now(),
        alerts: select(alerts, f64::NEG_INFINITY, max, Alert::total),
        report: report.and_then(load_report_value),
    };

    ensure_parent(output)?;
    let json = serde_json::to_string_pretty(&payload).context("failed to serialize payload")?;
    fs::write(output, json).with_context(|| format!("failed to write {}", output.display()))?;
    Ok(payload)
}

// ─── Console summary ────────────────────────────────────────────────

/// One line per alert: `- SYMBOL SETUP score=TOTAL action=ACTION`.
pub fn alert_line(alert: &Alert) -> String {
    format!(
        "- {} {} score={} action={}",
        alert.symbol, alert.setup.setup_name, alert.scores.total, alert.setup.action
    )
}
