//! Run reports.
//!
//! A [`Report`] flattens a [`RunReport`] (and optionally the outcome of
//! applying its plan) into one row per file plus summary counts, and renders
//! it as plain text, JSON, CSV or a standalone HTML page.

use crate::engine::{FileOutcome, RunReport};
use crate::error::{Error, Result};
use crate::matcher::MatchVerdict;
use crate::plan::{ApplyOutcome, ApplyStatus, PlannedAction};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Html,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_files: usize,
    pub failed_reads: usize,
    pub exact: usize,
    pub size_mismatch: usize,
    pub digest_conflict: usize,
    pub unknown: usize,
    pub identification_rate: f64,
    pub planned_renames: usize,
    pub already_named: usize,
    pub conflicts: usize,
    pub applied_renames: usize,
    pub failed_renames: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub path: String,
    pub status: String,
    pub action: String,
    pub record: Option<String>,
    pub game: Option<String>,
    pub database: Option<String>,
    pub size: Option<u64>,
    pub crc32: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub destination: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated_at: String,
    pub dry_run: bool,
    pub summary: ReportSummary,
    pub files: Vec<ReportRow>,
}

impl Report {
    pub fn new(run: &RunReport, applied: Option<&ApplyOutcome>, dry_run: bool) -> Self {
        let apply_by_source: HashMap<&Path, &ApplyStatus> = applied
            .map(|outcome| {
                outcome
                    .results
                    .iter()
                    .map(|result| (result.source.as_path(), &result.status))
                    .collect()
            })
            .unwrap_or_default();

        let mut summary = ReportSummary {
            total_files: run.outcomes.len(),
            ..ReportSummary::default()
        };
        let mut files = Vec::with_capacity(run.outcomes.len());

        for outcome in &run.outcomes {
            let row = match outcome {
                FileOutcome::Failed { path, error } => {
                    summary.failed_reads += 1;
                    ReportRow {
                        path: path.display().to_string(),
                        status: "read_error".to_string(),
                        action: "skipped".to_string(),
                        record: None,
                        game: None,
                        database: None,
                        size: None,
                        crc32: None,
                        md5: None,
                        sha1: None,
                        destination: None,
                        detail: Some(error.clone()),
                    }
                }
                FileOutcome::Planned {
                    digests,
                    size_candidates,
                    entry,
                } => {
                    let mut detail = match &entry.verdict {
                        MatchVerdict::Exact { .. } => {
                            summary.exact += 1;
                            None
                        }
                        MatchVerdict::SizeMismatch { .. } => {
                            summary.size_mismatch += 1;
                            Some(entry.verdict.to_string())
                        }
                        MatchVerdict::DigestConflict { .. } => {
                            summary.digest_conflict += 1;
                            Some(entry.verdict.to_string())
                        }
                        MatchVerdict::Unknown => {
                            summary.unknown += 1;
                            (*size_candidates > 0).then(|| {
                                format!("{} database entries share this size", size_candidates)
                            })
                        }
                    };

                    let (action, destination) = match &entry.action {
                        PlannedAction::Rename { destination } => {
                            summary.planned_renames += 1;
                            ("rename", Some(destination.display().to_string()))
                        }
                        PlannedAction::AlreadyNamed => {
                            summary.already_named += 1;
                            ("already_named", None)
                        }
                        PlannedAction::ReportOnly => ("report_only", None),
                        PlannedAction::Conflict(err) => {
                            summary.conflicts += 1;
                            detail = Some(err.to_string());
                            ("conflict", None)
                        }
                    };

                    match apply_by_source.get(entry.source.as_path()) {
                        Some(ApplyStatus::Renamed) => summary.applied_renames += 1,
                        Some(ApplyStatus::Failed(reason)) => {
                            summary.failed_renames += 1;
                            detail = Some(format!("rename failed: {}", reason));
                        }
                        Some(ApplyStatus::WouldRename) | None => {}
                    }

                    let record = entry.verdict.record();
                    ReportRow {
                        path: entry.source.display().to_string(),
                        status: entry.verdict.label().to_string(),
                        action: action.to_string(),
                        record: record.map(|r| r.name.clone()),
                        game: record.map(|r| r.game.clone()),
                        database: record.map(|r| r.database.clone()),
                        size: Some(digests.size),
                        crc32: Some(digests.crc32.clone()),
                        md5: Some(digests.md5.clone()),
                        sha1: Some(digests.sha1.clone()),
                        destination,
                        detail,
                    }
                }
            };
            files.push(row);
        }

        if summary.total_files > 0 {
            summary.identification_rate = summary.exact as f64 / summary.total_files as f64;
        }

        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            dry_run,
            summary,
            files,
        }
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_string()),
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ReportFormat::Csv => self.to_csv(),
            ReportFormat::Html => Ok(self.to_html()),
        }
    }

    fn to_html(&self) -> String {
        let s = &self.summary;
        let mut html = String::new();

        html.push_str(HTML_HEAD);
        html.push_str("<div class=\"summary\">\n<h2>Summary</h2>\n");
        html.push_str(&format!(
            "<p>Generated {}{}</p>\n",
            escape_html(&self.generated_at),
            if self.dry_run { " (dry run)" } else { "" }
        ));
        html.push_str(&format!("<p>Scanned ROMs: {}</p>\n", s.total_files));
        html.push_str(&format!(
            "<p>Identified ROMs: {} ({:.1}%)</p>\n",
            s.exact,
            s.identification_rate * 100.0
        ));
        html.push_str(&format!(
            "<p>Size mismatches: {}, digest conflicts: {}, unknown: {}, unreadable: {}</p>\n",
            s.size_mismatch, s.digest_conflict, s.unknown, s.failed_reads
        ));
        html.push_str(&format!(
            "<p>Renames planned: {}, already correct: {}, conflicts: {}, applied: {}, failed: {}</p>\n",
            s.planned_renames, s.already_named, s.conflicts, s.applied_renames, s.failed_renames
        ));
        html.push_str("</div>\n<h2>Details</h2>\n<table>\n<tr>");
        for header in ["File", "Status", "Action", "ROM", "Database", "SHA1", "Destination", "Detail"] {
            html.push_str(&format!("<th>{}</th>", header));
        }
        html.push_str("</tr>\n");

        for row in &self.files {
            let class = match row.status.as_str() {
                "exact" => "success",
                "size_mismatch" | "unknown" => "warning",
                _ => "error",
            };
            let cells = [
                Some(row.path.as_str()),
                Some(row.status.as_str()),
                Some(row.action.as_str()),
                row.record.as_deref(),
                row.database.as_deref(),
                row.sha1.as_deref(),
                row.destination.as_deref(),
                row.detail.as_deref(),
            ];
            html.push_str(&format!("<tr class=\"{}\">", class));
            for cell in cells {
                html.push_str(&format!("<td>{}</td>", escape_html(cell.unwrap_or(""))));
            }
            html.push_str("</tr>\n");
        }

        html.push_str("</table>\n</body>\n</html>\n");
        html
    }

    fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in &self.files {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| Error::Report(err.to_string()))?;
        String::from_utf8(bytes).map_err(|err| Error::Report(err.to_string()))
    }
}

const HTML_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>ROM Identification Report</title>
<style>
body { font-family: Arial, sans-serif; margin: 20px; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
th { background-color: #f2f2f2; }
.success { color: green; }
.warning { color: orange; }
.error { color: red; }
.summary { margin: 20px 0; padding: 10px; background-color: #f2f2f2; }
</style>
</head>
<body>
<h1>ROM Identification Report</h1>
"#;

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.summary;
        writeln!(
            f,
            "romident report generated {}{}",
            self.generated_at,
            if self.dry_run { " (dry run)" } else { "" }
        )?;
        writeln!(f, "Scanned {} ROMs", s.total_files)?;
        writeln!(
            f,
            "Identified {} ROMs ({:.1}%)",
            s.exact,
            s.identification_rate * 100.0
        )?;
        writeln!(
            f,
            "Size mismatches: {}, digest conflicts: {}, unknown: {}, unreadable: {}",
            s.size_mismatch, s.digest_conflict, s.unknown, s.failed_reads
        )?;
        writeln!(
            f,
            "{} {} ROMs, already correct: {}, conflicts: {}",
            if self.dry_run { "Would rename" } else { "Renames planned for" },
            s.planned_renames,
            s.already_named,
            s.conflicts
        )?;
        if s.applied_renames > 0 || s.failed_renames > 0 {
            writeln!(
                f,
                "Renamed {} ROMs, {} failed",
                s.applied_renames, s.failed_renames
            )?;
        }
        writeln!(f)?;

        for row in &self.files {
            write!(f, "[{}] {}", row.status, row.path)?;
            if let Some(destination) = &row.destination {
                write!(f, " -> {}", destination)?;
            } else if let Some(record) = &row.record {
                write!(f, " ({})", record)?;
            }
            if let Some(detail) = &row.detail {
                write!(f, ": {}", detail)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
