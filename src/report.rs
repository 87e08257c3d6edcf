//! Aggregation of per-entry outcomes into a run summary.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::model::{Action, SubmissionResult};

/// Failures listed in the console summary before collapsing the rest.
const SHOWN_FAILURES: usize = 10;

/// How the run ended.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    DryRun,
    NoEntries,
    NotConfirmed,
    Interrupted,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::DryRun => "dry run",
            RunStatus::NoEntries => "no eligible entries",
            RunStatus::NotConfirmed => "not confirmed",
            RunStatus::Interrupted => "interrupted",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Failure {
    pub entry_id: String,
    pub title: String,
    pub error: String,
    pub http_status: Option<u16>,
    pub retry_exhausted: bool,
    pub at: DateTime<Utc>,
}

/// One line of a dry-run listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PreviewItem {
    pub entry_id: String,
    pub title: String,
    pub routing_key: Option<String>,
    pub path: String,
    pub hierarchy_level: Option<&'static str>,
    pub parent_id: Option<String>,
    pub has_downstream_id: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub kind: String,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub fetched: usize,
    pub skipped_archived: usize,
    pub skipped_not_renderable: usize,
    pub eligible: usize,
    pub total_processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub created: usize,
    pub updated: usize,
    pub recreated: usize,
    pub failures: Vec<Failure>,
    pub preview: Vec<PreviewItem>,
}

impl SyncReport {
    pub fn success_rate(&self) -> f64 {
        if self.total_processed == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.total_processed as f64 * 100.0
    }

    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self.status {
            RunStatus::DryRun | RunStatus::NotConfirmed => 0,
            RunStatus::Interrupted => 130,
            _ if self.failed > 0 => 1,
            _ => 0,
        }
    }
}

/// Incrementally builds a `SyncReport` while the run progresses.
#[derive(Debug)]
pub struct ReportBuilder {
    report: SyncReport,
}

impl ReportBuilder {
    pub fn new(kind: &str) -> Self {
        let now = Utc::now();
        Self {
            report: SyncReport {
                run_id: Uuid::new_v4(),
                kind: kind.to_string(),
                status: RunStatus::Completed,
                started_at: now,
                finished_at: now,
                fetched: 0,
                skipped_archived: 0,
                skipped_not_renderable: 0,
                eligible: 0,
                total_processed: 0,
                succeeded: 0,
                failed: 0,
                created: 0,
                updated: 0,
                recreated: 0,
                failures: Vec::new(),
                preview: Vec::new(),
            },
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.report.run_id
    }

    pub fn fetched(&mut self, count: usize) {
        self.report.fetched = count;
    }

    pub fn skipped_archived(&mut self) {
        self.report.skipped_archived += 1;
    }

    pub fn skipped_not_renderable(&mut self) {
        self.report.skipped_not_renderable += 1;
    }

    pub fn eligible(&mut self, count: usize) {
        self.report.eligible = count;
    }

    pub fn preview(&mut self, item: PreviewItem) {
        self.report.preview.push(item);
    }

    /// Record the final result for one entry.
    pub fn record(&mut self, result: &SubmissionResult) {
        let r = &mut self.report;
        r.total_processed += 1;
        if result.success {
            r.succeeded += 1;
            match result.action {
                Action::Created => r.created += 1,
                Action::Updated => r.updated += 1,
                Action::Recreated => r.recreated += 1,
                Action::Unknown => {}
            }
        } else {
            r.failed += 1;
            r.failures.push(Failure {
                entry_id: result.entry_id.clone(),
                title: result.title.clone(),
                error: result.error_text().to_string(),
                http_status: result.http_status,
                retry_exhausted: result.retry_exhausted,
                at: Utc::now(),
            });
        }
    }

    pub fn finish(mut self, status: RunStatus) -> SyncReport {
        self.report.status = status;
        self.report.finished_at = Utc::now();
        self.report
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "SYNC RESULTS: {} ({})", self.kind, self.status.as_str())?;
        writeln!(f, "{rule}")?;
        writeln!(
            f,
            "Fetched: {}  eligible: {}  archived: {}  not renderable: {}",
            self.fetched, self.eligible, self.skipped_archived, self.skipped_not_renderable
        )?;

        if self.status == RunStatus::DryRun {
            writeln!(f, "Would submit {} entries:", self.preview.len())?;
            for item in &self.preview {
                write!(f, "  - {} ({}) -> {}", item.title, item.entry_id, item.path)?;
                if let Some(key) = &item.routing_key {
                    write!(f, " [routing key: {key}]")?;
                }
                if let Some(level) = item.hierarchy_level {
                    write!(f, " [{level}]")?;
                }
                if item.has_downstream_id {
                    write!(f, " [has downstream id]")?;
                }
                writeln!(f)?;
            }
            return writeln!(f, "{rule}");
        }

        writeln!(f, "Succeeded: {}", self.succeeded)?;
        writeln!(f, "  created: {}", self.created)?;
        writeln!(f, "  updated: {}", self.updated)?;
        if self.recreated > 0 {
            writeln!(f, "  recreated: {}", self.recreated)?;
        }
        writeln!(f, "Failed: {}", self.failed)?;
        writeln!(f, "Total processed: {}", self.total_processed)?;
        writeln!(f, "Success rate: {:.1}%", self.success_rate())?;

        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "FAILED ENTRIES ({}):", self.failures.len())?;
            for failure in self.failures.iter().take(SHOWN_FAILURES) {
                writeln!(f, "  - {} ({})", failure.title, failure.entry_id)?;
                match failure.http_status {
                    Some(status) => writeln!(f, "    error: HTTP {status}: {}", failure.error)?,
                    None => writeln!(f, "    error: {}", failure.error)?,
                }
            }
            if self.failures.len() > SHOWN_FAILURES {
                writeln!(f, "  ... and {} more", self.failures.len() - SHOWN_FAILURES)?;
            }
        }
        writeln!(f, "{rule}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Entry;

    fn result(id: &str, success: bool, action: Action) -> SubmissionResult {
        let mut r = SubmissionResult::pending(&Entry::new(id).with_title(id), "p");
        r.success = success;
        r.action = action;
        if !success {
            r.error = Some("boom".into());
            r.http_status = Some(500);
        }
        r
    }

    #[test]
    fn counters_and_failures_in_order() {
        let mut builder = ReportBuilder::new("faq");
        builder.record(&result("a", true, Action::Created));
        builder.record(&result("b", false, Action::Unknown));
        builder.record(&result("c", true, Action::Recreated));
        builder.record(&result("d", false, Action::Unknown));
        builder.record(&result("e", true, Action::Unknown));
        let report = builder.finish(RunStatus::Completed);

        assert_eq!(report.total_processed, 5);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 2);
        assert_eq!((report.created, report.updated, report.recreated), (1, 0, 1));
        let ids: Vec<&str> = report.failures.iter().map(|f| f.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d"]);
        assert_eq!(report.failures[0].http_status, Some(500));
        assert!((report.success_rate() - 60.0).abs() < f64::EPSILON);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn exit_codes_by_status() {
        let builder = ReportBuilder::new("article");
        assert_eq!(builder.finish(RunStatus::Completed).exit_code(), 0);

        let mut builder = ReportBuilder::new("article");
        builder.record(&result("x", false, Action::Unknown));
        assert_eq!(builder.finish(RunStatus::DryRun).exit_code(), 0);
        assert_eq!(ReportBuilder::new("article").finish(RunStatus::Interrupted).exit_code(), 130);
    }

    #[test]
    fn display_collapses_long_failure_lists() {
        let mut builder = ReportBuilder::new("recipe");
        for i in 0..12 {
            builder.record(&result(&format!("r{i}"), false, Action::Unknown));
        }
        let text = builder.finish(RunStatus::Completed).to_string();
        assert!(text.contains("FAILED ENTRIES (12)"));
        assert!(text.contains("... and 2 more"));
        assert!(text.contains("HTTP 500: boom"));
    }

    #[test]
    fn display_lists_preview_for_dry_run() {
        let mut builder = ReportBuilder::new("faq");
        builder.preview(PreviewItem {
            entry_id: "f1".into(),
            title: "Watering".into(),
            routing_key: Some("roses".into()),
            path: "render-and-submit-garden-guide/roses/faqs/watering".into(),
            hierarchy_level: None,
            parent_id: None,
            has_downstream_id: true,
        });
        let text = builder.finish(RunStatus::DryRun).to_string();
        assert!(text.contains("Would submit 1 entries"));
        assert!(text.contains("[routing key: roses]"));
        assert!(text.contains("[has downstream id]"));
    }
}
