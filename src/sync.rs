//! End-to-end run over one entry kind: fetch, filter, resolve, submit, report.
use tracing::{error, info, instrument, warn};

use crate::config::SyncSettings;
use crate::error::SyncError;
use crate::filter::{self, Skip};
use crate::kind::{EntryKind, Hierarchy};
use crate::model::{Entry, References, SubmissionResult};
use crate::publish::{PublishApi, Submitter};
use crate::rate_limit::RateLimiter;
use crate::report::{PreviewItem, ReportBuilder, RunStatus, SyncReport};
use crate::resolve::resolve_routing_key;
use crate::shutdown::Shutdown;
use crate::source::{ContentSource, PageFetcher};

/// Per-run switches, usually straight from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// List what would be submitted and stop before any POST.
    pub dry_run: bool,
    /// Treat every non-archived entry as renderable.
    pub ignore_render_flag: bool,
    /// Cap on raw fetched entries, applied before filtering.
    pub max_entries: Option<usize>,
    /// Set once the operator agreed to push to the publish server.
    pub confirmed: bool,
    pub first_batch_only: bool,
}

impl RunOptions {
    /// True when `ignore_render_flag` is set for a kind that never checks `renderPage`.
    pub fn render_override_unused(&self, kind: &EntryKind) -> bool {
        self.ignore_render_flag && !kind.render_flag
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Fetching,
    Filtering,
    Submitting,
    Reporting,
}

impl Phase {
    fn as_str(&self) -> &'static str {
        match self {
            Phase::Fetching => "fetching",
            Phase::Filtering => "filtering",
            Phase::Submitting => "submitting",
            Phase::Reporting => "reporting",
        }
    }
}

pub struct SyncOrchestrator<'a> {
    source: &'a dyn ContentSource,
    publisher: &'a dyn PublishApi,
    kind: &'a EntryKind,
    settings: SyncSettings,
    shutdown: Shutdown,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        source: &'a dyn ContentSource,
        publisher: &'a dyn PublishApi,
        kind: &'a EntryKind,
        settings: SyncSettings,
    ) -> Self {
        Self {
            source,
            publisher,
            kind,
            settings,
            shutdown: Shutdown::new(),
        }
    }

    pub fn interruptible(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn enter(&self, phase: Phase) {
        info!(kind = %self.kind.name, phase = phase.as_str(), "sync phase");
    }

    /// Run the whole pipeline once.
    ///
    /// Only preflight and fetch failures are fatal; per-entry failures end up
    /// in the returned report.
    #[instrument(skip_all, fields(kind = %self.kind.name))]
    pub async fn run(&self, options: &RunOptions) -> Result<SyncReport, SyncError> {
        let mut report = ReportBuilder::new(&self.kind.name);
        info!(
            run_id = %report.run_id(),
            content_type = %self.kind.content_type,
            dry_run = options.dry_run,
            max_entries = ?options.max_entries,
            "starting sync"
        );

        if options.render_override_unused(self.kind) {
            warn!(
                kind = %self.kind.name,
                "ignore_render_flag has no effect: this kind does not filter on renderPage"
            );
        }

        if self.settings.preflight && !options.dry_run {
            self.preflight().await?;
        }

        self.enter(Phase::Fetching);
        let fetched = PageFetcher::new(self.source, self.kind, self.settings.page_size)
            .max_entries(options.max_entries)
            .page_delay(self.settings.page_delay())
            .interruptible(self.shutdown.clone())
            .fetch_all()
            .await
            .map_err(|source| {
                error!(error = %source, "fetching entries failed");
                SyncError::Fetch {
                    content_type: self.kind.content_type.clone(),
                    source,
                }
            })?;
        report.fetched(fetched.entries.len());
        info!(
            fetched = fetched.entries.len(),
            pages = fetched.pages,
            duplicates = fetched.duplicates,
            references = fetched.references.len(),
            "fetch complete"
        );
        if self.shutdown.is_requested() {
            return Ok(self.interrupted(report));
        }

        self.enter(Phase::Filtering);
        let eligible = self.filter(fetched.entries, options, &mut report);
        report.eligible(eligible.len());
        if eligible.is_empty() {
            info!("no eligible entries");
            return Ok(report.finish(RunStatus::NoEntries));
        }

        if options.dry_run {
            for entry in &eligible {
                report.preview(self.preview_item(entry, &fetched.references));
            }
            info!(would_submit = eligible.len(), "dry run, nothing submitted");
            return Ok(report.finish(RunStatus::DryRun));
        }
        if !options.confirmed {
            warn!(eligible = eligible.len(), "sync not confirmed, nothing submitted");
            return Ok(report.finish(RunStatus::NotConfirmed));
        }

        self.enter(Phase::Submitting);
        let submitter = Submitter::new(self.publisher, self.kind, &self.settings)
            .interruptible(self.shutdown.clone());
        let limiter = RateLimiter::from_settings(&self.settings, self.shutdown.clone());
        let batch_size = self.settings.batch_size.max(1);
        let total_batches = eligible.len().div_ceil(batch_size);

        for (index, batch) in eligible.chunks(batch_size).enumerate() {
            let batch_num = index + 1;
            let final_batch = options.first_batch_only || batch_num == total_batches;
            info!(batch = batch_num, total_batches, size = batch.len(), "processing batch");

            for (position, entry) in batch.iter().enumerate() {
                if self.shutdown.is_requested() {
                    return Ok(self.interrupted(report));
                }
                self.log_context(entry);
                let routing_key = self.routing_key(entry, &fetched.references);
                let result = submitter.submit(entry, routing_key.as_deref()).await;
                log_outcome(&result);
                report.record(&result);

                let last_in_run = final_batch && position + 1 == batch.len();
                if !last_in_run && !limiter.between_items().await {
                    return Ok(self.interrupted(report));
                }
            }

            if options.first_batch_only {
                info!("first batch only, stopping");
                break;
            }
            if batch_num < total_batches && !limiter.between_batches().await {
                return Ok(self.interrupted(report));
            }
        }

        self.enter(Phase::Reporting);
        let report = report.finish(RunStatus::Completed);
        info!(
            processed = report.total_processed,
            succeeded = report.succeeded,
            failed = report.failed,
            "sync complete"
        );
        Ok(report)
    }

    async fn preflight(&self) -> Result<(), SyncError> {
        match self.publisher.probe(self.settings.preflight_timeout()).await {
            Ok(res) if res.status == 200 => {
                info!("publish server reachable");
                Ok(())
            }
            Ok(res) => {
                error!(status = res.status, "publish server not responding correctly");
                Err(SyncError::Preflight(format!("HTTP {}", res.status)))
            }
            Err(err) => {
                error!(error = %err, "cannot reach publish server");
                Err(SyncError::Preflight(err.message))
            }
        }
    }

    fn filter(&self, entries: Vec<Entry>, options: &RunOptions, report: &mut ReportBuilder) -> Vec<Entry> {
        entries
            .into_iter()
            .filter(|entry| {
                match filter::check(entry, self.kind.render_flag, options.ignore_render_flag) {
                    Ok(()) => true,
                    Err(Skip::Archived) => {
                        info!(entry_id = %entry.id, title = entry.title(), "skipping archived entry");
                        report.skipped_archived();
                        false
                    }
                    Err(Skip::NotRenderable) => {
                        info!(entry_id = %entry.id, title = entry.title(), "skipping entry without renderPage");
                        report.skipped_not_renderable();
                        false
                    }
                }
            })
            .collect()
    }

    fn routing_key(&self, entry: &Entry, references: &References) -> Option<String> {
        let relationship = self.kind.relationship.as_ref()?;
        let key = resolve_routing_key(entry, relationship, references);
        if key.is_none() {
            warn!(entry_id = %entry.id, field = %relationship.field, "could not resolve routing key");
        }
        key
    }

    fn preview_item(&self, entry: &Entry, references: &References) -> PreviewItem {
        let routing_key = self.routing_key(entry, references);
        let hierarchy = self.kind.hierarchy(entry);
        PreviewItem {
            entry_id: entry.id.clone(),
            title: entry.title().to_string(),
            path: self.kind.target_path(entry, routing_key.as_deref()),
            routing_key,
            hierarchy_level: hierarchy.as_ref().map(Hierarchy::level),
            parent_id: hierarchy.and_then(|h| h.parent_id),
            has_downstream_id: entry.has_downstream_id(),
        }
    }

    fn log_context(&self, entry: &Entry) {
        match self.kind.hierarchy(entry) {
            Some(h) => info!(
                entry_id = %entry.id,
                title = entry.title(),
                level = h.level(),
                parent_id = ?h.parent_id,
                "processing entry"
            ),
            None => info!(entry_id = %entry.id, title = entry.title(), "processing entry"),
        }
    }

    fn interrupted(&self, report: ReportBuilder) -> SyncReport {
        warn!("sync interrupted, returning partial report");
        report.finish(RunStatus::Interrupted)
    }
}

fn log_outcome(result: &SubmissionResult) {
    if result.success {
        info!(
            entry_id = %result.entry_id,
            action = result.action.as_str(),
            identifier = ?result.identifier,
            "submitted"
        );
    } else {
        warn!(
            entry_id = %result.entry_id,
            http_status = ?result.http_status,
            attempts = result.attempts,
            error = result.error_text(),
            "submission failed"
        );
    }
}
