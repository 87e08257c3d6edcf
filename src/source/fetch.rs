//! Skip/limit pagination over the entries endpoint.
use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::kind::EntryKind;
use crate::model::{Entry, References};
use crate::shutdown::Shutdown;
use crate::source::{ContentSource, EntryPage, PageQuery};

/// Hard cap the source enforces on `limit`.
pub const MAX_PAGE_SIZE: usize = 100;

/// Everything a full pagination pass produced.
#[derive(Debug, Clone, Default)]
pub struct FetchedEntries {
    pub entries: Vec<Entry>,
    /// Side-loaded entries from every page, used for relationship resolution.
    pub references: References,
    pub pages: usize,
    pub duplicates: usize,
}

/// Lazy, single-use cursor over the pages of one content type.
///
/// Each fetcher performs fresh network pagination; it cannot be rewound.
pub struct PageFetcher<'a> {
    source: &'a dyn ContentSource,
    kind: &'a EntryKind,
    page_size: usize,
    max_entries: Option<usize>,
    page_delay: Duration,
    shutdown: Shutdown,
    skip: usize,
    fetched: usize,
    pages: usize,
    seen: HashSet<String>,
    duplicates: usize,
    done: bool,
}

impl<'a> PageFetcher<'a> {
    pub fn new(source: &'a dyn ContentSource, kind: &'a EntryKind, page_size: usize) -> Self {
        Self {
            source,
            kind,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            max_entries: None,
            page_delay: Duration::ZERO,
            shutdown: Shutdown::new(),
            skip: 0,
            fetched: 0,
            pages: 0,
            seen: HashSet::new(),
            duplicates: 0,
            done: false,
        }
    }

    pub fn max_entries(mut self, max_entries: Option<usize>) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Courtesy pause between consecutive page requests.
    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    pub fn interruptible(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn query(&self) -> PageQuery {
        PageQuery {
            content_type: self.kind.content_type.clone(),
            skip: self.skip,
            limit: self.page_size,
            include: self.kind.include,
            order: self.kind.order.clone(),
            select: self.kind.select.clone(),
        }
    }

    /// Fetch the next page, or `None` once pagination has terminated.
    ///
    /// Entries already returned by an earlier page are dropped before the
    /// `max_entries` cap is applied, so the cap counts distinct ids.
    pub async fn next_page(&mut self) -> Result<Option<EntryPage>, SourceError> {
        if self.done {
            return Ok(None);
        }
        if self.max_entries == Some(0) {
            self.done = true;
            return Ok(None);
        }
        if self.pages > 0 && !self.shutdown.sleep(self.page_delay).await {
            debug!("pagination interrupted");
            self.done = true;
            return Ok(None);
        }

        let query = self.query();
        let mut page = self.source.fetch_page(&query).await?;
        self.pages += 1;

        let received = page.entries.len();
        if received == 0 {
            self.done = true;
            return Ok(None);
        }

        self.skip += self.page_size;
        if received < self.page_size {
            self.done = true;
        }

        let seen = &mut self.seen;
        page.entries.retain(|entry| {
            let fresh = seen.insert(entry.id.clone());
            if !fresh {
                warn!(entry_id = %entry.id, "duplicate entry across pages, skipping");
            }
            fresh
        });
        self.duplicates += received - page.entries.len();

        if let Some(max) = self.max_entries {
            let remaining = max.saturating_sub(self.fetched);
            if page.entries.len() >= remaining {
                page.entries.truncate(remaining);
                self.done = true;
            }
        }
        self.fetched += page.entries.len();

        info!(
            content_type = %self.kind.content_type,
            page = self.pages,
            received,
            total_so_far = self.fetched,
            total_available = ?page.total,
            "fetched page"
        );
        Ok(Some(page))
    }

    /// Drain every page into distinct entries plus all side-loaded references.
    pub async fn fetch_all(mut self) -> Result<FetchedEntries, SourceError> {
        let mut out = FetchedEntries::default();
        while let Some(page) = self.next_page().await? {
            out.references.extend(page.includes);
            out.entries.extend(page.entries);
        }
        out.pages = self.pages;
        out.duplicates = self.duplicates;
        Ok(out)
    }
}
