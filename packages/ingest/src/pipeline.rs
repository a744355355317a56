//! Fetch-normalize-store loop.
//!
//! Strictly sequential: a page is fully written before the next request goes
//! out, so an abort never leaves a fetched page half-stored.

use hh_client::{HhError, Paginator, SearchQuery, VacancyItem, RESULT_CEILING};
use vacancy_store::{normalize_skills, Listing, SqliteStore, StoreError, UpsertOutcome};

use crate::error::{IngestError, Result};
use crate::normalize::normalize;
use crate::retry::RetryPolicy;
use crate::source::VacancySource;
use crate::summary::RunSummary;

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub retry: RetryPolicy,
    /// Ask the detail endpoint for key skills of every stored item.
    pub fetch_skills: bool,
    /// Listings whose name contains any of these (case-insensitive) are dropped.
    pub exclude_keywords: Vec<String>,
    /// A match in the name or requirement snippet keeps a listing that an
    /// exclude keyword would drop.
    pub include_keywords: Vec<String>,
    /// Page budget per query.
    pub max_pages: Option<u32>,
    /// Records accepted per query, at most [`RESULT_CEILING`].
    pub result_ceiling: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            fetch_skills: false,
            exclude_keywords: Vec::new(),
            include_keywords: Vec::new(),
            max_pages: None,
            result_ceiling: RESULT_CEILING,
        }
    }
}

/// What happened to one item.
enum ItemOutcome {
    Stored(UpsertOutcome),
    Skipped,
}

pub struct Pipeline<S> {
    source: S,
    store: SqliteStore,
    options: PipelineOptions,
    summary: RunSummary,
}

impl<S: VacancySource> Pipeline<S> {
    pub fn new(source: S, store: SqliteStore, mut options: PipelineOptions) -> Self {
        options.exclude_keywords = lowercase_keywords(&options.exclude_keywords);
        options.include_keywords = lowercase_keywords(&options.include_keywords);
        Self {
            source,
            store,
            options,
            summary: RunSummary::default(),
        }
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn into_summary(self) -> RunSummary {
        self.summary
    }

    /// Run every query in order. Stops at the first unrecoverable failure;
    /// whatever was stored before it stays stored.
    pub async fn run(&mut self, queries: &[SearchQuery]) -> Result<()> {
        for query in queries {
            if let Err(err) = self.run_query(query).await {
                self.summary.aborted = true;
                tracing::error!(error = %err, "Ingestion aborted");
                return Err(err);
            }
        }
        tracing::info!(
            queries = self.summary.queries,
            stored = self.summary.records_stored,
            skipped = self.summary.records_skipped,
            pages_skipped = self.summary.pages_skipped,
            "Ingestion finished"
        );
        Ok(())
    }

    /// Walk all pages of one query.
    pub async fn run_query(&mut self, query: &SearchQuery) -> Result<()> {
        self.summary.queries += 1;
        tracing::info!(%query, "Starting query");

        let mut pages = Paginator::new(query.clone()).with_ceiling(self.options.result_ceiling);
        if let Some(max_pages) = self.options.max_pages {
            pages = pages.with_max_pages(max_pages);
        }

        while let Some(request) = pages.next_query() {
            let source = &self.source;
            let fetched = self
                .options
                .retry
                .run(|| source.fetch_page(&request), &mut self.summary.retries)
                .await;

            let page = match fetched {
                Ok(page) => page,
                Err(err) => {
                    self.summary.record_error(&err);
                    if let HhError::AuthFailed { .. } = err {
                        return Err(IngestError::AuthFailed(err));
                    }
                    tracing::warn!(page = request.page(), error = %err, "Skipping page");
                    self.summary.pages_skipped += 1;
                    pages.skip();
                    continue;
                }
            };

            self.summary.pages_fetched += 1;
            let take = pages.advance(&page);
            tracing::debug!(
                page = page.page,
                pages = page.pages,
                found = page.found,
                items = page.items.len(),
                take,
                "Fetched page"
            );

            for item in &page.items[..take] {
                match self.process_item(item).await? {
                    ItemOutcome::Stored(outcome) => {
                        self.summary.records_stored += 1;
                        if outcome == UpsertOutcome::Replaced {
                            self.summary.records_replaced += 1;
                        }
                    }
                    ItemOutcome::Skipped => self.summary.records_skipped += 1,
                }
            }
        }

        tracing::info!(%query, accepted = pages.accepted(), "Query finished");
        Ok(())
    }

    async fn process_item(&mut self, item: &VacancyItem) -> Result<ItemOutcome> {
        let (listing, mut skills) = match normalize(item) {
            Ok(normalized) => normalized,
            Err(err) => {
                tracing::debug!(id = %item.id, error = %err, "Skipping invalid item");
                self.summary.record_error(&err);
                return Ok(ItemOutcome::Skipped);
            }
        };

        if self.is_excluded(&listing) {
            tracing::debug!(id = listing.id, name = %listing.name, "Excluded by keyword");
            return Ok(ItemOutcome::Skipped);
        }

        if self.options.fetch_skills {
            match self.fetch_skills(&item.id).await? {
                Some(detailed) => skills = detailed,
                None => return Ok(ItemOutcome::Skipped),
            }
        }

        match self.store.upsert_listing(&listing, &skills).await {
            Ok(outcome) => Ok(ItemOutcome::Stored(outcome)),
            Err(err) => self.store_failure(listing.id, err),
        }
    }

    /// Key skills from the detail endpoint; `None` skips the record.
    async fn fetch_skills(&mut self, id: &str) -> Result<Option<Vec<String>>> {
        let source = &self.source;
        let fetched = self
            .options
            .retry
            .run(|| source.fetch_vacancy(id), &mut self.summary.retries)
            .await;

        match fetched {
            Ok(detail) => Ok(Some(normalize_skills(&detail.skill_names()))),
            Err(err) => {
                self.summary.record_error(&err);
                if let HhError::AuthFailed { .. } = err {
                    return Err(IngestError::AuthFailed(err));
                }
                tracing::warn!(id, error = %err, "Could not fetch key skills, skipping record");
                Ok(None)
            }
        }
    }

    fn store_failure(&mut self, id: i64, err: StoreError) -> Result<ItemOutcome> {
        self.summary.record_error(&err);
        if err.is_fatal() {
            return Err(IngestError::StorageUnavailable(err));
        }
        tracing::warn!(id, error = %err, "Store rejected listing, skipping record");
        Ok(ItemOutcome::Skipped)
    }

    fn is_excluded(&self, listing: &Listing) -> bool {
        if self.options.exclude_keywords.is_empty() {
            return false;
        }
        let name = listing.name.to_lowercase();
        let excluded = self
            .options
            .exclude_keywords
            .iter()
            .any(|word| name.contains(word.as_str()));
        if !excluded {
            return false;
        }

        let requirement = listing
            .snippet_requirement
            .as_deref()
            .unwrap_or_default()
            .to_lowercase();
        !self
            .options
            .include_keywords
            .iter()
            .any(|word| name.contains(word.as_str()) || requirement.contains(word.as_str()))
    }
}

fn lowercase_keywords(words: &[String]) -> Vec<String> {
    words
        .iter()
        .map(|word| word.trim().to_lowercase())
        .filter(|word| !word.is_empty())
        .collect()
}
