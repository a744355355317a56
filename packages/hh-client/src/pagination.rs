//! Page-by-page driver for a search.
//!
//! The API never serves more than [`RESULT_CEILING`] results for one search,
//! whatever `found` says, so the paginator stops on its own instead of
//! spending requests on pages the server will refuse.

use crate::query::SearchQuery;
use crate::types::VacancyPage;

/// Hard cap on `page * per_page` enforced by the API.
pub const RESULT_CEILING: u64 = 2000;

#[derive(Debug, Clone)]
pub struct Paginator {
    base: SearchQuery,
    next_page: Option<u32>,
    total_pages: Option<u32>,
    max_pages: Option<u32>,
    ceiling: u64,
    accepted: u64,
}

impl Paginator {
    pub fn new(query: SearchQuery) -> Self {
        let first = query.page();
        let mut paginator = Self {
            base: query,
            next_page: Some(first),
            total_pages: None,
            max_pages: None,
            ceiling: RESULT_CEILING,
            accepted: 0,
        };
        paginator.drop_unreachable_start();
        paginator
    }

    /// Lower the result ceiling. Values above [`RESULT_CEILING`] are clamped.
    pub fn with_ceiling(mut self, ceiling: u64) -> Self {
        self.ceiling = ceiling.min(RESULT_CEILING);
        self.drop_unreachable_start();
        self
    }

    /// Stop after this many pages have been requested.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Number of records accepted so far.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// The next request to send, or `None` once the search is exhausted.
    pub fn next_query(&self) -> Option<SearchQuery> {
        self.next_page.map(|page| self.base.with_page(page))
    }

    /// Record a fetched page.
    ///
    /// Returns how many leading items of `page.items` fall under the ceiling;
    /// the caller must ignore the rest.
    pub fn advance(&mut self, page: &VacancyPage) -> usize {
        let Some(current) = self.next_page else {
            return 0;
        };
        self.total_pages = Some(page.pages);

        let room = self.ceiling.saturating_sub(self.accepted);
        let take = (page.items.len() as u64).min(room) as usize;
        self.accepted += take as u64;

        let exhausted = page.found == 0 || page.items.is_empty() || self.accepted >= self.ceiling;
        self.next_page = if exhausted {
            None
        } else {
            self.following(current)
        };
        take
    }

    /// Move past a page that could not be fetched.
    ///
    /// Only possible once a previous page has reported the total page count;
    /// a failed first page ends the search.
    pub fn skip(&mut self) {
        self.next_page = match (self.next_page, self.total_pages) {
            (Some(current), Some(_)) => self.following(current),
            _ => None,
        };
    }

    /// A starting page past the ceiling would only be refused by the server.
    fn drop_unreachable_start(&mut self) {
        if matches!(self.next_page, Some(page) if page >= self.ceiling_pages()) {
            self.next_page = None;
        }
    }

    fn following(&self, current: u32) -> Option<u32> {
        let next = current.checked_add(1)?;
        let total = self.total_pages?;
        if next >= total || next >= self.ceiling_pages() {
            return None;
        }
        if let Some(max) = self.max_pages {
            let requested = next - self.base.page();
            if requested >= max {
                return None;
            }
        }
        Some(next)
    }

    /// First page index the server would refuse because of the ceiling.
    fn ceiling_pages(&self) -> u32 {
        let per_page = u64::from(self.base.per_page().max(1));
        let pages = self.ceiling.div_ceil(per_page);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}
