//! Testing utilities including a scripted vacancy source.
//!
//! Lets pipeline tests run against canned pages and injected failures
//! without touching the network.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use hh_client::{HhError, KeySkill, SearchQuery, VacancyDetail, VacancyItem, VacancyPage};

use crate::source::VacancySource;

/// A [`VacancySource`] that serves pre-scripted pages.
///
/// Failures queued for a page are returned first, one per request, before
/// the page itself is served.
#[derive(Default, Clone)]
pub struct MockSource {
    /// Pages by page index
    pages: Arc<RwLock<HashMap<u32, VacancyPage>>>,

    /// Pending failures by page index
    page_failures: Arc<RwLock<HashMap<u32, VecDeque<HhError>>>>,

    /// Key skills by vacancy id
    details: Arc<RwLock<HashMap<String, Vec<String>>>>,

    /// Pending failures by vacancy id
    detail_failures: Arc<RwLock<HashMap<String, VecDeque<HhError>>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<MockSourceCall>>>,
}

/// Record of a call made to the mock source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockSourceCall {
    FetchPage { page: u32, per_page: u32 },
    FetchVacancy { id: String },
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` for requests with `page.page` as the page index.
    pub fn with_page(self, page: VacancyPage) -> Self {
        self.pages.write().unwrap().insert(page.page, page);
        self
    }

    pub fn with_pages(self, pages: impl IntoIterator<Item = VacancyPage>) -> Self {
        {
            let mut map = self.pages.write().unwrap();
            for page in pages {
                map.insert(page.page, page);
            }
        }
        self
    }

    /// Fail the next request for page `index` with `err`.
    pub fn with_page_failure(self, index: u32, err: HhError) -> Self {
        self.page_failures
            .write()
            .unwrap()
            .entry(index)
            .or_default()
            .push_back(err);
        self
    }

    pub fn with_detail(self, id: impl Into<String>, skills: &[&str]) -> Self {
        self.details
            .write()
            .unwrap()
            .insert(id.into(), skills.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Fail the next detail request for `id` with `err`.
    pub fn with_detail_failure(self, id: impl Into<String>, err: HhError) -> Self {
        self.detail_failures
            .write()
            .unwrap()
            .entry(id.into())
            .or_default()
            .push_back(err);
        self
    }

    /// Get all calls made to this source.
    pub fn calls(&self) -> Vec<MockSourceCall> {
        self.calls.read().unwrap().clone()
    }

    /// Page indexes requested, in order, including retries.
    pub fn requested_pages(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                MockSourceCall::FetchPage { page, .. } => Some(page),
                MockSourceCall::FetchVacancy { .. } => None,
            })
            .collect()
    }
}

#[async_trait]
impl VacancySource for MockSource {
    async fn fetch_page(&self, query: &SearchQuery) -> hh_client::Result<VacancyPage> {
        let index = query.page();
        self.calls.write().unwrap().push(MockSourceCall::FetchPage {
            page: index,
            per_page: query.per_page(),
        });

        // Check if should fail
        if let Some(err) = self
            .page_failures
            .write()
            .unwrap()
            .get_mut(&index)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }

        self.pages
            .read()
            .unwrap()
            .get(&index)
            .cloned()
            .ok_or_else(|| HhError::Api {
                status: 404,
                message: format!("no scripted page {}", index),
            })
    }

    async fn fetch_vacancy(&self, id: &str) -> hh_client::Result<VacancyDetail> {
        self.calls
            .write()
            .unwrap()
            .push(MockSourceCall::FetchVacancy { id: id.to_string() });

        if let Some(err) = self
            .detail_failures
            .write()
            .unwrap()
            .get_mut(id)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }

        let skills = self
            .details
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| HhError::Api {
                status: 404,
                message: format!("no scripted vacancy {}", id),
            })?;

        Ok(VacancyDetail {
            id: id.to_string(),
            name: String::new(),
            key_skills: skills.into_iter().map(|name| KeySkill { name }).collect(),
        })
    }
}

/// Build `pages` full result pages for a search reporting `found` matches.
///
/// Item ids run 1, 2, 3, ... across pages; names are `Vacancy <id>`.
pub fn generate_pages(found: u64, per_page: u32, pages: u32) -> Vec<VacancyPage> {
    (0..pages)
        .map(|index| {
            let start = u64::from(index) * u64::from(per_page);
            let end = (start + u64::from(per_page)).min(found);
            VacancyPage {
                items: (start..end)
                    .map(|n| VacancyItem::new((n + 1).to_string(), format!("Vacancy {}", n + 1)))
                    .collect(),
                found,
                pages,
                per_page,
                page: index,
            }
        })
        .collect()
}
