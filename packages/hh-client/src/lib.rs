//! Pure HH.ru vacancies REST API client.
//!
//! A minimal client for the public vacancies API. Supports paginated,
//! filtered search and fetching single vacancies for their key skills.
//! Requests are spaced by a configurable minimum interval and every failure
//! is mapped onto a distinct [`HhError`] class.
//!
//! # Example
//!
//! ```rust,ignore
//! use hh_client::{ClientConfig, HhClient, Paginator, SearchQuery};
//!
//! let client = HhClient::new(ClientConfig::new("your-api-token"))?;
//! let query = SearchQuery::builder().professional_role("96").area("1").build()?;
//!
//! let mut pages = Paginator::new(query);
//! while let Some(request) = pages.next_query() {
//!     let page = client.fetch_page(&request).await?;
//!     let take = pages.advance(&page);
//!     for item in &page.items[..take] {
//!         println!("{} {}", item.id, item.name);
//!     }
//! }
//! ```

pub mod config;
pub mod error;
pub mod pagination;
pub mod query;
pub mod types;

pub use config::ClientConfig;
pub use error::{HhError, QueryError, Result};
pub use pagination::{Paginator, RESULT_CEILING};
pub use query::{OrderBy, SearchQuery, SearchQueryBuilder, MAX_PER_PAGE};
pub use types::{
    Employer, KeySkill, NamedRef, Salary, Snippet, VacancyDetail, VacancyItem, VacancyPage,
};

use std::time::Duration;

use governor::{Quota, RateLimiter};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use url::Url;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

pub struct HhClient {
    client: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
    limiter: Option<DefaultRateLimiter>,
}

impl HhClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            HhError::Config(format!("invalid base URL {:?}: {}", config.base_url, e))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(HhError::Config(format!(
                "base URL must be http(s), got {:?}",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| HhError::Config(format!("invalid user agent: {}", e)))?,
        );
        let mut authorization =
            HeaderValue::from_str(&format!("Bearer {}", config.access_token()))
                .map_err(|e| HhError::Config(format!("invalid access token: {}", e)))?;
        authorization.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, authorization);
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| HhError::Config(e.to_string()))?;

        let limiter = Quota::with_period(config.min_request_interval).map(RateLimiter::direct);

        Ok(Self {
            client,
            base_url,
            config,
            limiter,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch one page of search results.
    pub async fn fetch_page(&self, query: &SearchQuery) -> Result<VacancyPage> {
        let mut url = self.endpoint(&["vacancies"])?;
        query.apply_to(&mut url);

        tracing::debug!(%query, "Fetching vacancy page");
        let page: VacancyPage = self.get_json(url).await?;
        tracing::debug!(
            page = page.page,
            pages = page.pages,
            found = page.found,
            items = page.items.len(),
            "Vacancy page fetched"
        );
        Ok(page)
    }

    /// Fetch a single vacancy. Used for `key_skills`, which search omits.
    pub async fn fetch_vacancy(&self, id: &str) -> Result<VacancyDetail> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(QueryError::InvalidCode {
                field: "vacancy id",
                value: id.to_string(),
            }
            .into());
        }
        let url = self.endpoint(&["vacancies", id])?;
        self.get_json(url).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                HhError::Config(format!("base URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Wait until the minimum request interval has passed.
    async fn throttle(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.throttle().await;

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(HhError::from_transport)?;

        let status = resp.status();
        if !status.is_success() {
            let retry_after = retry_after(resp.headers());
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, retry_after, body));
        }

        let body = resp.text().await.map_err(HhError::from_transport)?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, "Response body did not match the expected shape");
            HhError::MalformedResponse(e.to_string())
        })
    }
}

fn status_error(status: StatusCode, retry_after: Option<Duration>, message: String) -> HhError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HhError::AuthFailed {
            status: status.as_u16(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => {
            tracing::warn!(?retry_after, "API signalled throttling");
            HhError::RateLimited { retry_after }
        }
        s if s.is_server_error() => {
            HhError::TransientNetwork(format!("HTTP {}: {}", s.as_u16(), message))
        }
        s => HhError::Api {
            status: s.as_u16(),
            message,
        },
    }
}

/// `Retry-After` in its delta-seconds form.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, None, String::new()),
            HhError::AuthFailed { status: 401, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, None, String::new()),
            HhError::AuthFailed { status: 403, .. }
        ));
        assert!(matches!(
            status_error(
                StatusCode::TOO_MANY_REQUESTS,
                Some(Duration::from_secs(3)),
                String::new()
            ),
            HhError::RateLimited { retry_after: Some(d) } if d == Duration::from_secs(3)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, None, String::new()),
            HhError::TransientNetwork(_)
        ));
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, None, "bad".into()),
            HhError::Api { status: 400, .. }
        ));
    }

    #[test]
    fn test_retry_after_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(retry_after(&headers), None);

        headers.insert(header::RETRY_AFTER, HeaderValue::from_static(" 8 "));
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(8)));

        headers.insert(
            header::RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(retry_after(&headers), None);
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let config = ClientConfig::new("t").with_base_url("http://localhost:8080/api/");
        let client = HhClient::new(config).unwrap();
        let url = client.endpoint(&["vacancies", "42"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/vacancies/42");

        let client = HhClient::new(ClientConfig::new("t")).unwrap();
        let url = client.endpoint(&["vacancies"]).unwrap();
        assert_eq!(url.as_str(), "https://api.hh.ru/vacancies");
    }

    #[test]
    fn test_rejects_bad_configuration() {
        assert!(matches!(
            HhClient::new(ClientConfig::new("t").with_base_url("not a url")),
            Err(HhError::Config(_))
        ));
        assert!(matches!(
            HhClient::new(ClientConfig::new("t").with_base_url("ftp://example.com")),
            Err(HhError::Config(_))
        ));
        assert!(matches!(
            HhClient::new(ClientConfig::new("line\nbreak")),
            Err(HhError::Config(_))
        ));
    }
}
