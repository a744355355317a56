//! Typed search query for `GET /vacancies`.
//!
//! Codes are validated when the query is built and every value goes through
//! [`url::Url::query_pairs_mut`], so free text never reaches the request line
//! unescaped.

use chrono::NaiveDate;
use url::Url;

use crate::error::QueryError;

/// Largest page size the API accepts.
pub const MAX_PER_PAGE: u32 = 100;

/// Sort orders understood by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderBy {
    PublicationTime,
    SalaryDesc,
    SalaryAsc,
    Relevance,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::PublicationTime => "publication_time",
            OrderBy::SalaryDesc => "salary_desc",
            OrderBy::SalaryAsc => "salary_asc",
            OrderBy::Relevance => "relevance",
        }
    }
}

/// A validated vacancy search. Build with [`SearchQuery::builder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    professional_role: Option<String>,
    area: Option<String>,
    industry: Option<String>,
    text: Option<String>,
    date_from: Option<NaiveDate>,
    order_by: Option<OrderBy>,
    per_page: u32,
    page: u32,
}

impl SearchQuery {
    pub fn builder() -> SearchQueryBuilder {
        SearchQueryBuilder::default()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn professional_role(&self) -> Option<&str> {
        self.professional_role.as_deref()
    }

    pub fn area(&self) -> Option<&str> {
        self.area.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The same search pointed at another page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// Query parameters in the order they are sent.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(8);
        if let Some(role) = &self.professional_role {
            pairs.push(("professional_role", role.clone()));
        }
        if let Some(area) = &self.area {
            pairs.push(("area", area.clone()));
        }
        if let Some(industry) = &self.industry {
            pairs.push(("industry", industry.clone()));
        }
        if let Some(text) = &self.text {
            pairs.push(("text", text.clone()));
        }
        if let Some(date_from) = &self.date_from {
            pairs.push(("date_from", date_from.format("%Y-%m-%d").to_string()));
        }
        if let Some(order_by) = &self.order_by {
            pairs.push(("order_by", order_by.as_str().to_string()));
        }
        pairs.push(("per_page", self.per_page.to_string()));
        pairs.push(("page", self.page.to_string()));
        pairs
    }

    /// Append the encoded parameters to an endpoint URL.
    pub fn apply_to(&self, url: &mut Url) {
        let mut query = url.query_pairs_mut();
        for (key, value) in self.to_pairs() {
            query.append_pair(key, &value);
        }
    }
}

/// Short human-readable label used in logs.
impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "role={} area={} text={:?} page={}",
            self.professional_role.as_deref().unwrap_or("*"),
            self.area.as_deref().unwrap_or("*"),
            self.text.as_deref().unwrap_or(""),
            self.page
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchQueryBuilder {
    professional_role: Option<String>,
    area: Option<String>,
    industry: Option<String>,
    text: Option<String>,
    date_from: Option<NaiveDate>,
    order_by: Option<OrderBy>,
    per_page: Option<u32>,
    page: u32,
}

impl SearchQueryBuilder {
    pub fn professional_role(mut self, code: impl Into<String>) -> Self {
        self.professional_role = Some(code.into());
        self
    }

    pub fn area(mut self, code: impl Into<String>) -> Self {
        self.area = Some(code.into());
        self
    }

    pub fn industry(mut self, code: impl Into<String>) -> Self {
        self.industry = Some(code.into());
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn date_from(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn build(self) -> Result<SearchQuery, QueryError> {
        let professional_role = self
            .professional_role
            .map(|code| numeric_code("professional_role", code))
            .transpose()?;
        let area = self
            .area
            .map(|code| numeric_code("area", code))
            .transpose()?;
        let industry = self.industry.map(industry_code).transpose()?;

        let text = match self.text {
            Some(text) => {
                let text = text.trim();
                if text.chars().any(char::is_control) {
                    return Err(QueryError::ControlCharacters);
                }
                (!text.is_empty()).then(|| text.to_string())
            }
            None => None,
        };

        let per_page = self.per_page.unwrap_or(MAX_PER_PAGE);
        if per_page == 0 || per_page > MAX_PER_PAGE {
            return Err(QueryError::PageSize {
                value: per_page,
                max: MAX_PER_PAGE,
            });
        }

        Ok(SearchQuery {
            professional_role,
            area,
            industry,
            text,
            date_from: self.date_from,
            order_by: self.order_by,
            per_page,
            page: self.page,
        })
    }
}

fn numeric_code(field: &'static str, code: String) -> Result<String, QueryError> {
    let trimmed = code.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        Ok(trimmed.to_string())
    } else {
        Err(QueryError::InvalidCode { field, value: code })
    }
}

/// Industry codes are either `7` or `7.540`.
fn industry_code(code: String) -> Result<String, QueryError> {
    let trimmed = code.trim();
    let mut parts = trimmed.splitn(2, '.');
    let valid = parts
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
    if valid && !trimmed.is_empty() {
        Ok(trimmed.to_string())
    } else {
        Err(QueryError::InvalidCode {
            field: "industry",
            value: code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let query = SearchQuery::builder().build().unwrap();
        assert_eq!(query.per_page(), MAX_PER_PAGE);
        assert_eq!(query.page(), 0);
        assert_eq!(
            query.to_pairs(),
            vec![("per_page", "100".to_string()), ("page", "0".to_string())]
        );
    }

    #[test]
    fn test_full_query_pairs() {
        let query = SearchQuery::builder()
            .professional_role("96")
            .area(" 2 ")
            .industry("7.540")
            .text("сварщик")
            .date_from(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
            .order_by(OrderBy::PublicationTime)
            .per_page(50)
            .page(3)
            .build()
            .unwrap();

        assert_eq!(
            query.to_pairs(),
            vec![
                ("professional_role", "96".to_string()),
                ("area", "2".to_string()),
                ("industry", "7.540".to_string()),
                ("text", "сварщик".to_string()),
                ("date_from", "2024-01-01".to_string()),
                ("order_by", "publication_time".to_string()),
                ("per_page", "50".to_string()),
                ("page", "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_rejects_non_numeric_codes() {
        let err = SearchQuery::builder()
            .area("1&per_page=1000")
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidCode { field: "area", .. }));

        let err = SearchQuery::builder()
            .professional_role("")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            QueryError::InvalidCode {
                field: "professional_role",
                ..
            }
        ));

        assert!(SearchQuery::builder().industry("7.").build().is_err());
        assert!(SearchQuery::builder().industry("7.5.1").build().is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        assert!(SearchQuery::builder().per_page(0).build().is_err());
        assert!(SearchQuery::builder().per_page(101).build().is_err());
        assert!(SearchQuery::builder().per_page(1).build().is_ok());
    }

    #[test]
    fn test_text_is_trimmed_and_blank_dropped() {
        let query = SearchQuery::builder().text("   ").build().unwrap();
        assert_eq!(query.text(), None);

        let err = SearchQuery::builder().text("a\nb").build().unwrap_err();
        assert_eq!(err, QueryError::ControlCharacters);
    }

    #[test]
    fn test_free_text_is_escaped() {
        let query = SearchQuery::builder()
            .text("C++ & Rust=fast")
            .build()
            .unwrap();
        let mut url = Url::parse("https://api.hh.ru/vacancies").unwrap();
        query.apply_to(&mut url);

        assert_eq!(
            url.query(),
            Some("text=C%2B%2B+%26+Rust%3Dfast&per_page=100&page=0")
        );
        let decoded: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(decoded[0], ("text".to_string(), "C++ & Rust=fast".to_string()));
    }

    #[test]
    fn test_with_page_keeps_filters() {
        let query = SearchQuery::builder().area("1").build().unwrap();
        let next = query.with_page(4);
        assert_eq!(next.page(), 4);
        assert_eq!(next.area(), Some("1"));
    }
}
