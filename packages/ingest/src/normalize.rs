//! Mapping from API items to store listings.

use chrono::{DateTime, Utc};
use hh_client::{NamedRef, VacancyItem};
use thiserror::Error;
use vacancy_store::{normalize_skills, Listing};

/// Timestamp layout used by the API, e.g. `2024-01-15T10:30:00+0300`.
const PUBLISHED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

/// Why an item could not become a listing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("item has no id")]
    MissingId,

    #[error("item id {0:?} is not a positive integer")]
    InvalidId(String),

    #[error("item {id} has no name")]
    MissingName { id: i64 },
}

/// Convert one search item into a listing plus its skill names.
pub fn normalize(item: &VacancyItem) -> Result<(Listing, Vec<String>), NormalizeError> {
    let raw_id = item.id.trim();
    if raw_id.is_empty() {
        return Err(NormalizeError::MissingId);
    }
    let id = raw_id
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| NormalizeError::InvalidId(raw_id.to_string()))?;

    let name = item.name.trim();
    if name.is_empty() {
        return Err(NormalizeError::MissingName { id });
    }

    let mut listing = Listing::new(id, name);
    listing.area = ref_name(&item.area);
    listing.experience = ref_name(&item.experience);
    listing.schedule = ref_name(&item.schedule);
    listing.employment = ref_name(&item.employment);

    if let Some(salary) = &item.salary {
        listing.salary_from = salary.from;
        listing.salary_to = salary.to;
        listing.salary_currency = salary.currency.clone();
    }

    listing.employer_name = item.employer.as_ref().and_then(|e| e.name.clone());

    if let Some(snippet) = &item.snippet {
        listing.snippet_requirement = snippet.requirement.as_deref().map(strip_highlight);
        listing.snippet_responsibility = snippet.responsibility.as_deref().map(strip_highlight);
    }

    listing.published_at = item.published_at.as_deref().and_then(|raw| {
        let parsed = parse_published_at(raw);
        if parsed.is_none() {
            tracing::warn!(id, published_at = raw, "Unparseable publication time, leaving empty");
        }
        parsed
    });

    let skill_names: Vec<&str> = item.key_skills.iter().map(|s| s.name.as_str()).collect();
    let skills = normalize_skills(&skill_names);

    Ok((listing.normalized(), skills))
}

fn ref_name(value: &Option<NamedRef>) -> Option<String> {
    value.as_ref().and_then(|r| r.name.clone())
}

pub fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DateTime::parse_from_str(raw, PUBLISHED_AT_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Snippets come with search-term markup: `<highlighttext>welder</highlighttext>`.
fn strip_highlight(text: &str) -> String {
    text.replace("<highlighttext>", "")
        .replace("</highlighttext>", "")
}
