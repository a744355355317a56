use std::collections::HashSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::{Result, StoreError};

/// One job posting as persisted in `vacancies`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub name: String,
    pub area: Option<String>,
    pub salary_from: Option<i64>,
    pub salary_to: Option<i64>,
    pub salary_currency: Option<String>,
    pub experience: Option<String>,
    pub schedule: Option<String>,
    pub employment: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub employer_name: Option<String>,
    pub snippet_requirement: Option<String>,
    pub snippet_responsibility: Option<String>,
}

impl Listing {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            area: None,
            salary_from: None,
            salary_to: None,
            salary_currency: None,
            experience: None,
            schedule: None,
            employment: None,
            published_at: None,
            employer_name: None,
            snippet_requirement: None,
            snippet_responsibility: None,
        }
    }

    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.area = Some(area.into());
        self
    }

    pub fn with_salary(
        mut self,
        from: Option<i64>,
        to: Option<i64>,
        currency: Option<&str>,
    ) -> Self {
        self.salary_from = from;
        self.salary_to = to;
        self.salary_currency = currency.map(str::to_string);
        self
    }

    pub fn with_experience(mut self, experience: impl Into<String>) -> Self {
        self.experience = Some(experience.into());
        self
    }

    pub fn with_employer(mut self, employer_name: impl Into<String>) -> Self {
        self.employer_name = Some(employer_name.into());
        self
    }

    pub fn with_published_at(mut self, published_at: DateTime<Utc>) -> Self {
        self.published_at = Some(published_at);
        self
    }

    /// Trim text fields and turn blank optional text into `None`.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        for field in [
            &mut self.area,
            &mut self.salary_currency,
            &mut self.experience,
            &mut self.schedule,
            &mut self.employment,
            &mut self.employer_name,
            &mut self.snippet_requirement,
            &mut self.snippet_responsibility,
        ] {
            *field = field
                .take()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.id <= 0 {
            return Err(StoreError::invalid(format!("id must be positive, got {}", self.id)));
        }
        if self.name.trim().is_empty() {
            return Err(StoreError::invalid(format!("listing {} has a blank name", self.id)));
        }
        for (field, value) in [("salary_from", self.salary_from), ("salary_to", self.salary_to)] {
            if matches!(value, Some(v) if v < 0) {
                return Err(StoreError::invalid(format!(
                    "listing {} has a negative {}",
                    self.id, field
                )));
            }
        }
        Ok(())
    }

    pub fn has_salary(&self) -> bool {
        self.salary_from.is_some() || self.salary_to.is_some()
    }
}

/// A listing together with the time it was last written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredListing {
    #[serde(flatten)]
    pub listing: Listing,
    pub created_date: NaiveDateTime,
}

/// A skill string owned by one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct SkillTag {
    pub id: i64,
    pub vacancy_id: i64,
    pub skill_name: String,
}

/// Whether an upsert created the row or replaced an earlier one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Trim skill names, drop blanks and collapse repeats, keeping first-seen order.
pub fn normalize_skills<S: AsRef<str>>(skills: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    skills
        .iter()
        .map(|skill| skill.as_ref().trim())
        .filter(|skill| !skill.is_empty())
        .filter(|skill| seen.insert(skill.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Listing::new(1, "Welder").validate().is_ok());
        assert!(Listing::new(0, "Welder").validate().is_err());
        assert!(Listing::new(1, "   ").validate().is_err());
        assert!(Listing::new(1, "Welder")
            .with_salary(Some(-1), None, None)
            .validate()
            .is_err());
    }

    #[test]
    fn test_normalized_blanks_become_none() {
        let mut listing = Listing::new(1, "  Welder ").with_area(" ");
        listing.employer_name = Some(" Plant ".into());
        let listing = listing.normalized();

        assert_eq!(listing.name, "Welder");
        assert_eq!(listing.area, None);
        assert_eq!(listing.employer_name.as_deref(), Some("Plant"));
    }

    #[test]
    fn test_normalize_skills() {
        let skills = normalize_skills(&[" TIG", "MIG", "", "TIG", "  ", "mig"]);
        assert_eq!(skills, vec!["TIG", "MIG", "mig"]);
    }
}
