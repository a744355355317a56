//! Counters reported at the end of a run.

use std::collections::BTreeMap;
use std::fmt;

use hh_client::HhError;
use serde::Serialize;
use vacancy_store::StoreError;

use crate::normalize::NormalizeError;

/// Failure classes tallied in [`RunSummary::errors`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    AuthFailed,
    RateLimited,
    TransientNetwork,
    MalformedResponse,
    Api,
    InvalidQuery,
    Config,
    InvalidItem,
    ConstraintViolation,
    InvalidListing,
    Decode,
    StorageUnavailable,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::AuthFailed => "auth_failed",
            ErrorCategory::RateLimited => "rate_limited",
            ErrorCategory::TransientNetwork => "transient_network",
            ErrorCategory::MalformedResponse => "malformed_response",
            ErrorCategory::Api => "api",
            ErrorCategory::InvalidQuery => "invalid_query",
            ErrorCategory::Config => "config",
            ErrorCategory::InvalidItem => "invalid_item",
            ErrorCategory::ConstraintViolation => "constraint_violation",
            ErrorCategory::InvalidListing => "invalid_listing",
            ErrorCategory::Decode => "decode",
            ErrorCategory::StorageUnavailable => "storage_unavailable",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&HhError> for ErrorCategory {
    fn from(err: &HhError) -> Self {
        match err {
            HhError::AuthFailed { .. } => ErrorCategory::AuthFailed,
            HhError::RateLimited { .. } => ErrorCategory::RateLimited,
            HhError::TransientNetwork(_) => ErrorCategory::TransientNetwork,
            HhError::MalformedResponse(_) => ErrorCategory::MalformedResponse,
            HhError::Api { .. } => ErrorCategory::Api,
            HhError::InvalidQuery(_) => ErrorCategory::InvalidQuery,
            HhError::Config(_) => ErrorCategory::Config,
        }
    }
}

impl From<&StoreError> for ErrorCategory {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::ConstraintViolation(_) => ErrorCategory::ConstraintViolation,
            StoreError::StorageUnavailable(_) => ErrorCategory::StorageUnavailable,
            StoreError::Invalid { .. } => ErrorCategory::InvalidListing,
            StoreError::Decode(_) => ErrorCategory::Decode,
        }
    }
}

impl From<&NormalizeError> for ErrorCategory {
    fn from(_: &NormalizeError) -> Self {
        ErrorCategory::InvalidItem
    }
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub queries: u64,
    pub pages_fetched: u64,
    pub pages_skipped: u64,
    /// Listings written, new or replaced.
    pub records_stored: u64,
    /// Of `records_stored`, how many superseded an existing row.
    pub records_replaced: u64,
    /// Items dropped: invalid, filtered out, or rejected by the store.
    pub records_skipped: u64,
    pub retries: u64,
    pub errors: BTreeMap<ErrorCategory, u64>,
    /// Set when the run stopped early.
    pub aborted: bool,
}

impl RunSummary {
    pub fn record_error(&mut self, category: impl Into<ErrorCategory>) {
        *self.errors.entry(category.into()).or_insert(0) += 1;
    }

    pub fn error_count(&self, category: ErrorCategory) -> u64 {
        self.errors.get(&category).copied().unwrap_or(0)
    }

    pub fn total_errors(&self) -> u64 {
        self.errors.values().sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "queries:          {}", self.queries)?;
        writeln!(f, "pages fetched:    {}", self.pages_fetched)?;
        writeln!(f, "pages skipped:    {}", self.pages_skipped)?;
        writeln!(
            f,
            "records stored:   {} ({} replaced)",
            self.records_stored, self.records_replaced
        )?;
        writeln!(f, "records skipped:  {}", self.records_skipped)?;
        writeln!(f, "retries:          {}", self.retries)?;
        if self.errors.is_empty() {
            writeln!(f, "errors:           none")?;
        } else {
            writeln!(f, "errors:")?;
            for (category, count) in &self.errors {
                writeln!(f, "  {:<22}{}", category, count)?;
            }
        }
        if self.aborted {
            writeln!(f, "status:           aborted")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_tally() {
        let mut summary = RunSummary::default();
        summary.record_error(&HhError::MalformedResponse("x".into()));
        summary.record_error(&HhError::MalformedResponse("y".into()));
        summary.record_error(&StoreError::Decode("z".into()));
        summary.record_error(&NormalizeError::MissingId);

        assert_eq!(summary.error_count(ErrorCategory::MalformedResponse), 2);
        assert_eq!(summary.error_count(ErrorCategory::Decode), 1);
        assert_eq!(summary.error_count(ErrorCategory::InvalidItem), 1);
        assert_eq!(summary.error_count(ErrorCategory::AuthFailed), 0);
        assert_eq!(summary.total_errors(), 4);
    }

    #[test]
    fn test_display_lists_categories() {
        let mut summary = RunSummary {
            queries: 2,
            records_stored: 10,
            records_replaced: 3,
            ..Default::default()
        };
        summary.record_error(ErrorCategory::Api);

        let text = summary.to_string();
        assert!(text.contains("records stored:   10 (3 replaced)"));
        assert!(text.contains("api"));
        assert!(!text.contains("aborted"));
    }
}
