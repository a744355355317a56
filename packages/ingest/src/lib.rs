//! Vacancy ingestion: pages from the HH.ru search API into SQLite.
//!
//! The [`Pipeline`] drives a [`VacancySource`] page by page, turns every
//! item into a [`vacancy_store::Listing`] and writes it with its skill tags.
//! Failures are handled per class: credential and storage failures stop the
//! run, throttling and network hiccups are retried, anything else costs one
//! page or one record and is counted in the [`RunSummary`].

pub mod config;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod retry;
pub mod source;
pub mod summary;
pub mod testing;

pub use config::Config;
pub use error::{IngestError, Result};
pub use normalize::{normalize, NormalizeError};
pub use pipeline::{Pipeline, PipelineOptions};
pub use retry::{RetryDecision, RetryPolicy};
pub use source::VacancySource;
pub use summary::{ErrorCategory, RunSummary};
