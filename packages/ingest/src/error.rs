//! Errors that stop an ingestion run.
//!
//! Page- and record-level failures never surface here; the pipeline counts
//! them in the [`crate::RunSummary`] and moves on.

use hh_client::HhError;
use thiserror::Error;
use vacancy_store::StoreError;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("aborting run, credential rejected: {0}")]
    AuthFailed(#[source] HhError),

    #[error("aborting run, store unavailable: {0}")]
    StorageUnavailable(#[source] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IngestError>;
