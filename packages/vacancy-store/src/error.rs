//! Typed errors for the vacancy store.

use sqlx::error::ErrorKind;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique, foreign key, not-null or check constraint rejected the write
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// Database unreachable, closed, locked or failing I/O
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] sqlx::Error),

    /// Listing failed validation and was not written
    #[error("invalid listing: {reason}")]
    Invalid { reason: String },

    /// A stored value could not be read back
    #[error("stored value could not be decoded: {0}")]
    Decode(String),
}

impl StoreError {
    /// Whether the whole batch must stop, not just the current record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::StorageUnavailable(_))
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        StoreError::Invalid {
            reason: reason.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let constraint = match &err {
            sqlx::Error::Database(db) => matches!(
                db.kind(),
                ErrorKind::UniqueViolation
                    | ErrorKind::ForeignKeyViolation
                    | ErrorKind::NotNullViolation
                    | ErrorKind::CheckViolation
            )
            .then(|| db.message().to_string()),
            _ => None,
        };
        if let Some(message) = constraint {
            return StoreError::ConstraintViolation(message);
        }

        if matches!(
            err,
            sqlx::Error::ColumnDecode { .. }
                | sqlx::Error::Decode(_)
                | sqlx::Error::ColumnNotFound(_)
                | sqlx::Error::TypeNotFound { .. }
        ) {
            return StoreError::Decode(err.to_string());
        }

        StoreError::StorageUnavailable(err)
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_fatal() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::StorageUnavailable(_)));
        assert!(err.is_fatal());

        let err = StoreError::from(sqlx::Error::PoolClosed);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_decode_errors_are_not_fatal() {
        let err = StoreError::from(sqlx::Error::ColumnNotFound("salary".into()));
        assert!(matches!(err, StoreError::Decode(_)));
        assert!(!err.is_fatal());
        assert!(!StoreError::invalid("blank name").is_fatal());
    }
}
