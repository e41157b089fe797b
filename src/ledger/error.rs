//! Ledger store errors
//!
//! Infrastructure failures only. Business rule violations travel as
//! `DomainError`; both roll back the open transaction.

/// Errors that can occur in the ledger store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Serialization failure or deadlock; the whole transaction may be retried
    #[error("Concurrent modification conflict: {0}")]
    Conflict(String),

    /// Maximum retries exceeded
    #[error("Maximum retries exceeded for ledger transaction")]
    MaxRetriesExceeded,

    /// Stored row could not be mapped back to a domain value
    #[error("Corrupt ledger data: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        // 40001 serialization_failure, 40P01 deadlock_detected
        if let sqlx::Error::Database(db_err) = &err {
            if matches!(db_err.code().as_deref(), Some("40001") | Some("40P01")) {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
        StoreError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(StoreError::Conflict("serialize".into()).is_retryable());
        assert!(!StoreError::MaxRetriesExceeded.is_retryable());
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_retryable());
    }
}
