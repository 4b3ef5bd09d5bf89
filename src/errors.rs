use sea_orm::error::DbErr;
use sea_orm::TransactionError;
use serde::Serialize;
use thiserror::Error;

/// Error taxonomy for the stock engine.
///
/// Every failure is detected before or during the write and propagates
/// through the caller's transaction, rolling back the whole unit of work.
/// Callers translate these into their own request-level failures.
#[derive(Error, Debug, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Insufficient batch quantity: {0}")]
    InsufficientBatchQuantity(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ServiceError {
    /// Helper to convert database errors
    pub fn db_error(err: DbErr) -> Self {
        ServiceError::DatabaseError(err)
    }
}

/// Unwraps sea-orm's transaction error wrapper back into the service error
/// raised inside the closure, so call sites keep a single error type.
impl From<TransactionError<ServiceError>> for ServiceError {
    fn from(err: TransactionError<ServiceError>) -> Self {
        match err {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = ServiceError::InsufficientStock("available=5, requested=8".into());
        assert_eq!(
            err.to_string(),
            "Insufficient stock: available=5, requested=8"
        );
    }

    #[test]
    fn transaction_error_unwraps_inner_service_error() {
        let inner = ServiceError::NotFound("batch 42".into());
        let wrapped: TransactionError<ServiceError> = TransactionError::Transaction(inner);
        let unwrapped: ServiceError = wrapped.into();
        assert!(matches!(unwrapped, ServiceError::NotFound(_)));
    }
}
