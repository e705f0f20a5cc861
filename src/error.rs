use std::error::Error as StdError;

/// Error type for the database capabilities (begin, execute, query, commit, rollback).
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Database error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

impl DatabaseError {
    /// Wrap an error raised by a non-sqlx database binding.
    pub fn backend(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        DatabaseError::Backend(err.into())
    }

    /// True when the operation was cut short by its [`crate::Context`].
    pub fn is_context_error(&self) -> bool {
        matches!(self, DatabaseError::Canceled | DatabaseError::DeadlineExceeded)
    }
}

/// Result type for the database capabilities.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Stage of the transaction lifecycle an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Starting the transaction.
    Begin,
    /// Issuing `DEALLOCATE ALL` before the unit of work.
    Deallocate,
    /// The unit of work itself; the rollback after it succeeded.
    Work,
    /// Committing after the unit of work succeeded.
    Commit,
    /// Rolling back after the unit of work failed.
    Rollback,
}

/// Error returned by [`crate::execute_with`].
///
/// `E` is the unit of work's own error type. When the unit of work fails and
/// the rollback succeeds the error comes back as [`TransactionError::Work`],
/// which displays and sources exactly like `E`. When the rollback fails too,
/// [`TransactionError::Rollback`] reports the rollback failure and keeps `E`
/// as its `source()`.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError<E>
where
    E: StdError + Send + Sync + 'static,
{
    #[error("failed to begin transaction: {0}")]
    Begin(#[source] DatabaseError),

    #[error("failed to deallocate prepared statements: {0}")]
    Deallocate(#[source] DatabaseError),

    #[error("failed to commit transaction: {0}")]
    Commit(#[source] DatabaseError),

    #[error("transaction rollback failed: {rollback} (original error: {source})")]
    Rollback {
        rollback: DatabaseError,
        #[source]
        source: E,
    },

    #[error(transparent)]
    Work(E),
}

impl<E> TransactionError<E>
where
    E: StdError + Send + Sync + 'static,
{
    /// Which stage of the transaction lifecycle failed.
    pub fn phase(&self) -> Phase {
        match self {
            TransactionError::Begin(_) => Phase::Begin,
            TransactionError::Deallocate(_) => Phase::Deallocate,
            TransactionError::Commit(_) => Phase::Commit,
            TransactionError::Rollback { .. } => Phase::Rollback,
            TransactionError::Work(_) => Phase::Work,
        }
    }

    /// The unit of work's error, whether or not the rollback after it succeeded.
    pub fn work_error(&self) -> Option<&E> {
        match self {
            TransactionError::Work(err) | TransactionError::Rollback { source: err, .. } => {
                Some(err)
            }
            _ => None,
        }
    }

    /// Take the unit of work's error out, as [`TransactionError::work_error`] does by reference.
    pub fn into_work_error(self) -> Option<E> {
        match self {
            TransactionError::Work(err) | TransactionError::Rollback { source: err, .. } => {
                Some(err)
            }
            _ => None,
        }
    }

    /// The database failure behind this error, if the database failed at all.
    pub fn database_error(&self) -> Option<&DatabaseError> {
        match self {
            TransactionError::Begin(err)
            | TransactionError::Deallocate(err)
            | TransactionError::Commit(err)
            | TransactionError::Rollback { rollback: err, .. } => Some(err),
            TransactionError::Work(_) => None,
        }
    }
}

/// Result type for [`crate::execute_with`].
pub type TransactionResult<T, E> = Result<T, TransactionError<E>>;
