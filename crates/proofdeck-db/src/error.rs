use thiserror::Error;

/// Storage-layer error taxonomy. Domain outcomes (absent row, actor not
/// allowed, state-machine violation) are distinct variants so handlers can
/// map them to status codes without string matching.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// True when the error is a SQLite uniqueness-constraint failure. The
/// schema's unique indexes are the backstop for check-then-act races;
/// callers translate this into `StoreError::Conflict`.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
