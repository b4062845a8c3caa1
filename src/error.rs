//! Error taxonomy shared by every component.
//!
//! Store errors and FSM/service errors both collapse into [`AppError`]
//! at the component boundary; callers further up map it to the
//! boundary's status codes. External-service clients never propagate
//! their own errors up this chain — they degrade to empty results and
//! a debug log instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("gone: {0}")]
    Gone(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("store busy")]
    StoreBusy,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP-class status code this error kind surfaces as at the boundary.
    pub fn status_class(&self) -> u16 {
        match self {
            AppError::Validation(_) => 400,
            AppError::Unauthorized(_) => 401,
            AppError::NotFound(_) => 404,
            AppError::Conflict(_) => 409,
            AppError::Gone(_) => 410,
            AppError::StoreBusy => 503,
            AppError::Internal(_) => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StoreBusy)
    }
}

/// Inspect an arbitrary `rusqlite` failure (wrapped in an `anyhow` chain
/// or not) for the store-busy signature: the native BUSY/LOCKED result
/// codes, or the generic "database is locked" message. These all map
/// to the same retryable kind, whether they came from a write-token
/// timeout or from SQLite itself.
pub fn classify_sqlite_error(err: &rusqlite::Error) -> AppError {
    use rusqlite::ErrorCode;
    if let rusqlite::Error::SqliteFailure(sqlite_err, _) = err {
        if matches!(sqlite_err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) {
            return AppError::StoreBusy;
        }
    }
    let message = err.to_string();
    if message.contains("database is locked") || message.contains("busy") {
        return AppError::StoreBusy;
    }
    AppError::Internal(anyhow::Error::new(err.to_owned_error()))
}

/// Helper trait so `classify_sqlite_error` can own a copy of the error
/// without requiring `rusqlite::Error: Clone` (it isn't).
trait ToOwnedError {
    fn to_owned_error(&self) -> anyhow::Error;
}

impl ToOwnedError for rusqlite::Error {
    fn to_owned_error(&self) -> anyhow::Error {
        anyhow::anyhow!("{}", self)
    }
}

/// Signals that the write token could not be acquired within its
/// timeout. Distinct type so `classify_sqlite_error`-style chain
/// inspection can recognize it even once wrapped in `anyhow`.
#[derive(Debug, Error)]
#[error("write token acquisition timed out")]
pub struct WriteTokenTimeout;

impl From<WriteTokenTimeout> for AppError {
    fn from(_: WriteTokenTimeout) -> Self {
        AppError::StoreBusy
    }
}

pub type AppResult<T> = Result<T, AppError>;
