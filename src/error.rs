//! Error kinds surfaced by the logging engine.
//!
//! None of these is fatal: each carries enough context (field name, record
//! index, session kind) for a caller to show a specific message and carry on.

use thiserror::Error;

use crate::{engine::ModeKind, types::QsoId};

/// Result alias for [`LogbookError`].
pub type Result<T> = std::result::Result<T, LogbookError>;

/// A candidate QSO field failed validation; nothing was stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct InvalidRecordError {
    /// Offending field name.
    pub field: &'static str,
    /// Human-readable reason.
    pub reason: String,
}

impl InvalidRecordError {
    pub(crate) fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// A mode could not be started; the engine stays inactive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot start {kind}: {reason}")]
pub struct InvalidConfigError {
    /// Mode that was requested.
    pub kind: ModeKind,
    /// Human-readable reason.
    pub reason: String,
}

impl InvalidConfigError {
    pub(crate) fn new(kind: ModeKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

/// Malformed ADIF text; the import was aborted without touching the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ADIF record {record}: {reason}")]
pub struct AdifParseError {
    /// 1-based index of the failing record.
    pub record: usize,
    /// Human-readable reason.
    pub reason: String,
}

impl AdifParseError {
    pub(crate) fn new(record: usize, reason: impl Into<String>) -> Self {
        Self {
            record,
            reason: reason.into(),
        }
    }
}

/// Durable write or read failure.
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// JSON encode/decode failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Anything else, already formatted.
    #[error("{0}")]
    Message(String),
}

/// Umbrella error for logbook operations.
#[derive(Debug, Error)]
pub enum LogbookError {
    /// See [`InvalidRecordError`].
    #[error(transparent)]
    InvalidRecord(#[from] InvalidRecordError),
    /// See [`InvalidConfigError`].
    #[error(transparent)]
    InvalidConfig(#[from] InvalidConfigError),
    /// See [`AdifParseError`].
    #[error(transparent)]
    AdifParse(#[from] AdifParseError),
    /// See [`StorageError`].
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// No record with this id.
    #[error("no QSO with id {0}")]
    NoSuchQso(QsoId),
    /// The operation needs an active Contest or Field Day session.
    #[error("no Contest or Field Day session is active")]
    NoContestSession,
}
