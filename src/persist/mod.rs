//! Durable storage behind the in-memory log.

/// Whole-log ADIF file sink.
pub mod adif_file;
/// SQLite journal sink.
pub mod sqlite;

use crate::{
    config::StationInfo,
    core::store::{StoreError, StoreSnapshotV1},
    error::StorageError,
    op::StoredOp,
    types::OpSeq,
};

impl From<StoreError> for StorageError {
    fn from(value: StoreError) -> Self {
        Self::Message(format!("store error: {value}"))
    }
}

/// Result alias for sink operations.
pub type PersistResult<T> = Result<T, StorageError>;

/// Destination for journaled ops.
///
/// Calls come from one blocking thread at a time. A failed `append_ops` must
/// leave the sink able to take the same ops again.
pub trait OpSink: Send {
    /// Persists `ops` in order and returns the last durable sequence.
    fn append_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq>;
    /// Pushes buffered writes to disk.
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }
    /// Stores a full image of the log covering everything up to `last_seq`.
    fn write_snapshot(&mut self, _snapshot: &StoreSnapshotV1, _last_seq: OpSeq) -> PersistResult<()> {
        Ok(())
    }
    /// Drops journal entries up to `seq`; returns how many.
    fn compact_through(&mut self, _seq: OpSeq) -> PersistResult<usize> {
        Ok(0)
    }
    /// Stores session-independent station metadata.
    fn write_station(&mut self, _station: &StationInfo) -> PersistResult<()> {
        Ok(())
    }
}
