//! Journal entries: one per change to the log.

use serde::{Deserialize, Serialize};

use crate::{
    qso::QsoRecord,
    types::{OpSeq, QsoId},
};

/// Current on-disk op format.
pub const OP_FORMAT_VERSION: u16 = 1;

/// One change to the log, carrying enough to replay or audit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Op {
    /// Append a fully materialized QSO.
    Append {
        /// Appended record.
        qso: QsoRecord,
    },
    /// Replace a record in place (edit).
    Replace {
        /// New record contents, carrying the same id.
        qso: QsoRecord,
        /// Contents before the edit.
        prev: QsoRecord,
    },
    /// Delete a record.
    Remove {
        /// QSO id removed.
        id: QsoId,
        /// Contents before deletion.
        prev: QsoRecord,
    },
}

impl Op {
    /// Id of the record this op touches.
    pub fn qso_id(&self) -> QsoId {
        match self {
            Op::Append { qso } | Op::Replace { qso, .. } => qso.id,
            Op::Remove { id, .. } => *id,
        }
    }
}

/// An [`Op`] with its place in the journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredOp {
    /// Journal position, strictly increasing.
    pub seq: OpSeq,
    /// Wall-clock time of the change, Unix milliseconds.
    pub ts_ms: u64,
    /// Operation body.
    pub op: Op,
}

/// What a sink writes for each op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredOpEnvelope {
    /// [`OP_FORMAT_VERSION`] at write time.
    pub format_version: u16,
    /// Wrapped operation.
    pub stored: StoredOp,
}

impl StoredOpEnvelope {
    /// Wraps `stored` under the current format.
    pub fn new(stored: StoredOp) -> Self {
        Self {
            format_version: OP_FORMAT_VERSION,
            stored,
        }
    }
}
