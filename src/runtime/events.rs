//! Runtime event stream payloads.

use crate::{
    dupe::DupeStatus,
    engine::{Progress, SessionHandle},
    types::{OpSeq, QsoId},
};

/// Events broadcast by the logbook task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// A contact was logged.
    QsoLogged {
        /// New record id.
        id: QsoId,
        /// Advisory dupe flag.
        dupe: DupeStatus,
    },
    /// A contact was edited.
    QsoEdited {
        /// Edited record id.
        id: QsoId,
    },
    /// A contact was deleted.
    QsoDeleted {
        /// Deleted record id.
        id: QsoId,
    },
    /// A session started.
    ModeStarted {
        /// The new session.
        session: SessionHandle,
    },
    /// The session ended.
    ModeEnded {
        /// Final progress.
        progress: Progress,
    },
    /// An ADIF import appended records.
    Imported {
        /// Records appended.
        count: usize,
    },
    /// Persistence has reached at least this op sequence.
    DurableUpTo {
        /// Highest sequence known durable.
        op_seq: OpSeq,
    },
    /// A write failed; the ops are kept and retried.
    StorageFailed {
        /// Error text.
        message: String,
    },
}
