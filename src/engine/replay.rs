use tracing::debug;

use crate::{core::store::LogStore, dupe::DupeChecker, qso::QsoRecord};

use super::session::Session;

/// Rebuilds `session`'s counters from the records it logged.
///
/// Each record is re-classified against the records stored before it,
/// honoring the session's dupe window. Serial counters only move forward.
pub fn replay(session: &Session, store: &LogStore, checker: &DupeChecker) -> Session {
    let mut fresh = session.clone();
    fresh.reset();
    let window = session.dupe_window_start();
    let mut applied = 0usize;
    for rec in store.by_session(session.id()) {
        fresh.record_qso(rec, checker.check_stored(store, rec, window));
        applied += 1;
    }
    debug!(session = session.id(), applied, "replayed session");
    fresh
}

/// Records of `session` in log order.
pub fn session_records<'a>(session: &Session, store: &'a LogStore) -> Vec<&'a QsoRecord> {
    store.by_session(session.id()).collect()
}
