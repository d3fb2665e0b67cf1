//! Advisory duplicate-contact detection.
//!
//! A candidate is a dupe when an earlier record has the same callsign
//! (case-insensitive), band, and mode. Contest and Field Day sessions can
//! narrow the scope to their own time window. The result is only a flag;
//! logging a dupe is never refused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    core::store::LogStore,
    engine::session::Session,
    qso::QsoRecord,
    types::{Band, Mode},
};

/// Outcome of a dupe check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DupeStatus {
    /// No earlier contact in scope.
    Unique,
    /// Already worked in scope.
    Duplicate,
}

impl DupeStatus {
    /// True for [`DupeStatus::Duplicate`].
    pub fn is_dupe(self) -> bool {
        matches!(self, DupeStatus::Duplicate)
    }
}

/// Which earlier contacts count toward a dupe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DupeScope {
    /// Every record in the log.
    #[default]
    WholeLog,
    /// Only contacts at or after the session window start.
    SessionWindow,
}

/// Stateless dupe rule evaluated against a [`LogStore`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DupeChecker;

impl DupeChecker {
    /// Classifies a prospective contact against the whole store.
    pub fn check(
        &self,
        store: &LogStore,
        call: &str,
        band: Band,
        mode: &Mode,
        session: Option<&Session>,
    ) -> DupeStatus {
        let window = session.and_then(Session::dupe_window_start);
        let hit = store
            .find_duplicate_candidates(call, band, mode)
            .into_iter()
            .any(|prior| in_window(prior, window));
        status(hit)
    }

    /// Classifies a stored record against the records stored before it.
    ///
    /// Used when replaying a session so that scoring reproduces what the
    /// live checks reported.
    pub fn check_stored(
        &self,
        store: &LogStore,
        rec: &QsoRecord,
        window: Option<DateTime<Utc>>,
    ) -> DupeStatus {
        let Some(at) = store.position(rec.id) else {
            return DupeStatus::Unique;
        };
        let hit = store
            .find_duplicate_candidates(&rec.callsign, rec.band(), &rec.mode)
            .into_iter()
            .filter(|prior| store.position(prior.id).is_some_and(|p| p < at))
            .any(|prior| in_window(prior, window));
        status(hit)
    }
}

fn in_window(rec: &QsoRecord, window: Option<DateTime<Utc>>) -> bool {
    window.is_none_or(|start| rec.timestamp >= start)
}

fn status(hit: bool) -> DupeStatus {
    if hit {
        DupeStatus::Duplicate
    } else {
        DupeStatus::Unique
    }
}
