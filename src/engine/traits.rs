use crate::{dupe::DupeStatus, qso::QsoRecord};

use super::progress::Progress;

/// Per-mode scoring state fed one accepted record at a time.
///
/// Progress must be a function of the records applied since the last
/// [`ModeTracker::reset`], so a tracker can always be rebuilt from the log.
pub trait ModeTracker {
    /// Fills session-owned fields (serial, exchange, parks) before the
    /// record is appended.
    fn stamp(&mut self, qso: &mut QsoRecord);
    /// Accounts for a stored record and the dupe classification it got.
    fn apply(&mut self, qso: &QsoRecord, dupe: DupeStatus);
    /// Clears counters derived from records; serial counters survive.
    fn reset(&mut self);
    /// Current snapshot.
    fn progress(&self) -> Progress;
}
