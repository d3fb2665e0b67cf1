//! Operating-mode state machine, scoring, and progress.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mode-start configuration.
pub mod config;
/// Progress snapshots.
pub mod progress;
/// Rebuilding session state from the log.
pub mod replay;
/// Per-QSO point rules.
pub mod scoring;
/// Active session and per-mode trackers.
pub mod session;
/// Tracker trait implemented by every mode.
pub mod traits;

pub use config::{
    ContestConfig, FieldDayConfig, MAX_SERIAL_START, ModeConfig, PotaActivationConfig,
    PotaHunterConfig,
};
pub use progress::{BandModeCount, POTA_ACTIVATION_THRESHOLD, Progress};
pub use session::{Session, SessionHandle};

/// Operating mode discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModeKind {
    /// Plain logging.
    General,
    /// POTA activator.
    PotaActivation,
    /// POTA hunter.
    PotaHunter,
    /// Contest.
    Contest,
    /// Field Day.
    FieldDay,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModeKind::General => "General",
            ModeKind::PotaActivation => "POTA Activation",
            ModeKind::PotaHunter => "POTA Hunter",
            ModeKind::Contest => "Contest",
            ModeKind::FieldDay => "Field Day",
        })
    }
}
