use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Band;

/// QSOs needed for a valid POTA activation.
pub const POTA_ACTIVATION_THRESHOLD: u32 = 10;

/// Non-dupe QSO count for one band/mode pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandModeCount {
    /// Band.
    pub band: Band,
    /// Mode label.
    pub mode: String,
    /// Contacts.
    pub qsos: u32,
}

/// Mode-specific progress and score snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Progress {
    /// No session; plain logging without tracking.
    Inactive,
    /// General session.
    General {
        /// QSOs logged in this session.
        logged: u32,
    },
    /// POTA activation.
    PotaActivation {
        /// Parks being activated.
        parks: Vec<String>,
        /// Non-dupe contacts.
        contacts: u32,
        /// Contacts still needed for a valid activation.
        remaining: u32,
        /// Threshold reached.
        valid: bool,
        /// Park-to-park contacts.
        p2p: u32,
    },
    /// POTA hunting.
    PotaHunter {
        /// Non-dupe contacts.
        contacts: u32,
        /// Distinct parks worked.
        unique_parks: u32,
    },
    /// Contest.
    Contest {
        /// Contest name.
        name: String,
        /// Non-dupe contacts.
        qsos: u32,
        /// Dupes logged anyway.
        dupes: u32,
        /// Score so far.
        points: u32,
        /// Serial the next QSO will carry.
        next_serial: u32,
        /// Per band/mode counts.
        breakdown: Vec<BandModeCount>,
    },
    /// Field Day.
    FieldDay {
        /// Exchange sent, e.g. `3A NCA`.
        exchange: String,
        /// Non-dupe contacts.
        qsos: u32,
        /// Dupes logged anyway.
        dupes: u32,
        /// Sum of per-QSO points.
        qso_points: u32,
        /// Claimed bonus points.
        bonus_points: u32,
        /// `qso_points + bonus_points`.
        score: u32,
        /// Distinct sections worked.
        sections: u32,
    },
}

impl Progress {
    /// Score for modes that keep one, else zero.
    pub fn score(&self) -> u32 {
        match self {
            Progress::Contest { points, .. } => *points,
            Progress::FieldDay { score, .. } => *score,
            _ => 0,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Inactive => f.write_str("General Logging"),
            Progress::General { logged } => write!(f, "General: {logged} QSOs"),
            Progress::PotaActivation {
                parks,
                contacts,
                remaining,
                valid,
                p2p,
            } => {
                write!(f, "POTA {}: {contacts}/{POTA_ACTIVATION_THRESHOLD}", parks.join(", "))?;
                if *valid {
                    f.write_str(" (valid)")?;
                } else {
                    write!(f, " ({remaining} to go)")?;
                }
                write!(f, " P2P {p2p}")
            }
            Progress::PotaHunter {
                contacts,
                unique_parks,
            } => write!(f, "POTA Hunter: {contacts} QSOs, {unique_parks} parks"),
            Progress::Contest {
                name,
                qsos,
                points,
                next_serial,
                ..
            } => {
                let name = if name.is_empty() { "Contest" } else { name };
                write!(f, "{name}: {qsos} QSOs, {points} pts, next #{next_serial}")
            }
            Progress::FieldDay {
                exchange,
                qsos,
                score,
                sections,
                ..
            } => write!(f, "Field Day {exchange}: {qsos} QSOs, {score} pts, {sections} sections"),
        }
    }
}
