//! The active operating session and its per-mode trackers.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    dupe::{DupeScope, DupeStatus},
    error::InvalidConfigError,
    qso::QsoRecord,
    types::{Band, SessionId},
};

use super::{
    ModeKind,
    config::{ContestConfig, FieldDayConfig, ModeConfig, PotaActivationConfig, PotaHunterConfig},
    progress::{BandModeCount, POTA_ACTIVATION_THRESHOLD, Progress},
    scoring::{RuleTable, ScoringRule, exchange_uses_serial},
    traits::ModeTracker,
};

/// Returned by `start_mode`; identifies the session on later records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHandle {
    /// Session id stamped on every record logged in it.
    pub id: SessionId,
    /// Mode kind.
    pub kind: ModeKind,
    /// Wall-clock start.
    pub started_at: DateTime<Utc>,
}

/// One active operating session.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    started_at: DateTime<Utc>,
    mode: ModeState,
}

/// Tagged per-mode state; exactly one variant is live.
#[derive(Debug, Clone)]
pub enum ModeState {
    /// Plain logging.
    General(GeneralLog),
    /// POTA activation.
    PotaActivation(PotaActivation),
    /// POTA hunting.
    PotaHunter(PotaHunter),
    /// Contest.
    Contest(Contest),
    /// Field Day.
    FieldDay(FieldDay),
}

impl Session {
    /// Validates `config` and opens a session.
    pub fn start(
        id: SessionId,
        config: ModeConfig,
        started_at: DateTime<Utc>,
    ) -> Result<Self, InvalidConfigError> {
        let mode = match config {
            ModeConfig::General => ModeState::General(GeneralLog::default()),
            ModeConfig::PotaActivation(cfg) => {
                ModeState::PotaActivation(PotaActivation::new(cfg.normalized()?))
            }
            ModeConfig::PotaHunter(cfg) => ModeState::PotaHunter(PotaHunter::new(cfg)),
            ModeConfig::Contest(cfg) => {
                let (cfg, rule, serial) = cfg.resolve()?;
                ModeState::Contest(Contest::new(cfg, rule, serial))
            }
            ModeConfig::FieldDay(cfg) => ModeState::FieldDay(FieldDay::new(cfg.normalized()?)),
        };
        Ok(Self {
            id,
            started_at,
            mode,
        })
    }

    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Mode kind.
    pub fn kind(&self) -> ModeKind {
        match &self.mode {
            ModeState::General(_) => ModeKind::General,
            ModeState::PotaActivation(_) => ModeKind::PotaActivation,
            ModeState::PotaHunter(_) => ModeKind::PotaHunter,
            ModeState::Contest(_) => ModeKind::Contest,
            ModeState::FieldDay(_) => ModeKind::FieldDay,
        }
    }

    /// Wall-clock start.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Handle describing this session.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            kind: self.kind(),
            started_at: self.started_at,
        }
    }

    /// Per-mode state.
    pub fn mode(&self) -> &ModeState {
        &self.mode
    }

    /// Start of the dupe window when the session restricts dupe scope.
    pub fn dupe_window_start(&self) -> Option<DateTime<Utc>> {
        let (scope, start) = match &self.mode {
            ModeState::Contest(c) => (c.config.dupe_scope, c.config.start_time),
            ModeState::FieldDay(fd) => (fd.config.dupe_scope, fd.config.start_time),
            _ => return None,
        };
        match scope {
            DupeScope::WholeLog => None,
            DupeScope::SessionWindow => Some(start.unwrap_or(self.started_at)),
        }
    }

    /// Parks being activated, empty outside POTA activation.
    pub fn activation_parks(&self) -> &[String] {
        match &self.mode {
            ModeState::PotaActivation(a) => &a.config.parks,
            _ => &[],
        }
    }

    /// Callsign the session operates under, when it overrides the station's.
    pub fn station_callsign(&self) -> Option<&str> {
        match &self.mode {
            ModeState::PotaActivation(a) => a.config.station_callsign.as_deref(),
            ModeState::PotaHunter(h) => h.config.station_callsign.as_deref(),
            _ => None,
        }
    }

    fn tracker(&self) -> &dyn ModeTracker {
        match &self.mode {
            ModeState::General(m) => m,
            ModeState::PotaActivation(m) => m,
            ModeState::PotaHunter(m) => m,
            ModeState::Contest(m) => m,
            ModeState::FieldDay(m) => m,
        }
    }

    fn tracker_mut(&mut self) -> &mut dyn ModeTracker {
        match &mut self.mode {
            ModeState::General(m) => m,
            ModeState::PotaActivation(m) => m,
            ModeState::PotaHunter(m) => m,
            ModeState::Contest(m) => m,
            ModeState::FieldDay(m) => m,
        }
    }

    /// Tags `qso` with this session and fills session-owned fields.
    pub fn stamp(&mut self, qso: &mut QsoRecord) {
        qso.session_id = Some(self.id);
        self.tracker_mut().stamp(qso);
    }

    /// Accounts for an appended record.
    pub fn record_qso(&mut self, qso: &QsoRecord, dupe: DupeStatus) {
        self.tracker_mut().apply(qso, dupe);
    }

    /// Clears record-derived counters ahead of a replay.
    pub fn reset(&mut self) {
        self.tracker_mut().reset();
    }

    /// Current snapshot.
    pub fn progress(&self) -> Progress {
        self.tracker().progress()
    }
}

/// General session: counts contacts, no score.
#[derive(Debug, Clone, Default)]
pub struct GeneralLog {
    logged: u32,
}

impl ModeTracker for GeneralLog {
    fn stamp(&mut self, _qso: &mut QsoRecord) {}

    fn apply(&mut self, _qso: &QsoRecord, _dupe: DupeStatus) {
        self.logged += 1;
    }

    fn reset(&mut self) {
        self.logged = 0;
    }

    fn progress(&self) -> Progress {
        Progress::General {
            logged: self.logged,
        }
    }
}

/// POTA activation tracker.
#[derive(Debug, Clone)]
pub struct PotaActivation {
    config: PotaActivationConfig,
    contacts: u32,
    p2p: u32,
}

impl PotaActivation {
    fn new(config: PotaActivationConfig) -> Self {
        Self {
            config,
            contacts: 0,
            p2p: 0,
        }
    }
}

impl ModeTracker for PotaActivation {
    fn stamp(&mut self, qso: &mut QsoRecord) {
        if qso.details.my_parks.is_empty() {
            qso.details.my_parks = self.config.parks.clone();
        }
    }

    fn apply(&mut self, qso: &QsoRecord, dupe: DupeStatus) {
        if dupe.is_dupe() {
            return;
        }
        self.contacts += 1;
        if qso.is_park_to_park() {
            self.p2p += 1;
        }
    }

    fn reset(&mut self) {
        self.contacts = 0;
        self.p2p = 0;
    }

    fn progress(&self) -> Progress {
        Progress::PotaActivation {
            parks: self.config.parks.clone(),
            contacts: self.contacts,
            remaining: POTA_ACTIVATION_THRESHOLD.saturating_sub(self.contacts),
            valid: self.contacts >= POTA_ACTIVATION_THRESHOLD,
            p2p: self.p2p,
        }
    }
}

/// POTA hunter tracker.
#[derive(Debug, Clone)]
pub struct PotaHunter {
    config: PotaHunterConfig,
    contacts: u32,
    parks: BTreeSet<String>,
}

impl PotaHunter {
    fn new(config: PotaHunterConfig) -> Self {
        Self {
            config,
            contacts: 0,
            parks: BTreeSet::new(),
        }
    }
}

impl ModeTracker for PotaHunter {
    fn stamp(&mut self, _qso: &mut QsoRecord) {}

    fn apply(&mut self, qso: &QsoRecord, dupe: DupeStatus) {
        if dupe.is_dupe() {
            return;
        }
        self.contacts += 1;
        if let Some(parks) = &qso.details.their_park {
            for park in parks.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                self.parks.insert(park.to_ascii_uppercase());
            }
        }
    }

    fn reset(&mut self) {
        self.contacts = 0;
        self.parks.clear();
    }

    fn progress(&self) -> Progress {
        Progress::PotaHunter {
            contacts: self.contacts,
            unique_parks: self.parks.len() as u32,
        }
    }
}

/// Contest tracker: serial counter, points, band/mode breakdown.
#[derive(Debug, Clone)]
pub struct Contest {
    config: ContestConfig,
    rule: RuleTable,
    next_serial: u32,
    qsos: u32,
    dupes: u32,
    points: u32,
    breakdown: BTreeMap<(Band, String), u32>,
}

impl Contest {
    fn new(config: ContestConfig, rule: RuleTable, serial_start: u32) -> Self {
        Self {
            config,
            rule,
            next_serial: serial_start,
            qsos: 0,
            dupes: 0,
            points: 0,
            breakdown: BTreeMap::new(),
        }
    }

    /// Contest settings.
    pub fn config(&self) -> &ContestConfig {
        &self.config
    }
}

impl ModeTracker for Contest {
    fn stamp(&mut self, qso: &mut QsoRecord) {
        let serial = self.next_serial;
        self.next_serial = serial.saturating_add(1);
        qso.details.serial_sent = Some(serial);
        qso.details.exchange_sent = Some(if exchange_uses_serial(&self.config.exchange_format) {
            format!("{} {serial}", qso.rst_sent)
        } else {
            match &self.config.my_exchange {
                Some(fixed) => format!("{} {fixed}", qso.rst_sent),
                None => qso.rst_sent.clone(),
            }
        });
    }

    fn apply(&mut self, qso: &QsoRecord, dupe: DupeStatus) {
        if let Some(serial) = qso.details.serial_sent {
            self.next_serial = self.next_serial.max(serial.saturating_add(1));
        }
        if dupe.is_dupe() {
            self.dupes += 1;
            return;
        }
        self.qsos += 1;
        self.points += self.rule.points(qso);
        *self
            .breakdown
            .entry((qso.band(), qso.mode.as_str().to_string()))
            .or_insert(0) += 1;
    }

    fn reset(&mut self) {
        self.qsos = 0;
        self.dupes = 0;
        self.points = 0;
        self.breakdown.clear();
    }

    fn progress(&self) -> Progress {
        Progress::Contest {
            name: self.config.name.clone(),
            qsos: self.qsos,
            dupes: self.dupes,
            points: self.points,
            next_serial: self.next_serial,
            breakdown: self
                .breakdown
                .iter()
                .map(|((band, mode), qsos)| BandModeCount {
                    band: *band,
                    mode: mode.clone(),
                    qsos: *qsos,
                })
                .collect(),
        }
    }
}

/// Field Day tracker: per-mode QSO points, bonuses, sections worked.
#[derive(Debug, Clone)]
pub struct FieldDay {
    config: FieldDayConfig,
    qsos: u32,
    dupes: u32,
    qso_points: u32,
    sections: BTreeSet<String>,
}

impl FieldDay {
    fn new(config: FieldDayConfig) -> Self {
        Self {
            config,
            qsos: 0,
            dupes: 0,
            qso_points: 0,
            sections: BTreeSet::new(),
        }
    }

    /// Field Day settings.
    pub fn config(&self) -> &FieldDayConfig {
        &self.config
    }

    /// Sections worked so far, sorted.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(String::as_str)
    }
}

impl ModeTracker for FieldDay {
    fn stamp(&mut self, qso: &mut QsoRecord) {
        qso.details.exchange_sent = Some(self.config.exchange());
    }

    fn apply(&mut self, qso: &QsoRecord, dupe: DupeStatus) {
        if dupe.is_dupe() {
            self.dupes += 1;
            return;
        }
        self.qsos += 1;
        self.qso_points += self.config.points.points(qso);
        if let Some(section) = qso
            .details
            .exchange_rcvd
            .as_deref()
            .and_then(|x| x.split_whitespace().last())
        {
            self.sections.insert(section.to_ascii_uppercase());
        }
    }

    fn reset(&mut self) {
        self.qsos = 0;
        self.dupes = 0;
        self.qso_points = 0;
        self.sections.clear();
    }

    fn progress(&self) -> Progress {
        let bonus_points: u32 = self.config.bonuses.values().sum();
        Progress::FieldDay {
            exchange: self.config.exchange(),
            qsos: self.qsos,
            dupes: self.dupes,
            qso_points: self.qso_points,
            bonus_points,
            score: self.qso_points + bonus_points,
            sections: self.sections.len() as u32,
        }
    }
}
