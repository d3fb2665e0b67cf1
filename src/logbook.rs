//! Synchronous logging facade.
//!
//! [`Logbook`] owns the [`LogStore`] and the optional active [`Session`] and
//! is the only path that mutates either. Every operation runs to completion
//! before the next one starts; wrap it in [`crate::runtime`] to share it
//! across tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    adif::{self, ExportContext, ExportFilter, ImportOptions, ImportReport},
    cabrillo,
    config::StationInfo,
    core::store::{LogStore, StoreSnapshotV1},
    dupe::{DupeChecker, DupeStatus},
    error::{AdifParseError, InvalidConfigError, InvalidRecordError, LogbookError, Result},
    engine::{ModeConfig, Progress, Session, SessionHandle, replay::replay},
    op::StoredOp,
    qso::{QsoDraft, QsoRecord, normalize_callsign},
    types::{Frequency, Mode, QsoId, SessionId},
};

/// Result of [`Logbook::submit_qso`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submitted {
    /// The stored record, with its id and session fields filled in.
    pub record: QsoRecord,
    /// Advisory dupe flag; the record was stored either way.
    pub dupe: DupeStatus,
}

/// QSO log plus the operating-mode state machine.
#[derive(Debug)]
pub struct Logbook {
    store: LogStore,
    session: Option<Session>,
    station: StationInfo,
    checker: DupeChecker,
    import_options: ImportOptions,
    next_session_id: SessionId,
}

impl Default for Logbook {
    fn default() -> Self {
        Self::new(StationInfo::default())
    }
}

impl Logbook {
    /// Empty log for `station`.
    pub fn new(station: StationInfo) -> Self {
        Self::from_store(LogStore::new(), station)
    }

    /// Wraps a store loaded from disk. No session is active.
    pub fn from_store(store: LogStore, station: StationInfo) -> Self {
        let next_session_id = store.max_session_id().map_or(1, |id| id + 1);
        Self {
            store,
            session: None,
            station,
            checker: DupeChecker,
            import_options: ImportOptions::default(),
            next_session_id,
        }
    }

    /// Replaces the import tuning.
    pub fn with_import_options(mut self, options: ImportOptions) -> Self {
        self.import_options = options;
        self
    }

    /// Station metadata.
    pub fn station(&self) -> &StationInfo {
        &self.station
    }

    /// Replaces station metadata.
    pub fn set_station(&mut self, station: StationInfo) {
        self.station = station;
    }

    /// Underlying store.
    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// Active session, if any.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Validates and logs a contact.
    ///
    /// Dupes are flagged, never refused. With a session active the record is
    /// stamped with session fields (serial, exchange, parks) and counted.
    pub fn submit_qso(&mut self, draft: QsoDraft) -> std::result::Result<Submitted, InvalidRecordError> {
        let mut record = draft.validate()?;
        let dupe = self.checker.check(
            &self.store,
            &record.callsign,
            record.band(),
            &record.mode,
            self.session.as_ref(),
        );

        if let Some(session) = self.session.as_mut() {
            session.stamp(&mut record);
        }
        record.id = self.store.append(record.clone());
        if let Some(session) = self.session.as_mut() {
            session.record_qso(&record, dupe);
        }

        if dupe.is_dupe() {
            info!(id = record.id, call = %record.callsign, band = %record.band(), "logged duplicate contact");
        } else {
            debug!(id = record.id, call = %record.callsign, "logged contact");
        }
        Ok(Submitted { record, dupe })
    }

    /// Dupe flag for what the operator has typed so far; nothing is stored.
    pub fn check_dupe(&self, draft: &QsoDraft) -> std::result::Result<DupeStatus, InvalidRecordError> {
        let call = normalize_callsign(&draft.callsign)?;
        let frequency = Frequency::parse(&draft.frequency).ok_or_else(|| {
            InvalidRecordError::new("frequency", format!("`{}` is not a positive number of MHz", draft.frequency))
        })?;
        let mode = Mode::parse(&draft.mode)
            .ok_or_else(|| InvalidRecordError::new("mode", "mode is required"))?;
        Ok(self
            .checker
            .check(&self.store, &call, frequency.band(), &mode, self.session.as_ref()))
    }

    /// Starts a session now. See [`Logbook::start_mode_at`].
    pub fn start_mode(&mut self, config: ModeConfig) -> std::result::Result<SessionHandle, InvalidConfigError> {
        self.start_mode_at(config, Utc::now())
    }

    /// Starts a session that began at `started_at`.
    ///
    /// Fails while another session is active; end it first.
    pub fn start_mode_at(
        &mut self,
        config: ModeConfig,
        started_at: DateTime<Utc>,
    ) -> std::result::Result<SessionHandle, InvalidConfigError> {
        if let Some(active) = &self.session {
            return Err(InvalidConfigError::new(
                config.kind(),
                format!("a {} session is active; end it first", active.kind()),
            ));
        }
        let session = Session::start(self.next_session_id, config, started_at)?;
        self.next_session_id += 1;
        let handle = session.handle();
        info!(session = handle.id, kind = %handle.kind, "mode started");
        self.session = Some(session);
        Ok(handle)
    }

    /// Ends the active session and returns its final progress.
    ///
    /// Always succeeds; the log is not touched.
    pub fn end_mode(&mut self) -> Progress {
        match self.session.take() {
            Some(session) => {
                let progress = session.progress();
                info!(session = session.id(), kind = %session.kind(), %progress, "mode ended");
                progress
            }
            None => Progress::Inactive,
        }
    }

    /// Progress of the active session.
    pub fn get_progress(&self) -> Progress {
        self.session
            .as_ref()
            .map_or(Progress::Inactive, Session::progress)
    }

    /// Imports ADIF text; all or nothing on structural errors.
    pub fn import_adif(&mut self, text: &str) -> std::result::Result<ImportReport, AdifParseError> {
        adif::import_adif(&mut self.store, text, self.import_options)
    }

    /// Exports the records `filter` selects, in log order.
    pub fn export_adif(&self, filter: &ExportFilter) -> String {
        let ctx = ExportContext {
            station: &self.station,
            session: self.session.as_ref(),
        };
        let records = self.store.iter().filter(|rec| filter.matches(rec));
        let out = adif::export_adif(records, &ctx, Utc::now());
        debug!(bytes = out.len(), "ADIF export");
        out
    }

    /// Cabrillo log of the active Contest or Field Day session.
    pub fn export_cabrillo(&self) -> Result<String> {
        self.session
            .as_ref()
            .and_then(|s| cabrillo::export_cabrillo(s, &self.store, &self.station))
            .ok_or(LogbookError::NoContestSession)
    }

    /// Replaces the fields of `id` with `draft`.
    ///
    /// Session membership and session-stamped fields the draft leaves empty
    /// are kept. Progress is recomputed from the log.
    pub fn edit(&mut self, id: QsoId, draft: QsoDraft) -> Result<QsoRecord> {
        let prev = self.store.get(id).ok_or(LogbookError::NoSuchQso(id))?;
        let mut record = draft.validate()?;
        record.id = id;
        record.session_id = prev.session_id;
        let d = &mut record.details;
        if d.serial_sent.is_none() {
            d.serial_sent = prev.details.serial_sent;
        }
        if d.exchange_sent.is_none() {
            d.exchange_sent = prev.details.exchange_sent.clone();
        }
        if d.my_parks.is_empty() {
            d.my_parks = prev.details.my_parks.clone();
        }

        self.store
            .replace(id, record.clone())
            .map_err(|_| LogbookError::NoSuchQso(id))?;
        self.refresh_session();
        info!(id, call = %record.callsign, "edited contact");
        Ok(record)
    }

    /// Deletes `id` and returns what it held. Progress is recomputed.
    pub fn delete(&mut self, id: QsoId) -> Result<QsoRecord> {
        let prev = self
            .store
            .remove(id)
            .map_err(|_| LogbookError::NoSuchQso(id))?;
        self.refresh_session();
        info!(id, call = %prev.callsign, "deleted contact");
        Ok(prev)
    }

    fn refresh_session(&mut self) {
        if let Some(session) = &self.session {
            self.session = Some(replay(session, &self.store, &self.checker));
        }
    }

    /// Record `id`.
    pub fn get(&self, id: QsoId) -> Option<&QsoRecord> {
        self.store.get(id)
    }

    /// Last `n` records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&QsoRecord> {
        self.store.recent(n)
    }

    /// Every contact with `call`, in log order.
    pub fn by_call(&self, call: &str) -> Vec<&QsoRecord> {
        self.store.by_call(call)
    }

    /// Records in the log.
    pub fn count(&self) -> usize {
        self.store.len()
    }

    /// Journal entries not yet handed to a sink.
    pub fn drain_pending_ops(&mut self) -> Vec<StoredOp> {
        self.store.drain_pending_ops()
    }

    /// Image of the store for a checkpoint.
    pub fn snapshot(&self) -> StoreSnapshotV1 {
        self.store.export_snapshot()
    }
}
