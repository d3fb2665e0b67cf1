//! Keeps the whole log as one ADIF file.
//!
//! The sink mirrors the log in memory and rewrites the file after every
//! batch. Writes go to a temporary sibling that is then renamed over the
//! target, so readers never see a half-written file.

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::Utc;
use tracing::{debug, info};

use crate::{
    adif::{ExportContext, export_adif, load_adif},
    config::StationInfo,
    core::store::LogStore,
    error::StorageError,
    op::StoredOp,
    types::OpSeq,
};

use super::{OpSink, PersistResult};

/// [`OpSink`] that stores the log as an ADIF document.
#[derive(Debug)]
pub struct AdifFileSink {
    path: PathBuf,
    mirror: LogStore,
    station: StationInfo,
    applied_seq: OpSeq,
}

impl AdifFileSink {
    /// Opens `path`, loading any records already in it.
    ///
    /// Ids are assigned in file order starting at 1.
    pub fn open(path: impl AsRef<Path>, station: StationInfo) -> PersistResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut mirror = LogStore::new();
        match fs::read_to_string(&path) {
            Ok(text) => {
                let report = load_adif(&mut mirror, &text)
                    .map_err(|err| StorageError::Message(format!("{}: {err}", path.display())))?;
                info!(
                    path = %path.display(),
                    records = report.imported,
                    failed = report.failed,
                    "loaded ADIF log"
                );
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        mirror.drain_pending_ops();
        let applied_seq = mirror.latest_op_seq();
        Ok(Self {
            path,
            mirror,
            station,
            applied_seq,
        })
    }

    /// Independent copy of the loaded log, for a [`crate::logbook::Logbook`].
    pub fn load_store(&self) -> PersistResult<LogStore> {
        Ok(LogStore::from_snapshot(self.mirror.export_snapshot())?)
    }

    /// File this sink writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_file(&self) -> PersistResult<()> {
        let ctx = ExportContext {
            station: &self.station,
            session: None,
        };
        let text = export_adif(self.mirror.iter(), &ctx, Utc::now());

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), records = self.mirror.len(), "rewrote ADIF log");
        Ok(())
    }
}

impl OpSink for AdifFileSink {
    fn append_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq> {
        let floor = self.applied_seq;
        for stored in ops.iter().filter(|s| s.seq > floor) {
            self.mirror.apply_replayed_op(stored.clone())?;
            self.applied_seq = stored.seq;
        }
        self.write_file()?;
        Ok(self.applied_seq)
    }

    fn write_station(&mut self, station: &StationInfo) -> PersistResult<()> {
        if &self.station != station {
            self.station = station.clone();
            self.write_file()?;
        }
        Ok(())
    }
}
