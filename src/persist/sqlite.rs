//! SQLite journal: one row per op, periodic full snapshots, and a small
//! key/value table for station metadata.
//!
//! Loading takes the newest snapshot and replays the rows after it. Rows are
//! keyed by op sequence, so re-sending a batch after a failed write replaces
//! rows instead of duplicating them.

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Params, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    config::StationInfo,
    core::store::{LogStore, StoreSnapshotV1},
    error::StorageError,
    op::{OP_FORMAT_VERSION, Op, StoredOp, StoredOpEnvelope},
    types::{OpSeq, QsoId},
};

use super::{OpSink, PersistResult};

const SNAPSHOT_VERSION: u16 = 1;
const STATION_KEY: &str = "station";

#[derive(Serialize, Deserialize)]
struct SnapshotBlob {
    version: u16,
    snapshot: StoreSnapshotV1,
}

/// [`OpSink`] backed by a SQLite database file.
pub struct SqliteOpSink {
    conn: Connection,
}

impl SqliteOpSink {
    /// Opens or creates the log database at `path`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let path = path.as_ref();
        let sink = Self::prepare(Connection::open(path)?)?;
        debug!(path = %path.display(), "opened sqlite log");
        Ok(sink)
    }

    /// Database that lives only as long as the sink.
    pub fn open_in_memory() -> PersistResult<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> PersistResult<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self { conn })
    }

    /// Rebuilds the log: newest snapshot, then every op recorded after it.
    pub fn load_store(&self) -> PersistResult<LogStore> {
        let mut store = self
            .newest_snapshot()?
            .map(LogStore::from_snapshot)
            .transpose()?
            .unwrap_or_else(LogStore::new);

        let tail = self.load_events_after(store.latest_op_seq())?;
        let replayed = tail.len();
        for stored in tail {
            store.apply_replayed_op(stored)?;
        }
        info!(records = store.len(), replayed, "loaded log from sqlite");
        Ok(store)
    }

    /// Journal rows with a sequence above `seq`, in sequence order.
    pub fn load_events_after(&self, seq: OpSeq) -> PersistResult<Vec<StoredOp>> {
        self.query_ops(
            "SELECT seq, ts_ms, payload FROM events WHERE seq > ?1 ORDER BY seq",
            params![seq as i64],
        )
    }

    /// Every journaled change to one contact, oldest first.
    ///
    /// Rows removed by compaction are gone; the snapshot only keeps the
    /// latest contents.
    pub fn history(&self, id: QsoId) -> PersistResult<Vec<StoredOp>> {
        self.query_ops(
            "SELECT seq, ts_ms, payload FROM events WHERE qso_id = ?1 ORDER BY seq",
            params![id as i64],
        )
    }

    fn query_ops(&self, sql: &str, args: impl Params) -> PersistResult<Vec<StoredOp>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(args, |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, Vec<u8>>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(seq, ts_ms, payload)| {
                let mut stored = decode_op(&payload)?;
                stored.seq = seq as OpSeq;
                stored.ts_ms = ts_ms as u64;
                Ok(stored)
            })
            .collect()
    }

    /// Records a full image of the log as of `last_seq`.
    pub fn write_snapshot(&mut self, snapshot: &StoreSnapshotV1, last_seq: OpSeq) -> PersistResult<()> {
        let payload = serde_json::to_vec(&SnapshotBlob {
            version: SNAPSHOT_VERSION,
            snapshot: snapshot.clone(),
        })?;
        self.conn.execute(
            "INSERT INTO snapshots(last_seq, records, ts_ms, payload) VALUES (?1, ?2, ?3, ?4)",
            params![
                last_seq as i64,
                snapshot.records.len() as i64,
                Utc::now().timestamp_millis(),
                payload
            ],
        )?;
        info!(last_seq, records = snapshot.records.len(), "wrote log snapshot");
        Ok(())
    }

    /// Drops journal rows a snapshot already covers.
    pub fn compact_through(&mut self, seq: OpSeq) -> PersistResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM events WHERE seq <= ?1", params![seq as i64])?;
        debug!(seq, removed, "compacted journal");
        Ok(removed)
    }

    /// Highest journaled sequence, 0 for an empty journal.
    pub fn latest_seq(&self) -> PersistResult<OpSeq> {
        let seq: i64 = self
            .conn
            .query_row("SELECT COALESCE(MAX(seq), 0) FROM events", [], |row| row.get(0))?;
        Ok(seq as OpSeq)
    }

    /// Station metadata last stored with [`OpSink::write_station`].
    pub fn load_station(&self) -> PersistResult<Option<StationInfo>> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM metadata WHERE key = ?1",
                [STATION_KEY],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn newest_snapshot(&self) -> PersistResult<Option<StoreSnapshotV1>> {
        let blob: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT payload FROM snapshots ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        let Some(blob) = blob else {
            return Ok(None);
        };

        let decoded: SnapshotBlob = serde_json::from_slice(&blob)?;
        if decoded.version != SNAPSHOT_VERSION {
            return Err(StorageError::Message(format!(
                "snapshot version {} is not supported",
                decoded.version
            )));
        }
        Ok(Some(decoded.snapshot))
    }
}

impl OpSink for SqliteOpSink {
    fn append_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq> {
        let Some(last) = ops.last() else {
            return self.latest_seq();
        };

        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT OR REPLACE INTO events(seq, ts_ms, kind, qso_id, callsign, payload)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for stored in ops {
                let payload = serde_json::to_vec(&StoredOpEnvelope::new(stored.clone()))?;
                insert.execute(params![
                    stored.seq as i64,
                    stored.ts_ms as i64,
                    op_kind(&stored.op),
                    stored.op.qso_id() as i64,
                    op_callsign(&stored.op),
                    payload,
                ])?;
            }
        }
        tx.commit()?;
        debug!(ops = ops.len(), last_seq = last.seq, "journaled ops");
        Ok(last.seq)
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.conn.execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }

    fn write_snapshot(&mut self, snapshot: &StoreSnapshotV1, last_seq: OpSeq) -> PersistResult<()> {
        SqliteOpSink::write_snapshot(self, snapshot, last_seq)
    }

    fn compact_through(&mut self, seq: OpSeq) -> PersistResult<usize> {
        SqliteOpSink::compact_through(self, seq)
    }

    fn write_station(&mut self, station: &StationInfo) -> PersistResult<()> {
        self.conn.execute(
            "INSERT INTO metadata(key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![STATION_KEY, serde_json::to_string(station)?],
        )?;
        debug!(callsign = %station.callsign, "stored station metadata");
        Ok(())
    }
}

fn op_kind(op: &Op) -> &'static str {
    match op {
        Op::Append { .. } => "append",
        Op::Replace { .. } => "replace",
        Op::Remove { .. } => "remove",
    }
}

/// Callsign after the op; the removed record's for a delete.
fn op_callsign(op: &Op) -> &str {
    match op {
        Op::Append { qso } | Op::Replace { qso, .. } => &qso.callsign,
        Op::Remove { prev, .. } => &prev.callsign,
    }
}

fn decode_op(payload: &[u8]) -> PersistResult<StoredOp> {
    let envelope: StoredOpEnvelope = serde_json::from_slice(payload)?;
    if envelope.format_version != OP_FORMAT_VERSION {
        return Err(StorageError::Message(format!(
            "op format version {} is not supported",
            envelope.format_version
        )));
    }
    Ok(envelope.stored)
}
