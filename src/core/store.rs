use chrono::Utc;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    op::{Op, StoredOp},
    qso::QsoRecord,
    types::{Band, Mode, OpSeq, QsoId, SessionId},
};

use super::indices::{remove_from_vec_index, DupeKey, VecIndex};

/// Store-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with this id.
    #[error("no QSO with id {0}")]
    MissingQso(QsoId),
    /// Replay tried to insert an id twice.
    #[error("QSO {0} already exists")]
    AlreadyExists(QsoId),
}

/// Serializable image of the whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshotV1 {
    /// Next id to hand out.
    pub next_qso_id: QsoId,
    /// Next journal sequence.
    pub next_op_seq: OpSeq,
    /// Records in insertion order.
    pub records: Vec<QsoRecord>,
}

/// Ordered, append-mostly QSO collection with dupe and callsign indices.
///
/// Ids are handed out in insertion order and never reused. Every mutation
/// also queues a [`StoredOp`] for the journal; see [`LogStore::drain_pending_ops`].
#[derive(Debug, Default)]
pub struct LogStore {
    records: HashMap<QsoId, QsoRecord>,
    order: Vec<QsoId>,
    pos: HashMap<QsoId, usize>,
    by_key: VecIndex<DupeKey>,
    by_call: VecIndex<String>,
    pending_ops: Vec<StoredOp>,
    next_op_seq: OpSeq,
    next_qso_id: QsoId,
}

impl LogStore {
    /// Empty store.
    pub fn new() -> Self {
        Self {
            next_op_seq: 1,
            next_qso_id: 1,
            ..Self::default()
        }
    }

    /// Rebuilds a store and its indices from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshotV1) -> Result<Self, StoreError> {
        let mut store = Self {
            next_qso_id: snapshot.next_qso_id,
            next_op_seq: snapshot.next_op_seq,
            ..Self::default()
        };

        for rec in snapshot.records {
            if store.records.contains_key(&rec.id) {
                return Err(StoreError::AlreadyExists(rec.id));
            }
            store.link(rec);
        }

        Ok(store)
    }

    /// Captures the store for a checkpoint.
    pub fn export_snapshot(&self) -> StoreSnapshotV1 {
        StoreSnapshotV1 {
            next_qso_id: self.next_qso_id,
            next_op_seq: self.next_op_seq,
            records: self.all().into_iter().cloned().collect(),
        }
    }

    /// Appends `record` under the next sequence id and returns that id.
    pub fn append(&mut self, mut record: QsoRecord) -> QsoId {
        let id = self.next_qso_id;
        self.next_qso_id += 1;
        record.id = id;

        self.link(record.clone());
        let seq = self.take_next_op_seq();
        self.push_op(seq, Op::Append { qso: record });
        id
    }

    /// Replaces the contents of `id`, keeping its id and position.
    pub fn replace(&mut self, id: QsoId, mut record: QsoRecord) -> Result<(), StoreError> {
        record.id = id;
        let prev = self.unlink_indices(id)?;
        self.link_indices(&record);
        self.records.insert(id, record.clone());

        let seq = self.take_next_op_seq();
        self.push_op(seq, Op::Replace { qso: record, prev });
        Ok(())
    }

    /// Deletes `id` and returns its last contents.
    pub fn remove(&mut self, id: QsoId) -> Result<QsoRecord, StoreError> {
        let prev = self.unlink(id)?;
        let seq = self.take_next_op_seq();
        self.push_op(
            seq,
            Op::Remove {
                id,
                prev: prev.clone(),
            },
        );
        Ok(prev)
    }

    /// Re-applies a journaled op without queueing it again.
    pub fn apply_replayed_op(&mut self, stored: StoredOp) -> Result<(), StoreError> {
        match stored.op {
            Op::Append { qso } => {
                if self.records.contains_key(&qso.id) {
                    return Err(StoreError::AlreadyExists(qso.id));
                }
                self.next_qso_id = self.next_qso_id.max(qso.id.saturating_add(1));
                self.link(qso);
            }
            Op::Replace { qso, .. } => {
                let id = qso.id;
                self.unlink_indices(id)?;
                self.link_indices(&qso);
                self.records.insert(id, qso);
            }
            Op::Remove { id, .. } => {
                self.unlink(id)?;
            }
        }
        self.bump_next_seq_from(stored.seq);
        Ok(())
    }

    /// Record by id.
    pub fn get(&self, id: QsoId) -> Option<&QsoRecord> {
        self.records.get(&id)
    }

    /// Owned copy of a record.
    pub fn get_cloned(&self, id: QsoId) -> Option<QsoRecord> {
        self.get(id).cloned()
    }

    /// Every record in insertion order.
    pub fn all(&self) -> Vec<&QsoRecord> {
        self.iter().collect()
    }

    /// Iterates records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &QsoRecord> + '_ {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Prior records sharing callsign, band and mode, oldest first.
    pub fn find_duplicate_candidates(&self, call: &str, band: Band, mode: &Mode) -> Vec<&QsoRecord> {
        let key = DupeKey::new(call, band, mode);
        self.ids_in_order(self.by_key.get(&key))
    }

    /// Records with this callsign on any band or mode, oldest first.
    pub fn by_call(&self, call: &str) -> Vec<&QsoRecord> {
        let call = call.trim().to_ascii_uppercase();
        self.ids_in_order(self.by_call.get(&call))
    }

    /// Owned variant of [`LogStore::by_call`].
    pub fn by_call_cloned(&self, call: &str) -> Vec<QsoRecord> {
        self.by_call(call).into_iter().cloned().collect()
    }

    /// The `n` newest records, oldest first.
    pub fn recent(&self, n: usize) -> Vec<&QsoRecord> {
        let start = self.order.len().saturating_sub(n);
        self.order[start..]
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// Owned variant of [`LogStore::recent`].
    pub fn recent_cloned(&self, n: usize) -> Vec<QsoRecord> {
        self.recent(n).into_iter().cloned().collect()
    }

    /// Records logged under `session`, in insertion order.
    pub fn by_session(&self, session: SessionId) -> impl Iterator<Item = &QsoRecord> + '_ {
        self.iter().filter(move |r| r.session_id == Some(session))
    }

    /// Highest session id seen on any record.
    pub fn max_session_id(&self) -> Option<SessionId> {
        self.records.values().filter_map(|r| r.session_id).max()
    }

    /// Insertion position of `id`.
    pub fn position(&self, id: QsoId) -> Option<usize> {
        self.pos.get(&id).copied()
    }

    /// Ids in insertion order.
    pub fn ordered_ids(&self) -> &[QsoId] {
        &self.order
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when nothing is logged.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Takes the ops queued since the last drain.
    pub fn drain_pending_ops(&mut self) -> Vec<StoredOp> {
        std::mem::take(&mut self.pending_ops)
    }

    /// Sequence number of the latest op.
    pub fn latest_op_seq(&self) -> OpSeq {
        self.next_op_seq.saturating_sub(1)
    }

    fn ids_in_order(&self, ids: Option<&Vec<QsoId>>) -> Vec<&QsoRecord> {
        let mut out: Vec<&QsoRecord> = ids
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.records.get(id))
            .collect();
        out.sort_by_key(|r| self.pos.get(&r.id).copied().unwrap_or(usize::MAX));
        out
    }

    fn link(&mut self, rec: QsoRecord) {
        let id = rec.id;
        self.link_indices(&rec);
        self.pos.insert(id, self.order.len());
        self.order.push(id);
        self.records.insert(id, rec);
    }

    fn unlink(&mut self, id: QsoId) -> Result<QsoRecord, StoreError> {
        self.unlink_indices(id)?;
        let rec = self.records.remove(&id).ok_or(StoreError::MissingQso(id))?;
        if let Some(at) = self.pos.remove(&id) {
            self.order.remove(at);
            for (offset, later) in self.order[at..].iter().enumerate() {
                self.pos.insert(*later, at + offset);
            }
        }
        Ok(rec)
    }

    fn link_indices(&mut self, rec: &QsoRecord) {
        self.by_key
            .entry(DupeKey::new(&rec.callsign, rec.band(), &rec.mode))
            .or_default()
            .push(rec.id);
        self.by_call
            .entry(rec.callsign.clone())
            .or_default()
            .push(rec.id);
    }

    fn unlink_indices(&mut self, id: QsoId) -> Result<QsoRecord, StoreError> {
        let rec = self.records.get(&id).ok_or(StoreError::MissingQso(id))?.clone();
        remove_from_vec_index(
            &mut self.by_key,
            &DupeKey::new(&rec.callsign, rec.band(), &rec.mode),
            id,
        );
        remove_from_vec_index(&mut self.by_call, &rec.callsign, id);
        Ok(rec)
    }

    fn push_op(&mut self, seq: OpSeq, op: Op) {
        self.pending_ops.push(StoredOp {
            seq,
            ts_ms: Utc::now().timestamp_millis().max(0) as u64,
            op,
        });
    }

    fn take_next_op_seq(&mut self) -> OpSeq {
        let seq = self.next_op_seq;
        self.next_op_seq += 1;
        seq
    }

    fn bump_next_seq_from(&mut self, seq: OpSeq) {
        self.next_op_seq = self.next_op_seq.max(seq.saturating_add(1));
    }
}
