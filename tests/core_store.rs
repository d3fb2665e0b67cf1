use chrono::{DateTime, TimeZone, Utc};

use termlog::{
    core::store::{LogStore, StoreError},
    op::Op,
    qso::{QsoDraft, QsoRecord},
    types::{Band, Mode},
};

fn at(min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 22, 18, min, 0).unwrap()
}

fn rec(call: &str, freq: &str, mode: &str, min: u32) -> QsoRecord {
    QsoDraft::new(call, freq, mode, at(min)).validate().expect("valid")
}

fn calls(records: &[&QsoRecord]) -> Vec<String> {
    records.iter().map(|r| r.callsign.clone()).collect()
}

#[test]
fn append_assigns_increasing_ids_in_insertion_order() {
    let mut store = LogStore::new();
    let a = store.append(rec("W1ABC", "14.250", "SSB", 0));
    let b = store.append(rec("K2XY", "7.074", "FT8", 1));
    let c = store.append(rec("N3Q", "3.550", "CW", 2));

    assert_eq!((a, b, c), (1, 2, 3));
    assert_eq!(calls(&store.all()), vec!["W1ABC", "K2XY", "N3Q"]);
    assert_eq!(store.get(b).map(|r| r.id), Some(b));
    assert_eq!(store.len(), 3);
}

#[test]
fn ids_are_not_reused_after_remove() {
    let mut store = LogStore::new();
    let a = store.append(rec("W1ABC", "14.250", "SSB", 0));
    store.remove(a).expect("remove");
    let b = store.append(rec("W1ABC", "14.250", "SSB", 1));
    assert_eq!(b, a + 1);
    assert!(store.get(a).is_none());
}

#[test]
fn duplicate_candidates_use_call_band_and_mode() {
    let mut store = LogStore::new();
    store.append(rec("W1ABC", "14.250", "SSB", 0));
    store.append(rec("W1ABC", "14.300", "SSB", 1));
    store.append(rec("W1ABC", "7.200", "SSB", 2));
    store.append(rec("W1ABC", "14.030", "CW", 3));

    let hits = store.find_duplicate_candidates("w1abc", Band::B20m, &Mode::SSB);
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|r| r.band() == Band::B20m && r.mode == Mode::SSB));

    assert!(store.find_duplicate_candidates("K2XY", Band::B20m, &Mode::SSB).is_empty());
    assert_eq!(store.by_call("W1ABC").len(), 4);
}

#[test]
fn replace_keeps_position_and_moves_index_entries() {
    let mut store = LogStore::new();
    let a = store.append(rec("W1ABC", "14.250", "SSB", 0));
    store.append(rec("K2XY", "7.074", "FT8", 1));

    store
        .replace(a, rec("W1ABD", "21.300", "SSB", 0))
        .expect("replace");

    assert_eq!(calls(&store.all()), vec!["W1ABD", "K2XY"]);
    assert_eq!(store.get(a).map(|r| r.id), Some(a));
    assert!(store.find_duplicate_candidates("W1ABC", Band::B20m, &Mode::SSB).is_empty());
    assert_eq!(store.find_duplicate_candidates("W1ABD", Band::B15m, &Mode::SSB).len(), 1);
    assert!(store.by_call("W1ABC").is_empty());
}

#[test]
fn remove_unlinks_and_reports_missing_ids() {
    let mut store = LogStore::new();
    let a = store.append(rec("W1ABC", "14.250", "SSB", 0));
    let b = store.append(rec("K2XY", "7.074", "FT8", 1));
    let c = store.append(rec("N3Q", "3.550", "CW", 2));

    let removed = store.remove(b).expect("remove");
    assert_eq!(removed.callsign, "K2XY");
    assert_eq!(store.position(a), Some(0));
    assert_eq!(store.position(c), Some(1));
    assert_eq!(store.remove(b), Err(StoreError::MissingQso(b)));
    assert!(matches!(
        store.replace(b, rec("K2XY", "7.074", "FT8", 1)),
        Err(StoreError::MissingQso(_))
    ));
}

#[test]
fn recent_returns_tail_oldest_first() {
    let mut store = LogStore::new();
    for (i, call) in ["W1AA", "W1AB", "W1AC", "W1AD"].into_iter().enumerate() {
        store.append(rec(call, "14.250", "SSB", i as u32));
    }
    assert_eq!(calls(&store.recent(2)), vec!["W1AC", "W1AD"]);
    assert_eq!(store.recent(10).len(), 4);
}

#[test]
fn journal_ops_replay_into_identical_store() {
    let mut store = LogStore::new();
    let a = store.append(rec("W1ABC", "14.250", "SSB", 0));
    let b = store.append(rec("K2XY", "7.074", "FT8", 1));
    store
        .replace(a, rec("W1ABC", "14.260", "SSB", 0))
        .expect("replace");
    store.remove(b).expect("remove");
    store.append(rec("N3Q", "3.550", "CW", 2));

    let ops = store.drain_pending_ops();
    assert_eq!(ops.len(), 5);
    assert!(ops.windows(2).all(|w| w[1].seq == w[0].seq + 1));
    assert!(matches!(ops[2].op, Op::Replace { .. }));
    assert!(store.drain_pending_ops().is_empty());

    let mut replayed = LogStore::new();
    for op in ops {
        replayed.apply_replayed_op(op).expect("replay");
    }
    assert_eq!(replayed.all(), store.all());
    assert_eq!(replayed.latest_op_seq(), store.latest_op_seq());
    assert!(replayed.drain_pending_ops().is_empty());
}

#[test]
fn snapshot_restores_records_and_counters() {
    let mut store = LogStore::new();
    store.append(rec("W1ABC", "14.250", "SSB", 0));
    store.append(rec("K2XY", "7.074", "FT8", 1));

    let restored = LogStore::from_snapshot(store.export_snapshot()).expect("restore");
    assert_eq!(restored.all(), store.all());
    assert_eq!(
        restored.find_duplicate_candidates("K2XY", Band::B40m, &Mode::FT8).len(),
        1
    );

    let mut restored = restored;
    assert_eq!(restored.append(rec("N3Q", "3.550", "CW", 2)), 3);
}
