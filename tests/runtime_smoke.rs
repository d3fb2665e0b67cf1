use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use tokio::sync::broadcast;

use termlog::{
    config::StationInfo,
    dupe::DupeStatus,
    engine::{ModeConfig, PotaActivationConfig, Progress},
    error::{LogbookError, StorageError},
    logbook::Logbook,
    op::StoredOp,
    persist::{OpSink, PersistResult, sqlite::SqliteOpSink},
    qso::QsoDraft,
    runtime::{LogEvent, RuntimeConfig, RuntimeError, spawn_logbook},
    types::OpSeq,
};

fn draft(call: &str, min: u32) -> QsoDraft {
    let ts = Utc.with_ymd_and_hms(2024, 6, 22, 18, min, 0).unwrap();
    QsoDraft::new(call, "14.025", "CW", ts)
}

async fn next_matching(
    sub: &mut broadcast::Receiver<LogEvent>,
    pred: impl Fn(&LogEvent) -> bool,
) -> LogEvent {
    loop {
        let evt = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .expect("event timeout")
            .expect("recv");
        if pred(&evt) {
            return evt;
        }
    }
}

struct SlowSink {
    seen: Arc<Mutex<Vec<OpSeq>>>,
    delay: Duration,
}

impl OpSink for SlowSink {
    fn append_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq> {
        std::thread::sleep(self.delay);
        let mut seen = self.seen.lock().expect("lock");
        for op in ops {
            seen.push(op.seq);
        }
        Ok(ops.last().map(|o| o.seq).unwrap_or(0))
    }
}

struct FlakySink {
    failures_left: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<OpSeq>>>,
}

impl OpSink for FlakySink {
    fn append_ops(&mut self, ops: &[StoredOp]) -> PersistResult<OpSeq> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StorageError::Message("disk unplugged".to_string()));
        }
        let mut seen = self.seen.lock().expect("lock");
        seen.extend(ops.iter().map(|o| o.seq));
        Ok(ops.last().map(|o| o.seq).unwrap_or(0))
    }
}

#[tokio::test]
async fn runtime_submit_edit_query_and_events_ordered() {
    let handle = spawn_logbook(Logbook::default(), None, RuntimeConfig::default());
    let mut sub = handle.subscribe();

    let logged = handle.submit_qso(draft("K1ABC", 0)).await.expect("submit");
    let id = logged.record.id;
    handle.edit(id, draft("K1XYZ", 0)).await.expect("edit");
    let dupe = handle.submit_qso(draft("k1xyz", 1)).await.expect("submit");
    assert_eq!(dupe.dupe, DupeStatus::Duplicate);

    let rec = handle.get(id).await.expect("get").expect("record");
    assert_eq!(rec.callsign, "K1XYZ");
    assert_eq!(handle.by_call("K1XYZ").await.expect("by_call").len(), 2);
    assert_eq!(handle.count().await.expect("count"), 2);
    assert_eq!(handle.recent(1).await.expect("recent")[0].id, dupe.record.id);

    let mut seen = Vec::new();
    while seen.len() < 3 {
        let evt = next_matching(&mut sub, |e| !matches!(e, LogEvent::DurableUpTo { .. })).await;
        seen.push(evt);
    }
    assert_eq!(
        seen,
        vec![
            LogEvent::QsoLogged {
                id,
                dupe: DupeStatus::Unique
            },
            LogEvent::QsoEdited { id },
            LogEvent::QsoLogged {
                id: dupe.record.id,
                dupe: DupeStatus::Duplicate
            },
        ]
    );

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn errors_come_back_through_the_handle() {
    let handle = spawn_logbook(Logbook::default(), None, RuntimeConfig::default());

    let err = handle.submit_qso(draft("", 0)).await.expect_err("no call");
    assert!(matches!(err, RuntimeError::Logbook(LogbookError::InvalidRecord(_))));

    let err = handle.delete(42).await.expect_err("missing");
    assert!(matches!(err, RuntimeError::Logbook(LogbookError::NoSuchQso(42))));

    let err = handle.export_cabrillo().await.expect_err("no contest");
    assert!(matches!(err, RuntimeError::Logbook(LogbookError::NoContestSession)));

    let err = handle.import_adif("<CALL:9>K1<EOR>").await.expect_err("bad adif");
    assert!(matches!(err, RuntimeError::Logbook(LogbookError::AdifParse(_))));

    handle.shutdown().await.expect("shutdown");
    assert!(matches!(handle.count().await, Err(RuntimeError::ChannelClosed)));
}

#[tokio::test]
async fn mode_lifecycle_is_broadcast() {
    let handle = spawn_logbook(Logbook::default(), None, RuntimeConfig::default());
    let mut sub = handle.subscribe();

    let session = handle
        .start_mode(ModeConfig::PotaActivation(PotaActivationConfig::single("K-1234")))
        .await
        .expect("start");
    for i in 0..3 {
        handle.submit_qso(draft(&format!("W{i}AA"), i)).await.expect("submit");
    }
    assert!(matches!(
        handle.progress().await.expect("progress"),
        Progress::PotaActivation { contacts: 3, remaining: 7, .. }
    ));
    let last = handle.end_mode().await.expect("end");
    assert_eq!(handle.progress().await.expect("progress"), Progress::Inactive);

    let started = next_matching(&mut sub, |e| matches!(e, LogEvent::ModeStarted { .. })).await;
    assert_eq!(started, LogEvent::ModeStarted { session });
    let ended = next_matching(&mut sub, |e| matches!(e, LogEvent::ModeEnded { .. })).await;
    assert_eq!(ended, LogEvent::ModeEnded { progress: last });

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn import_reports_and_broadcasts_count() {
    let handle = spawn_logbook(Logbook::default(), None, RuntimeConfig::default());
    let mut sub = handle.subscribe();

    let text = "<CALL:5>W1ABC<FREQ:6>14.250<MODE:3>SSB<QSO_DATE:8>20240622<TIME_ON:4>1830<EOR>\
        <CALL:4>K2XY<FREQ:5>7.074<MODE:3>FT8<QSO_DATE:8>20240622<TIME_ON:4>1900<EOR>";
    let report = handle.import_adif(text).await.expect("import");
    assert_eq!(report.imported, 2);

    let evt = next_matching(&mut sub, |e| matches!(e, LogEvent::Imported { .. })).await;
    assert_eq!(evt, LogEvent::Imported { count: 2 });

    let again = handle.import_adif(text).await.expect("import again");
    assert_eq!((again.imported, again.skipped_duplicate), (0, 2));
    let exported = handle.export_adif(Default::default()).await.expect("export");
    assert_eq!(exported.matches("<EOR>").count(), 2);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn durable_event_advances_with_slow_sink() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = SlowSink {
        seen: Arc::clone(&seen),
        delay: Duration::from_millis(50),
    };

    let cfg = RuntimeConfig {
        flush_on_append: false,
        batch_max_ops: 4,
        batch_max_latency_ms: 100,
        persist_queue_bound: 1,
        snapshot_every_ops: 0,
        compact_after_snapshot: false,
    };

    let handle = spawn_logbook(Logbook::default(), Some(Box::new(sink)), cfg);
    let mut sub = handle.subscribe();

    for i in 0..10u32 {
        handle.submit_qso(draft(&format!("K{i}AA"), i)).await.expect("submit");
    }

    let durable = next_matching(&mut sub, |e| matches!(e, LogEvent::DurableUpTo { .. })).await;
    assert!(matches!(durable, LogEvent::DurableUpTo { op_seq } if op_seq >= 1));

    assert_eq!(handle.flush().await.expect("flush"), 10);
    handle.shutdown().await.expect("shutdown");
    assert_eq!(*seen.lock().expect("lock"), (1..=10).collect::<Vec<OpSeq>>());
}

#[tokio::test]
async fn failed_write_is_reported_and_retried() {
    let failures_left = Arc::new(AtomicUsize::new(1));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = FlakySink {
        failures_left: Arc::clone(&failures_left),
        seen: Arc::clone(&seen),
    };

    let handle = spawn_logbook(Logbook::default(), Some(Box::new(sink)), RuntimeConfig::default());
    let mut sub = handle.subscribe();

    handle.submit_qso(draft("K1ABC", 0)).await.expect("submit stays in memory");
    let failed = next_matching(&mut sub, |e| matches!(e, LogEvent::StorageFailed { .. })).await;
    assert!(matches!(failed, LogEvent::StorageFailed { message } if message.contains("disk unplugged")));
    assert_eq!(handle.count().await.expect("count"), 1);

    assert_eq!(handle.flush().await.expect("retry"), 1);
    assert_eq!(failures_left.load(Ordering::SeqCst), 0);
    assert_eq!(*seen.lock().expect("lock"), vec![1]);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn sqlite_runtime_persists_log_and_station() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("runtime.db");
    let station = StationInfo {
        callsign: "W1AW".to_string(),
        ..StationInfo::default()
    };

    let sink = SqliteOpSink::open(&db_path).expect("open");
    let handle = spawn_logbook(
        Logbook::new(station.clone()),
        Some(Box::new(sink)),
        RuntimeConfig::default(),
    );
    for i in 0..3u32 {
        handle.submit_qso(draft(&format!("N{i}XX"), i)).await.expect("submit");
    }
    handle.delete(2).await.expect("delete");
    handle.checkpoint().await.expect("checkpoint");
    handle.submit_qso(draft("N9XX", 9)).await.expect("submit");

    let mut renamed = station.clone();
    renamed.name = Some("Hiram".to_string());
    handle.set_station(renamed.clone()).await.expect("station");
    handle.shutdown().await.expect("shutdown");

    let reopened = SqliteOpSink::open(&db_path).expect("reopen");
    let store = reopened.load_store().expect("load");
    let calls: Vec<&str> = store.iter().map(|r| r.callsign.as_str()).collect();
    assert_eq!(calls, vec!["N0XX", "N2XX", "N9XX"]);
    assert_eq!(reopened.load_station().expect("station"), Some(renamed));
}
