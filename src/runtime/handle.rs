use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{
    sync::{Mutex, broadcast, mpsc, oneshot},
    time::{Duration, Instant},
};
use tracing::{debug, warn};

use crate::{
    adif::{ExportFilter, ImportReport},
    config::StationInfo,
    core::store::StoreSnapshotV1,
    dupe::DupeStatus,
    engine::{ModeConfig, Progress, SessionHandle},
    error::{LogbookError, StorageError},
    logbook::{Logbook, Submitted},
    op::{Op, StoredOp},
    persist::OpSink,
    qso::{QsoDraft, QsoRecord},
    types::{OpSeq, QsoId},
};

use super::events::LogEvent;

/// Failures seen through a [`LogbookHandle`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The logbook rejected the request.
    #[error(transparent)]
    Logbook(#[from] LogbookError),
    /// Persistence failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The logbook task has stopped.
    #[error("logbook task is not running")]
    ChannelClosed,
}

/// Journaling knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Write each appended QSO immediately instead of batching.
    pub flush_on_append: bool,
    /// Largest batch handed to the sink.
    pub batch_max_ops: usize,
    /// Longest an op waits in a batch.
    pub batch_max_latency_ms: u64,
    /// Capacity of the queue feeding the persistence task.
    pub persist_queue_bound: usize,
    /// Snapshot after this many mutations; 0 disables.
    pub snapshot_every_ops: usize,
    /// Drop journal entries covered by a snapshot.
    pub compact_after_snapshot: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            flush_on_append: true,
            batch_max_ops: 32,
            batch_max_latency_ms: 75,
            persist_queue_bound: 64,
            snapshot_every_ops: 2000,
            compact_after_snapshot: false,
        }
    }
}

/// Cloneable async front end to a [`Logbook`] running in its own task.
#[derive(Clone)]
pub struct LogbookHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<LogEvent>,
}

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Submit {
        draft: QsoDraft,
        resp: Reply<Result<Submitted, LogbookError>>,
    },
    CheckDupe {
        draft: QsoDraft,
        resp: Reply<Result<DupeStatus, LogbookError>>,
    },
    StartMode {
        config: ModeConfig,
        resp: Reply<Result<SessionHandle, LogbookError>>,
    },
    EndMode {
        resp: Reply<Progress>,
    },
    Progress {
        resp: Reply<Progress>,
    },
    Import {
        text: String,
        resp: Reply<Result<ImportReport, LogbookError>>,
    },
    ExportAdif {
        filter: ExportFilter,
        resp: Reply<String>,
    },
    ExportCabrillo {
        resp: Reply<Result<String, LogbookError>>,
    },
    Edit {
        id: QsoId,
        draft: QsoDraft,
        resp: Reply<Result<QsoRecord, LogbookError>>,
    },
    Delete {
        id: QsoId,
        resp: Reply<Result<QsoRecord, LogbookError>>,
    },
    Get {
        id: QsoId,
        resp: Reply<Option<QsoRecord>>,
    },
    Recent {
        n: usize,
        resp: Reply<Vec<QsoRecord>>,
    },
    ByCall {
        call: String,
        resp: Reply<Vec<QsoRecord>>,
    },
    Count {
        resp: Reply<usize>,
    },
    SetStation {
        station: StationInfo,
        resp: Reply<Result<(), RuntimeError>>,
    },
    Flush {
        resp: Reply<Result<OpSeq, RuntimeError>>,
    },
    Checkpoint {
        resp: Reply<Result<(), RuntimeError>>,
    },
    Shutdown {
        resp: Reply<Result<(), RuntimeError>>,
    },
}

enum Wake {
    Command(Option<Command>),
    Durable(Option<Result<OpSeq, String>>),
}

enum WriterMsg {
    Op(StoredOp),
    Station {
        station: StationInfo,
        resp: Reply<Result<(), StorageError>>,
    },
    Flush {
        resp: Reply<Result<OpSeq, StorageError>>,
    },
    Checkpoint {
        snapshot: StoreSnapshotV1,
        last_seq: OpSeq,
        compact: bool,
        resp: Reply<Result<(), StorageError>>,
    },
    Shutdown {
        resp: Reply<()>,
    },
}

/// Moves `logbook` into a background task and returns a handle to it.
///
/// With a sink, journaled ops are batched to it from a second task and the
/// station metadata is written once at startup. Must be called inside a
/// tokio runtime.
pub fn spawn_logbook(
    logbook: Logbook,
    sink: Option<Box<dyn OpSink>>,
    config: RuntimeConfig,
) -> LogbookHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(256);
    let (events_tx, _) = broadcast::channel::<LogEvent>(1024);

    let (writer_tx, mut durable_rx) = if let Some(sink) = sink {
        let (to_writer, from_actor) = mpsc::channel::<WriterMsg>(config.persist_queue_bound.max(1));
        let (durable_tx, durable_rx) = mpsc::unbounded_channel::<Result<OpSeq, String>>();
        spawn_writer(
            sink,
            logbook.station().clone(),
            from_actor,
            durable_tx,
            config.clone(),
        );
        (Some(to_writer), Some(durable_rx))
    } else {
        (None, None)
    };

    let actor_events = events_tx.clone();

    tokio::spawn(async move {
        let mut logbook = logbook;
        let mut ops_since_checkpoint = 0usize;

        loop {
            let wake = match durable_rx.as_mut() {
                Some(rx) => tokio::select! {
                    cmd = cmd_rx.recv() => Wake::Command(cmd),
                    durable = rx.recv() => Wake::Durable(durable),
                },
                None => Wake::Command(cmd_rx.recv().await),
            };
            let cmd = match wake {
                Wake::Command(Some(cmd)) => cmd,
                Wake::Command(None) => break,
                Wake::Durable(Some(Ok(op_seq))) => {
                    let _ = actor_events.send(LogEvent::DurableUpTo { op_seq });
                    continue;
                }
                Wake::Durable(Some(Err(message))) => {
                    let _ = actor_events.send(LogEvent::StorageFailed { message });
                    continue;
                }
                Wake::Durable(None) => {
                    durable_rx = None;
                    continue;
                }
            };

            let done = handle_command(
                cmd,
                &mut logbook,
                &actor_events,
                writer_tx.as_ref(),
                &config,
                &mut ops_since_checkpoint,
            )
            .await;
            if done {
                break;
            }
        }
        debug!("logbook task stopped");
    });

    LogbookHandle { cmd_tx, events_tx }
}

impl LogbookHandle {
    /// Subscribes to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<LogEvent> {
        self.events_tx.subscribe()
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// See [`Logbook::submit_qso`].
    pub async fn submit_qso(&self, draft: QsoDraft) -> Result<Submitted, RuntimeError> {
        Ok(self.request(|resp| Command::Submit { draft, resp }).await??)
    }

    /// See [`Logbook::check_dupe`].
    pub async fn check_dupe(&self, draft: QsoDraft) -> Result<DupeStatus, RuntimeError> {
        Ok(self.request(|resp| Command::CheckDupe { draft, resp }).await??)
    }

    /// See [`Logbook::start_mode`].
    pub async fn start_mode(&self, config: ModeConfig) -> Result<SessionHandle, RuntimeError> {
        Ok(self.request(|resp| Command::StartMode { config, resp }).await??)
    }

    /// See [`Logbook::end_mode`].
    pub async fn end_mode(&self) -> Result<Progress, RuntimeError> {
        self.request(|resp| Command::EndMode { resp }).await
    }

    /// See [`Logbook::get_progress`].
    pub async fn progress(&self) -> Result<Progress, RuntimeError> {
        self.request(|resp| Command::Progress { resp }).await
    }

    /// See [`Logbook::import_adif`].
    pub async fn import_adif(&self, text: impl Into<String>) -> Result<ImportReport, RuntimeError> {
        let text = text.into();
        Ok(self.request(|resp| Command::Import { text, resp }).await??)
    }

    /// See [`Logbook::export_adif`].
    pub async fn export_adif(&self, filter: ExportFilter) -> Result<String, RuntimeError> {
        self.request(|resp| Command::ExportAdif { filter, resp }).await
    }

    /// See [`Logbook::export_cabrillo`].
    pub async fn export_cabrillo(&self) -> Result<String, RuntimeError> {
        Ok(self.request(|resp| Command::ExportCabrillo { resp }).await??)
    }

    /// See [`Logbook::edit`].
    pub async fn edit(&self, id: QsoId, draft: QsoDraft) -> Result<QsoRecord, RuntimeError> {
        Ok(self.request(|resp| Command::Edit { id, draft, resp }).await??)
    }

    /// See [`Logbook::delete`].
    pub async fn delete(&self, id: QsoId) -> Result<QsoRecord, RuntimeError> {
        Ok(self.request(|resp| Command::Delete { id, resp }).await??)
    }

    /// Record `id`, if present.
    pub async fn get(&self, id: QsoId) -> Result<Option<QsoRecord>, RuntimeError> {
        self.request(|resp| Command::Get { id, resp }).await
    }

    /// Last `n` records, oldest first.
    pub async fn recent(&self, n: usize) -> Result<Vec<QsoRecord>, RuntimeError> {
        self.request(|resp| Command::Recent { n, resp }).await
    }

    /// Every contact with `call`.
    pub async fn by_call(&self, call: impl Into<String>) -> Result<Vec<QsoRecord>, RuntimeError> {
        let call = call.into();
        self.request(|resp| Command::ByCall { call, resp }).await
    }

    /// Records in the log.
    pub async fn count(&self) -> Result<usize, RuntimeError> {
        self.request(|resp| Command::Count { resp }).await
    }

    /// Replaces station metadata and persists it.
    pub async fn set_station(&self, station: StationInfo) -> Result<(), RuntimeError> {
        self.request(|resp| Command::SetStation { station, resp }).await?
    }

    /// Waits until every queued op is durable; returns the durable sequence.
    pub async fn flush(&self) -> Result<OpSeq, RuntimeError> {
        self.request(|resp| Command::Flush { resp }).await?
    }

    /// Writes a snapshot of the log.
    pub async fn checkpoint(&self) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Checkpoint { resp }).await?
    }

    /// Flushes and stops the task.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Shutdown { resp }).await?
    }
}

async fn handle_command(
    cmd: Command,
    logbook: &mut Logbook,
    events_tx: &broadcast::Sender<LogEvent>,
    to_writer: Option<&mpsc::Sender<WriterMsg>>,
    config: &RuntimeConfig,
    ops_since_checkpoint: &mut usize,
) -> bool {
    match cmd {
        Command::Submit { draft, resp } => {
            let res = logbook.submit_qso(draft).map_err(LogbookError::from);
            if let Ok(sub) = &res {
                let _ = events_tx.send(LogEvent::QsoLogged {
                    id: sub.record.id,
                    dupe: sub.dupe,
                });
            }
            let _ = resp.send(res);
        }
        Command::CheckDupe { draft, resp } => {
            let _ = resp.send(logbook.check_dupe(&draft).map_err(LogbookError::from));
        }
        Command::StartMode { config, resp } => {
            let res = logbook.start_mode(config).map_err(LogbookError::from);
            if let Ok(session) = &res {
                let _ = events_tx.send(LogEvent::ModeStarted {
                    session: session.clone(),
                });
            }
            let _ = resp.send(res);
        }
        Command::EndMode { resp } => {
            let progress = logbook.end_mode();
            let _ = events_tx.send(LogEvent::ModeEnded {
                progress: progress.clone(),
            });
            let _ = resp.send(progress);
        }
        Command::Progress { resp } => {
            let _ = resp.send(logbook.get_progress());
        }
        Command::Import { text, resp } => {
            let res = logbook.import_adif(&text).map_err(LogbookError::from);
            if let Ok(report) = &res {
                let _ = events_tx.send(LogEvent::Imported {
                    count: report.imported,
                });
            }
            let _ = resp.send(res);
        }
        Command::ExportAdif { filter, resp } => {
            let _ = resp.send(logbook.export_adif(&filter));
        }
        Command::ExportCabrillo { resp } => {
            let _ = resp.send(logbook.export_cabrillo());
        }
        Command::Edit { id, draft, resp } => {
            let res = logbook.edit(id, draft);
            if res.is_ok() {
                let _ = events_tx.send(LogEvent::QsoEdited { id });
            }
            let _ = resp.send(res);
        }
        Command::Delete { id, resp } => {
            let res = logbook.delete(id);
            if res.is_ok() {
                let _ = events_tx.send(LogEvent::QsoDeleted { id });
            }
            let _ = resp.send(res);
        }
        Command::Get { id, resp } => {
            let _ = resp.send(logbook.get(id).cloned());
        }
        Command::Recent { n, resp } => {
            let _ = resp.send(logbook.recent(n).into_iter().cloned().collect());
        }
        Command::ByCall { call, resp } => {
            let _ = resp.send(logbook.by_call(&call).into_iter().cloned().collect());
        }
        Command::Count { resp } => {
            let _ = resp.send(logbook.count());
        }
        Command::SetStation { station, resp } => {
            logbook.set_station(station.clone());
            let out = match to_writer {
                Some(tx) => {
                    let (st_tx, st_rx) = oneshot::channel();
                    roundtrip(tx, WriterMsg::Station { station, resp: st_tx }, st_rx).await
                }
                None => Ok(()),
            };
            let _ = resp.send(out);
        }
        Command::Flush { resp } => {
            let out = match to_writer {
                Some(tx) => {
                    let (flush_tx, flush_rx) = oneshot::channel();
                    roundtrip(tx, WriterMsg::Flush { resp: flush_tx }, flush_rx).await
                }
                None => Ok(logbook.store().latest_op_seq()),
            };
            let _ = resp.send(out);
        }
        Command::Checkpoint { resp } => {
            let out = match to_writer {
                Some(tx) => {
                    let (ack_tx, ack_rx) = oneshot::channel();
                    let msg = WriterMsg::Checkpoint {
                        snapshot: logbook.snapshot(),
                        last_seq: logbook.store().latest_op_seq(),
                        compact: config.compact_after_snapshot,
                        resp: ack_tx,
                    };
                    let out = roundtrip(tx, msg, ack_rx).await;
                    if out.is_ok() {
                        *ops_since_checkpoint = 0;
                    }
                    out
                }
                None => Ok(()),
            };
            let _ = resp.send(out);
        }
        Command::Shutdown { resp } => {
            let out = match to_writer {
                Some(tx) => {
                    let (done_tx, done_rx) = oneshot::channel();
                    if tx.send(WriterMsg::Shutdown { resp: done_tx }).await.is_err() {
                        Err(RuntimeError::ChannelClosed)
                    } else {
                        done_rx.await.map_err(|_| RuntimeError::ChannelClosed)
                    }
                }
                None => Ok(()),
            };
            let _ = resp.send(out);
            return true;
        }
    }

    let ops = logbook.drain_pending_ops();
    if !ops.is_empty() {
        *ops_since_checkpoint += ops.len();
        publish_ops(ops, logbook, events_tx, to_writer).await;
        checkpoint_if_due(logbook, to_writer, config, ops_since_checkpoint).await;
    }
    false
}

async fn roundtrip<T>(
    tx: &mpsc::Sender<WriterMsg>,
    msg: WriterMsg,
    rx: oneshot::Receiver<Result<T, StorageError>>,
) -> Result<T, RuntimeError> {
    tx.send(msg).await.map_err(|_| RuntimeError::ChannelClosed)?;
    rx.await
        .map_err(|_| RuntimeError::ChannelClosed)?
        .map_err(RuntimeError::from)
}

async fn publish_ops(
    ops: Vec<StoredOp>,
    logbook: &Logbook,
    events_tx: &broadcast::Sender<LogEvent>,
    to_writer: Option<&mpsc::Sender<WriterMsg>>,
) {
    let Some(tx) = to_writer else {
        let _ = events_tx.send(LogEvent::DurableUpTo {
            op_seq: logbook.store().latest_op_seq(),
        });
        return;
    };
    for stored in ops {
        if tx.send(WriterMsg::Op(stored)).await.is_err() {
            warn!("persistence task is gone; continuing in memory");
            let _ = events_tx.send(LogEvent::StorageFailed {
                message: "persistence task is not running".to_string(),
            });
            return;
        }
    }
}

fn spawn_writer(
    sink: Box<dyn OpSink>,
    station: StationInfo,
    mut rx: mpsc::Receiver<WriterMsg>,
    durable_tx: mpsc::UnboundedSender<Result<OpSeq, String>>,
    config: RuntimeConfig,
) {
    let sink = Arc::new(Mutex::new(sink));
    tokio::spawn(async move {
        let latency = Duration::from_millis(config.batch_max_latency_ms);
        let mut buf = Vec::<StoredOp>::new();
        let mut deadline = Instant::now() + latency;
        let mut durable_seq: OpSeq = 0;

        if let Err(err) = write_station(&sink, station).await {
            warn!(%err, "could not store station metadata");
            let _ = durable_tx.send(Err(err.to_string()));
        }

        loop {
            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else {
                        let _ = write_pending(&sink, &mut buf, &mut durable_seq, &durable_tx, true).await;
                        break;
                    };

                    match msg {
                        WriterMsg::Op(stored) => {
                            let is_append = matches!(stored.op, Op::Append { .. });
                            buf.push(stored);

                            if buf.len() >= config.batch_max_ops || (config.flush_on_append && is_append) {
                                let _ = write_pending(&sink, &mut buf, &mut durable_seq, &durable_tx, true).await;
                                deadline = Instant::now() + latency;
                            }
                        }
                        WriterMsg::Station { station, resp } => {
                            let _ = resp.send(write_station(&sink, station).await);
                        }
                        WriterMsg::Flush { resp } => {
                            let result = write_pending(&sink, &mut buf, &mut durable_seq, &durable_tx, true).await;
                            let _ = resp.send(result.map(|_| durable_seq));
                            deadline = Instant::now() + latency;
                        }
                        WriterMsg::Checkpoint { snapshot, last_seq, compact, resp } => {
                            let result = match write_pending(&sink, &mut buf, &mut durable_seq, &durable_tx, true).await {
                                Err(err) => Err(err),
                                Ok(()) => {
                                    let writer = Arc::clone(&sink);
                                    tokio::task::spawn_blocking(move || {
                                        let mut sink = writer.blocking_lock();
                                        sink.write_snapshot(&snapshot, last_seq)?;
                                        if compact {
                                            let removed = sink.compact_through(last_seq)?;
                                            debug!(removed, "compacted journal");
                                        }
                                        Result::<(), StorageError>::Ok(())
                                    })
                                    .await
                                    .unwrap_or_else(|e| Err(join_error(e)))
                                }
                            };
                            let _ = resp.send(result);
                            deadline = Instant::now() + latency;
                        }
                        WriterMsg::Shutdown { resp } => {
                            let _ = write_pending(&sink, &mut buf, &mut durable_seq, &durable_tx, true).await;
                            let _ = resp.send(());
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline), if !buf.is_empty() => {
                    let _ = write_pending(&sink, &mut buf, &mut durable_seq, &durable_tx, false).await;
                    deadline = Instant::now() + latency;
                }
            }
        }
    });
}

async fn write_station(
    sink: &Arc<Mutex<Box<dyn OpSink>>>,
    station: StationInfo,
) -> Result<(), StorageError> {
    let writer = Arc::clone(sink);
    tokio::task::spawn_blocking(move || writer.blocking_lock().write_station(&station))
        .await
        .unwrap_or_else(|e| Err(join_error(e)))
}

/// Hands `buf` to the sink. On failure the ops go back to the front of
/// `buf` so the next flush retries them.
async fn write_pending(
    sink: &Arc<Mutex<Box<dyn OpSink>>>,
    buf: &mut Vec<StoredOp>,
    durable_seq: &mut OpSeq,
    durable_tx: &mpsc::UnboundedSender<Result<OpSeq, String>>,
    sync_sink: bool,
) -> Result<(), StorageError> {
    if buf.is_empty() {
        if sync_sink {
            let writer = Arc::clone(sink);
            tokio::task::spawn_blocking(move || writer.blocking_lock().flush())
                .await
                .unwrap_or_else(|e| Err(join_error(e)))?;
        }
        return Ok(());
    }

    let ops = std::mem::take(buf);
    let writer = Arc::clone(sink);
    let joined = tokio::task::spawn_blocking(move || {
        let mut sink = writer.blocking_lock();
        let res = sink.append_ops(&ops).and_then(|seq| {
            if sync_sink {
                sink.flush()?;
            }
            Ok(seq)
        });
        (ops, res)
    })
    .await;

    let (ops, append_res) = match joined {
        Ok(pair) => pair,
        Err(e) => {
            let err = join_error(e);
            let _ = durable_tx.send(Err(err.to_string()));
            return Err(err);
        }
    };

    match append_res {
        Ok(seq) => {
            *durable_seq = (*durable_seq).max(seq);
            let _ = durable_tx.send(Ok(*durable_seq));
            Ok(())
        }
        Err(err) => {
            warn!(%err, pending = ops.len(), "journal write failed; will retry");
            let mut retry = ops;
            retry.append(buf);
            *buf = retry;
            let _ = durable_tx.send(Err(err.to_string()));
            Err(err)
        }
    }
}

fn join_error(e: tokio::task::JoinError) -> StorageError {
    StorageError::Message(format!("join error: {e}"))
}

async fn checkpoint_if_due(
    logbook: &Logbook,
    to_writer: Option<&mpsc::Sender<WriterMsg>>,
    config: &RuntimeConfig,
    ops_since_checkpoint: &mut usize,
) {
    if config.snapshot_every_ops == 0 || *ops_since_checkpoint < config.snapshot_every_ops {
        return;
    }

    let Some(tx) = to_writer else {
        return;
    };

    let (ack_tx, ack_rx) = oneshot::channel();
    let msg = WriterMsg::Checkpoint {
        snapshot: logbook.snapshot(),
        last_seq: logbook.store().latest_op_seq(),
        compact: config.compact_after_snapshot,
        resp: ack_tx,
    };
    if tx.send(msg).await.is_ok() {
        if let Ok(Err(err)) = ack_rx.await {
            warn!(%err, "automatic snapshot failed");
        }
        *ops_since_checkpoint = 0;
    }
}
