//! Amateur-radio QSO logging engine.
//!
//! An authoritative in-memory log with an advisory dupe checker, an ADIF
//! codec, and per-operating-mode progress and scoring (General, POTA
//! activation, POTA hunting, Contest, Field Day). Persistence is an
//! append-only op journal drained into an [`persist::OpSink`].
//!
//! # Examples
//!
//! Synchronous use through [`logbook::Logbook`]:
//! ```
//! use chrono::{TimeZone, Utc};
//! use termlog::{
//!     engine::{ModeConfig, PotaActivationConfig, Progress},
//!     logbook::Logbook,
//!     qso::QsoDraft,
//! };
//!
//! let mut log = Logbook::default();
//! log.start_mode(ModeConfig::PotaActivation(PotaActivationConfig::single("K-1234")))
//!     .expect("start");
//!
//! let ts = Utc.with_ymd_and_hms(2024, 6, 22, 18, 30, 0).unwrap();
//! let first = log.submit_qso(QsoDraft::new("w1abc", "14.250", "SSB", ts)).expect("valid");
//! let again = log.submit_qso(QsoDraft::new("W1ABC", "14.250", "SSB", ts)).expect("valid");
//! assert!(!first.dupe.is_dupe());
//! assert!(again.dupe.is_dupe());
//!
//! match log.get_progress() {
//!     Progress::PotaActivation { contacts, remaining, .. } => {
//!         assert_eq!((contacts, remaining), (1, 9));
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! Runtime use with a SQLite journal:
//! ```no_run
//! use chrono::Utc;
//! use termlog::{
//!     config::StationInfo,
//!     logbook::Logbook,
//!     persist::sqlite::SqliteOpSink,
//!     qso::QsoDraft,
//!     runtime::{RuntimeConfig, spawn_logbook},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = SqliteOpSink::open("termlog.db").expect("open sqlite");
//! let store = sink.load_store().expect("load");
//! let station = sink.load_station().expect("station").unwrap_or_default();
//! let handle = spawn_logbook(
//!     Logbook::from_store(store, station),
//!     Some(Box::new(sink)),
//!     RuntimeConfig::default(),
//! );
//! let logged = handle
//!     .submit_qso(QsoDraft::new("K1ABC", "14.025", "CW", Utc::now()))
//!     .await
//!     .expect("submit");
//! println!("logged #{}", logged.record.id);
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// ADIF reader, writer, import, and export.
pub mod adif;
pub mod cabrillo;
pub mod config;
/// Core in-memory store and index helpers.
pub mod core;
pub mod dupe;
pub mod engine;
pub mod error;
pub mod logbook;
pub mod lookup;
/// Journal op model and versioned wrappers.
pub mod op;
pub mod persist;
pub mod qso;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Shared primitive types: ids, bands, modes, frequencies.
pub mod types;
