//! Cabrillo 3.0 log for the active Contest or Field Day session.

use std::fmt::Write as _;

use crate::{
    config::StationInfo,
    core::store::LogStore,
    engine::{Session, replay::session_records, session::ModeState},
    qso::QsoRecord,
    types::{Band, Mode, ModeClass},
};

/// Contest name written for Field Day logs.
pub const FIELD_DAY_CONTEST: &str = "ARRL-FD";

/// Renders the session's contacts as a Cabrillo file.
///
/// Returns `None` unless `session` is a Contest or Field Day session.
pub fn export_cabrillo(session: &Session, store: &LogStore, station: &StationInfo) -> Option<String> {
    let (contest, location) = match session.mode() {
        ModeState::Contest(c) => {
            let name = c.config().name.trim();
            let name = if name.is_empty() { "UNKNOWN" } else { name };
            (name.to_ascii_uppercase(), None)
        }
        ModeState::FieldDay(fd) => (
            FIELD_DAY_CONTEST.to_string(),
            Some(fd.config().my_section.clone()),
        ),
        _ => return None,
    };

    let mycall = station.callsign.trim().to_ascii_uppercase();
    let mut out = String::new();
    let _ = writeln!(out, "START-OF-LOG: 3.0");
    let _ = writeln!(out, "CREATED-BY: termlog {}", env!("CARGO_PKG_VERSION"));
    let _ = writeln!(out, "CONTEST: {contest}");
    let _ = writeln!(out, "CALLSIGN: {mycall}");
    if let Some(location) = location {
        let _ = writeln!(out, "LOCATION: {location}");
    }
    let _ = writeln!(out, "CLAIMED-SCORE: {}", session.progress().score());
    if let Some(name) = &station.name {
        let _ = writeln!(out, "NAME: {name}");
    }
    if let Some(grid) = &station.grid {
        let _ = writeln!(out, "GRID-LOCATOR: {grid}");
    }
    for rec in session_records(session, store) {
        let _ = writeln!(out, "{}", qso_line(rec, &mycall));
    }
    let _ = writeln!(out, "END-OF-LOG:");
    Some(out)
}

fn qso_line(rec: &QsoRecord, mycall: &str) -> String {
    let sent = rec
        .details
        .exchange_sent
        .clone()
        .unwrap_or_else(|| with_serial(&rec.rst_sent, rec.details.serial_sent));
    let rcvd = rec
        .details
        .exchange_rcvd
        .clone()
        .unwrap_or_else(|| with_serial(&rec.rst_rcvd, rec.details.serial_rcvd));
    format!(
        "QSO: {:>5} {} {} {:<13} {:<10} {:<13} {}",
        cabrillo_freq(rec),
        cabrillo_mode(&rec.mode),
        rec.timestamp.format("%Y-%m-%d %H%M"),
        mycall,
        sent,
        rec.callsign,
        rcvd,
    )
}

fn with_serial(rst: &str, serial: Option<u32>) -> String {
    match serial {
        Some(n) => format!("{rst} {n:03}"),
        None => rst.to_string(),
    }
}

/// kHz on HF; VHF bands use their band designator.
fn cabrillo_freq(rec: &QsoRecord) -> String {
    match rec.band() {
        Band::B6m => "50".to_string(),
        Band::B2m => "144".to_string(),
        _ => rec.frequency.khz().to_string(),
    }
}

fn cabrillo_mode(mode: &Mode) -> &'static str {
    match mode {
        Mode::RTTY => "RY",
        Mode::FM => "FM",
        _ => match mode.class() {
            ModeClass::Phone => "PH",
            ModeClass::Cw => "CW",
            ModeClass::Digital => "DG",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qso::QsoDraft;
    use chrono::DateTime;

    fn rec(call: &str, freq: &str, mode: &str) -> QsoRecord {
        let ts = DateTime::from_timestamp(1_719_080_000, 0).unwrap();
        QsoDraft::new(call, freq, mode, ts).validate().unwrap()
    }

    #[test]
    fn line_layout() {
        let mut r = rec("k2xy", "14.025", "CW");
        r.rst_sent = "599".to_string();
        r.rst_rcvd = "599".to_string();
        r.details.serial_sent = Some(7);
        r.details.serial_rcvd = Some(12);
        let line = qso_line(&r, "W1ABC");
        assert!(line.starts_with("QSO: 14025 CW 2024-06-22 "));
        assert!(line.contains("599 007"));
        assert!(line.trim_end().ends_with("K2XY          599 012"));
    }

    #[test]
    fn modes_and_vhf() {
        assert_eq!(cabrillo_mode(&Mode::SSB), "PH");
        assert_eq!(cabrillo_mode(&Mode::FT8), "DG");
        assert_eq!(cabrillo_mode(&Mode::RTTY), "RY");
        assert_eq!(cabrillo_freq(&rec("K2XY", "50.313", "FT8")), "50");
    }
}
