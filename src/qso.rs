//! QSO domain record, candidate draft, and field validation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::InvalidRecordError,
    types::{Band, Frequency, Mode, QsoId, SessionId},
};

/// Signal report used when none is entered.
pub const DEFAULT_RST: &str = "59";

/// How precisely the logged time was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimePrecision {
    /// `HHMM`.
    Minutes,
    /// `HHMMSS`.
    #[default]
    Seconds,
}

/// Optional contact details shared by drafts and stored records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QsoDetails {
    /// Free-form notes.
    pub notes: Option<String>,
    /// Operator name.
    pub name: Option<String>,
    /// City or location.
    pub qth: Option<String>,
    /// State or province.
    pub state: Option<String>,
    /// Country name.
    pub country: Option<String>,
    /// Maidenhead grid square.
    pub grid: Option<String>,
    /// Contest exchange sent.
    pub exchange_sent: Option<String>,
    /// Contest exchange received.
    pub exchange_rcvd: Option<String>,
    /// Serial number sent.
    pub serial_sent: Option<u32>,
    /// Serial number received.
    pub serial_rcvd: Option<u32>,
    /// POTA parks this station activated.
    pub my_parks: Vec<String>,
    /// POTA park of the other station (park-to-park).
    pub their_park: Option<String>,
    /// Transmit power as entered.
    pub tx_power: Option<String>,
    /// Propagation mode (e.g. `SAT`, `EME`).
    pub prop_mode: Option<String>,
    /// Extended comment.
    pub comment: Option<String>,
    /// Mode label as entered, when it differs from the canonical spelling.
    pub mode_label: Option<String>,
    /// ADIF fields this logger does not interpret, in input order.
    pub extra: Vec<(String, String)>,
}

/// Fully validated, stored QSO.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QsoRecord {
    /// Stable sequence id, assigned by the store.
    pub id: QsoId,
    /// Session that was active when the contact was logged.
    pub session_id: Option<SessionId>,
    /// Uppercase callsign.
    pub callsign: String,
    /// Frequency in MHz.
    pub frequency: Frequency,
    /// Emission mode.
    pub mode: Mode,
    /// UTC time, second precision.
    pub timestamp: DateTime<Utc>,
    /// Precision the time was entered with.
    pub time_precision: TimePrecision,
    /// Report sent.
    pub rst_sent: String,
    /// Report received.
    pub rst_rcvd: String,
    /// Optional fields.
    pub details: QsoDetails,
}

impl QsoRecord {
    /// Band derived from the frequency.
    pub fn band(&self) -> Band {
        self.frequency.band()
    }

    /// Mode label as it was entered.
    pub fn mode_label(&self) -> &str {
        self.details.mode_label.as_deref().unwrap_or(self.mode.as_str())
    }

    /// True when the other station was in a park.
    pub fn is_park_to_park(&self) -> bool {
        self.details.their_park.is_some()
    }
}

/// Candidate QSO fields as entered; see [`QsoDraft::validate`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QsoDraft {
    /// Callsign, any case.
    pub callsign: String,
    /// Frequency in MHz, as text.
    pub frequency: String,
    /// Mode label.
    pub mode: String,
    /// UTC time of the contact.
    pub timestamp: Option<DateTime<Utc>>,
    /// Precision of `timestamp`.
    pub time_precision: TimePrecision,
    /// Report sent; defaults to [`DEFAULT_RST`].
    pub rst_sent: Option<String>,
    /// Report received; defaults to [`DEFAULT_RST`].
    pub rst_rcvd: Option<String>,
    /// Optional fields.
    pub details: QsoDetails,
}

impl QsoDraft {
    /// Draft with the four required fields.
    pub fn new(
        callsign: impl Into<String>,
        frequency: impl Into<String>,
        mode: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            callsign: callsign.into(),
            frequency: frequency.into(),
            mode: mode.into(),
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    /// Validates every field and builds an unnumbered record (`id == 0`).
    pub fn validate(self) -> Result<QsoRecord, InvalidRecordError> {
        let callsign = normalize_callsign(&self.callsign)?;
        let frequency = Frequency::parse(&self.frequency).ok_or_else(|| {
            InvalidRecordError::new(
                "frequency",
                format!("`{}` is not a positive number of MHz", self.frequency),
            )
        })?;
        let mode = Mode::parse(&self.mode)
            .ok_or_else(|| InvalidRecordError::new("mode", "mode is required"))?;
        let timestamp = self
            .timestamp
            .ok_or_else(|| InvalidRecordError::new("timestamp", "timestamp is required"))?
            .trunc_subsecs(0);

        let mut details = self.details;
        let entered = self.mode.trim();
        details.mode_label = (entered != mode.as_str()).then(|| entered.to_string());
        details.my_parks = details
            .my_parks
            .iter()
            .map(|p| p.trim().to_ascii_uppercase())
            .filter(|p| !p.is_empty())
            .collect();
        details.their_park = non_blank(details.their_park).map(|p| p.to_ascii_uppercase());

        Ok(QsoRecord {
            id: 0,
            session_id: None,
            callsign,
            frequency,
            mode,
            timestamp,
            time_precision: self.time_precision,
            rst_sent: non_blank(self.rst_sent).unwrap_or_else(|| DEFAULT_RST.to_string()),
            rst_rcvd: non_blank(self.rst_rcvd).unwrap_or_else(|| DEFAULT_RST.to_string()),
            details,
        })
    }
}

/// Uppercases and checks amateur callsign token syntax.
///
/// Accepts 3 to 10 characters of letters and digits, optionally split by
/// single `/` separators (`W1ABC/P`, `VE3/W1ABC`).
pub fn normalize_callsign(raw: &str) -> Result<String, InvalidRecordError> {
    let call = raw.trim().to_ascii_uppercase();
    if call.is_empty() {
        return Err(InvalidRecordError::new("callsign", "callsign is required"));
    }
    if !(3..=10).contains(&call.len()) {
        return Err(InvalidRecordError::new(
            "callsign",
            format!("`{call}` must be 3 to 10 characters"),
        ));
    }
    let well_formed = call.split('/').all(|part| {
        !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric())
    });
    if !well_formed {
        return Err(InvalidRecordError::new(
            "callsign",
            format!("`{call}` is not a valid callsign"),
        ));
    }
    Ok(call)
}

/// Parses a UTC timestamp in RFC 3339, `YYYY-MM-DD HH:MM[:SS]`, or ADIF
/// `YYYYMMDD HHMM[SS]` form.
pub fn parse_utc_timestamp(text: &str) -> Result<DateTime<Utc>, InvalidRecordError> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Ok(ts.with_timezone(&Utc).trunc_subsecs(0));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y%m%d %H%M%S", "%Y%m%d %H%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(InvalidRecordError::new(
        "timestamp",
        format!("`{text}` is not a UTC date and time"),
    ))
}

/// Combines ADIF `QSO_DATE` (`YYYYMMDD`) and `TIME_ON` (`HHMM` or `HHMMSS`).
pub fn parse_adif_datetime(
    date: &str,
    time: &str,
) -> Result<(DateTime<Utc>, TimePrecision), InvalidRecordError> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y%m%d")
        .map_err(|_| InvalidRecordError::new("qso_date", format!("`{date}` is not YYYYMMDD")))?;
    let time = time.trim();
    let (clock, precision) = match time.len() {
        4 => (NaiveTime::parse_from_str(time, "%H%M"), TimePrecision::Minutes),
        6 => (NaiveTime::parse_from_str(time, "%H%M%S"), TimePrecision::Seconds),
        _ => {
            return Err(InvalidRecordError::new(
                "time_on",
                format!("`{time}` is not HHMM or HHMMSS"),
            ));
        }
    };
    let clock = clock
        .map_err(|_| InvalidRecordError::new("time_on", format!("`{time}` is not a time")))?;
    Ok((day.and_time(clock).and_utc(), precision))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callsign_syntax() {
        assert_eq!(normalize_callsign(" w1abc ").unwrap(), "W1ABC");
        assert_eq!(normalize_callsign("w1abc/p").unwrap(), "W1ABC/P");
        assert_eq!(normalize_callsign("VE3/W1AB").unwrap(), "VE3/W1AB");
        assert!(normalize_callsign("").is_err());
        assert!(normalize_callsign("W1").is_err());
        assert!(normalize_callsign("W1ABC/").is_err());
        assert!(normalize_callsign("W1//ABC").is_err());
        assert!(normalize_callsign("W1-ABC").is_err());
        assert!(normalize_callsign("KA1ABCDEFGH").is_err());
    }

    #[test]
    fn validation_names_offending_field() {
        let ts = parse_utc_timestamp("2024-06-22 18:30").unwrap();
        let err = QsoDraft::new("W1ABC", "abc", "SSB", ts).validate().unwrap_err();
        assert_eq!(err.field, "frequency");

        let err = QsoDraft::new("W1ABC", "14.250", "", ts).validate().unwrap_err();
        assert_eq!(err.field, "mode");

        let mut draft = QsoDraft::new("W1ABC", "14.250", "SSB", ts);
        draft.timestamp = None;
        assert_eq!(draft.validate().unwrap_err().field, "timestamp");
    }

    #[test]
    fn defaults_rst_and_normalizes_parks() {
        let ts = parse_utc_timestamp("2024-06-22T18:30:05.250Z").unwrap();
        let mut draft = QsoDraft::new("k2xyz", "7.074", "ft8", ts);
        draft.details.their_park = Some(" k-0001 ".to_string());
        let rec = draft.validate().unwrap();
        assert_eq!(rec.rst_sent, "59");
        assert_eq!(rec.rst_rcvd, "59");
        assert_eq!(rec.details.their_park.as_deref(), Some("K-0001"));
        assert_eq!(rec.mode, Mode::FT8);
        assert_eq!(rec.details.mode_label.as_deref(), Some("ft8"));
        assert_eq!(rec.mode_label(), "ft8");
        assert_eq!(rec.band(), Band::B40m);
        assert_eq!(rec.timestamp.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn adif_date_time_precision() {
        let (_, p) = parse_adif_datetime("20240622", "1830").unwrap();
        assert_eq!(p, TimePrecision::Minutes);
        let (ts, p) = parse_adif_datetime("20240622", "183005").unwrap();
        assert_eq!(p, TimePrecision::Seconds);
        assert_eq!(ts, parse_utc_timestamp("2024-06-22 18:30:05").unwrap());
        assert!(parse_adif_datetime("2024-06-22", "1830").is_err());
        assert!(parse_adif_datetime("20240622", "18").is_err());
    }
}
