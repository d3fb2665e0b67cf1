use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    qso::QsoRecord,
    types::{Band, Mode, SessionId},
};

use super::{
    convert::{ExportContext, qso_to_fields},
    writer::{write_header, write_record},
};

/// Program id written in exported headers.
pub const PROGRAM_ID: &str = "termlog";

/// Subset of the log to export. The default selects everything.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportFilter {
    /// Only records logged in this session.
    pub session: Option<SessionId>,
    /// Only contacts at or after this time.
    pub since: Option<DateTime<Utc>>,
    /// Only contacts before this time.
    pub until: Option<DateTime<Utc>>,
    /// Only this callsign (case-insensitive).
    pub callsign: Option<String>,
    /// Only this band.
    pub band: Option<Band>,
    /// Only this mode.
    pub mode: Option<Mode>,
}

impl ExportFilter {
    /// True when `rec` passes every set criterion.
    pub fn matches(&self, rec: &QsoRecord) -> bool {
        self.session.is_none_or(|s| rec.session_id == Some(s))
            && self.since.is_none_or(|t| rec.timestamp >= t)
            && self.until.is_none_or(|t| rec.timestamp < t)
            && self
                .callsign
                .as_deref()
                .is_none_or(|c| rec.callsign.eq_ignore_ascii_case(c.trim()))
            && self.band.is_none_or(|b| rec.band() == b)
            && self.mode.as_ref().is_none_or(|m| &rec.mode == m)
    }
}

/// Serializes `records` as an ADIF document.
pub fn export_adif<'a>(
    records: impl IntoIterator<Item = &'a QsoRecord>,
    ctx: &ExportContext<'_>,
    created: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    write_header(&mut out, PROGRAM_ID, created);
    for rec in records {
        write_record(&mut out, &qso_to_fields(rec, ctx));
    }
    out
}
