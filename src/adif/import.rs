use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    core::store::LogStore,
    error::AdifParseError,
    qso::QsoRecord,
    types::QsoId,
};

use super::{
    convert::{Rejected, record_to_qso},
    reader::parse_adif,
};

/// How close in time two contacts with the same call, band, and mode must
/// be for an imported one to count as already logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DupeTolerance {
    /// Same UTC date.
    #[default]
    SameDay,
    /// Within this many seconds of each other.
    Seconds(u64),
}

impl DupeTolerance {
    fn matches(self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        match self {
            DupeTolerance::SameDay => a.date_naive() == b.date_naive(),
            DupeTolerance::Seconds(secs) => (a - b).num_seconds().unsigned_abs() <= secs,
        }
    }
}

/// Import tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Duplicate window for records already in the log.
    pub dupe_tolerance: DupeTolerance,
}

/// Outcome of an import.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportReport {
    /// Records appended.
    pub imported: usize,
    /// Records already present in the log or earlier in the same file.
    pub skipped_duplicate: usize,
    /// Records whose values failed validation.
    pub failed: usize,
    /// One message per failed record.
    pub errors: Vec<String>,
    /// Ids assigned to the appended records, in file order.
    pub ids: Vec<QsoId>,
}

/// Parses `text` and appends every valid record not already logged.
///
/// Nothing is appended unless the whole text parses; a structural error
/// leaves `store` untouched.
pub fn import_adif(
    store: &mut LogStore,
    text: &str,
    options: ImportOptions,
) -> Result<ImportReport, AdifParseError> {
    append_records(store, text, Some(options.dupe_tolerance))
}

/// Like [`import_adif`] but keeps duplicates; used to reload a whole log
/// in which dupes were logged on purpose.
pub(crate) fn load_adif(store: &mut LogStore, text: &str) -> Result<ImportReport, AdifParseError> {
    append_records(store, text, None)
}

fn append_records(
    store: &mut LogStore,
    text: &str,
    tolerance: Option<DupeTolerance>,
) -> Result<ImportReport, AdifParseError> {
    let records = parse_adif(text)?;
    let mut report = ImportReport::default();
    let mut staged: Vec<QsoRecord> = Vec::with_capacity(records.len());

    for (i, rec) in records.iter().enumerate() {
        let index = i + 1;
        match record_to_qso(rec, index) {
            Ok(qso) => {
                if tolerance.is_some_and(|t| already_logged(store, &staged, &qso, t)) {
                    report.skipped_duplicate += 1;
                } else {
                    staged.push(qso);
                }
            }
            Err(Rejected::Invalid(err)) => {
                warn!(record = index, %err, "skipping invalid ADIF record");
                report.failed += 1;
                report.errors.push(format!("record {index}: {err}"));
            }
            Err(Rejected::Structural(err)) => return Err(err),
        }
    }

    for qso in staged {
        report.ids.push(store.append(qso));
    }
    report.imported = report.ids.len();

    info!(
        imported = report.imported,
        skipped = report.skipped_duplicate,
        failed = report.failed,
        "ADIF import finished"
    );
    Ok(report)
}

fn already_logged(
    store: &LogStore,
    staged: &[QsoRecord],
    qso: &QsoRecord,
    tolerance: DupeTolerance,
) -> bool {
    let band = qso.band();
    let in_store = store
        .find_duplicate_candidates(&qso.callsign, band, &qso.mode)
        .into_iter()
        .any(|prior| tolerance.matches(prior.timestamp, qso.timestamp));
    in_store
        || staged.iter().any(|prior| {
            prior.callsign == qso.callsign
                && prior.band() == band
                && prior.mode == qso.mode
                && tolerance.matches(prior.timestamp, qso.timestamp)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO: &str = "<EOH>\
        <CALL:5>W1ABC<FREQ:6>14.250<MODE:3>SSB<QSO_DATE:8>20240622<TIME_ON:4>1830<EOR>\
        <CALL:4>K2XY<FREQ:5>7.074<MODE:3>FT8<QSO_DATE:8>20240622<TIME_ON:6>190000<EOR>";

    #[test]
    fn second_import_is_all_duplicates() {
        let mut store = LogStore::new();
        let first = import_adif(&mut store, TWO, ImportOptions::default()).unwrap();
        assert_eq!(first.imported, 2);

        let again = import_adif(&mut store, TWO, ImportOptions::default()).unwrap();
        assert_eq!(again.imported, 0);
        assert_eq!(again.skipped_duplicate, 2);
        assert_eq!(again.failed, 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn tolerance_in_seconds() {
        let mut store = LogStore::new();
        import_adif(&mut store, TWO, ImportOptions::default()).unwrap();
        let later = "<CALL:5>W1ABC<FREQ:6>14.260<MODE:3>SSB<QSO_DATE:8>20240622<TIME_ON:4>2030<EOR>";
        let opts = ImportOptions {
            dupe_tolerance: DupeTolerance::Seconds(600),
        };
        let report = import_adif(&mut store, later, opts).unwrap();
        assert_eq!(report.imported, 1);
    }

    #[test]
    fn load_keeps_duplicates() {
        let mut store = LogStore::new();
        let text = format!("{TWO}{TWO}");
        let report = load_adif(&mut store, &text).unwrap();
        assert_eq!(report.imported, 4);
        assert_eq!(report.skipped_duplicate, 0);
    }

    #[test]
    fn invalid_values_count_as_failed() {
        let mut store = LogStore::new();
        let text = "<CALL:5>W1ABC<FREQ:3>abc<MODE:3>SSB<QSO_DATE:8>20240622<TIME_ON:4>1830<EOR>\
            <CALL:4>K2XY<FREQ:5>7.074<MODE:3>FT8<QSO_DATE:8>20240622<TIME_ON:4>1900<EOR>";
        let report = import_adif(&mut store, text, ImportOptions::default()).unwrap();
        assert_eq!(report.imported, 1);
        assert_eq!(report.failed, 1);
        assert!(report.errors[0].starts_with("record 1:"));
    }
}
