//! Read-only data sources that pre-fill QSO entry.
//!
//! Callsign lookups and spot feeds only ever produce [`QsoDraft`] input.
//! They never log anything themselves.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{
    qso::QsoDraft,
    types::{Band, Frequency},
};

/// What a callsign lookup knows about an operator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LookupInfo {
    /// Operator name.
    pub name: Option<String>,
    /// City, state, or country text.
    pub location: Option<String>,
    /// Grid square.
    pub grid: Option<String>,
    /// License class.
    pub license_class: Option<String>,
}

/// Callsign database (QRZ, HamQTH, a local cache, ...).
pub trait CallsignLookup {
    /// Details for `callsign`, if known.
    fn lookup(&self, callsign: &str) -> Option<LookupInfo>;
}

impl CallsignLookup for HashMap<String, LookupInfo> {
    fn lookup(&self, callsign: &str) -> Option<LookupInfo> {
        self.get(&callsign.trim().to_ascii_uppercase()).cloned()
    }
}

/// One spotted station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spot {
    /// Spotted callsign.
    pub callsign: String,
    /// Frequency in MHz.
    pub frequency_mhz: f64,
    /// Band as reported by the source.
    pub band: Band,
    /// Mode label.
    pub mode: String,
    /// Time of the spot.
    pub timestamp: DateTime<Utc>,
    /// Park reference, for POTA spots.
    pub park: Option<String>,
}

/// Feed of current spots (POTA, DX cluster).
pub trait SpotSource {
    /// Current spots, newest first.
    fn spots(&self) -> Vec<Spot>;
}

impl QsoDraft {
    /// Fills empty name, QTH and grid from a lookup result.
    ///
    /// Values the operator already typed are kept.
    pub fn prefill_from_lookup(&mut self, info: &LookupInfo) {
        let d = &mut self.details;
        if d.name.is_none() {
            d.name = info.name.clone();
        }
        if d.qth.is_none() {
            d.qth = info.location.clone();
        }
        if d.grid.is_none() {
            d.grid = info.grid.clone();
        }
    }

    /// Draft for working a spotted station at `timestamp`.
    pub fn from_spot(spot: &Spot, timestamp: DateTime<Utc>) -> Self {
        let frequency = Frequency::from_mhz(spot.frequency_mhz)
            .map(|f| f.as_str().to_string())
            .unwrap_or_else(|| spot.frequency_mhz.to_string());
        let mut draft = QsoDraft::new(spot.callsign.clone(), frequency, spot.mode.clone(), timestamp);
        draft.details.their_park = spot.park.clone();
        draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_keeps_typed_values() {
        let mut db = HashMap::new();
        db.insert(
            "W1ABC".to_string(),
            LookupInfo {
                name: Some("Alice".to_string()),
                location: Some("Boston, MA".to_string()),
                grid: Some("FN42".to_string()),
                license_class: Some("Extra".to_string()),
            },
        );
        let info = db.lookup("w1abc").unwrap();

        let mut draft = QsoDraft::default();
        draft.details.name = Some("Al".to_string());
        draft.prefill_from_lookup(&info);
        assert_eq!(draft.details.name.as_deref(), Some("Al"));
        assert_eq!(draft.details.grid.as_deref(), Some("FN42"));
    }

    struct FixedSpots(Vec<Spot>);

    impl SpotSource for FixedSpots {
        fn spots(&self) -> Vec<Spot> {
            self.0.clone()
        }
    }

    #[test]
    fn selected_spot_prefills_a_submitted_qso() {
        let ts = DateTime::from_timestamp(1_719_080_000, 0).unwrap();
        let source = FixedSpots(vec![
            Spot {
                callsign: "n0pta".to_string(),
                frequency_mhz: 7.2855,
                band: Band::B40m,
                mode: "SSB".to_string(),
                timestamp: ts,
                park: Some("k-4567".to_string()),
            },
            Spot {
                callsign: "DL1XX".to_string(),
                frequency_mhz: 14.025,
                band: Band::B20m,
                mode: "CW".to_string(),
                timestamp: ts,
                park: None,
            },
        ]);

        let mut log = crate::logbook::Logbook::default();
        let spots = source.spots();
        assert_eq!(log.count(), 0);

        let submitted = log.submit_qso(QsoDraft::from_spot(&spots[0], ts)).unwrap();
        let rec = submitted.record;
        assert_eq!(rec.callsign, "N0PTA");
        assert_eq!(rec.frequency.as_str(), "7.2855");
        assert_eq!(rec.band(), Band::B40m);
        assert_eq!(rec.details.their_park.as_deref(), Some("K-4567"));
        assert_eq!(log.count(), 1);
        assert_eq!(source.spots(), spots);
    }

    #[test]
    fn spot_becomes_draft_only() {
        let ts = DateTime::from_timestamp(1_719_080_000, 0).unwrap();
        let spot = Spot {
            callsign: "K2XY".to_string(),
            frequency_mhz: 14.062,
            band: Band::B20m,
            mode: "CW".to_string(),
            timestamp: ts,
            park: Some("K-0001".to_string()),
        };
        let draft = QsoDraft::from_spot(&spot, ts);
        assert_eq!(draft.frequency, "14.062");
        assert_eq!(draft.details.their_park.as_deref(), Some("K-0001"));
        assert!(draft.validate().is_ok());
    }
}
