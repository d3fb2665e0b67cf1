use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use termlog::{
    core::store::LogStore,
    dupe::DupeStatus,
    logbook::Logbook,
    qso::{QsoDraft, QsoRecord},
    types::{Band, Mode, QsoId},
};

const FREQS: [&str; 4] = ["14.250", "14.030", "7.074", "21.300"];
const MODES: [&str; 3] = ["SSB", "CW", "FT8"];

#[derive(Debug, Clone)]
enum Action {
    Append { call_idx: u8, freq: u8, mode: u8 },
    Edit { target: u8, call_idx: u8, freq: u8 },
    Remove { target: u8 },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        4 => (0u8..12, 0u8..4, 0u8..3).prop_map(|(call_idx, freq, mode)| Action::Append { call_idx, freq, mode }),
        1 => (0u8..24, 0u8..12, 0u8..4).prop_map(|(target, call_idx, freq)| Action::Edit { target, call_idx, freq }),
        1 => (0u8..24).prop_map(|target| Action::Remove { target }),
    ]
}

fn call(idx: u8) -> String {
    format!("K{idx}AA")
}

fn record(call_idx: u8, freq: u8, mode: u8) -> QsoRecord {
    let ts = Utc.with_ymd_and_hms(2024, 6, 22, 12, 0, 0).unwrap();
    QsoDraft::new(
        call(call_idx),
        FREQS[freq as usize % FREQS.len()],
        MODES[mode as usize % MODES.len()],
        ts,
    )
    .validate()
    .expect("valid")
}

fn pick(store: &LogStore, target: u8) -> Option<QsoId> {
    let ids = store.ordered_ids();
    (!ids.is_empty()).then(|| ids[target as usize % ids.len()])
}

fn scan_dupes(store: &LogStore, call: &str, band: Band, mode: &Mode) -> Vec<QsoId> {
    store
        .iter()
        .filter(|r| r.callsign == call && r.band() == band && &r.mode == mode)
        .map(|r| r.id)
        .collect()
}

proptest! {
    #[test]
    fn indices_match_full_scan(actions in prop::collection::vec(action_strategy(), 1..150)) {
        let mut store = LogStore::new();
        let mut last_id = 0;

        for action in actions {
            match action {
                Action::Append { call_idx, freq, mode } => {
                    let id = store.append(record(call_idx, freq, mode));
                    prop_assert!(id > last_id);
                    last_id = id;
                }
                Action::Edit { target, call_idx, freq } => {
                    if let Some(id) = pick(&store, target) {
                        store.replace(id, record(call_idx, freq, 0)).expect("replace");
                    }
                }
                Action::Remove { target } => {
                    if let Some(id) = pick(&store, target) {
                        store.remove(id).expect("remove");
                    }
                }
            }
        }

        let ids = store.ordered_ids().to_vec();
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));

        for idx in 0u8..12 {
            let c = call(idx);
            let by_call: Vec<QsoId> = store.by_call(&c).into_iter().map(|r| r.id).collect();
            let scanned: Vec<QsoId> = store.iter().filter(|r| r.callsign == c).map(|r| r.id).collect();
            prop_assert_eq!(by_call, scanned);

            for freq in FREQS {
                for mode in MODES {
                    let band = Band::from_mhz(freq.parse().unwrap());
                    let mode = Mode::parse(mode).unwrap();
                    let indexed: Vec<QsoId> = store
                        .find_duplicate_candidates(&c, band, &mode)
                        .into_iter()
                        .map(|r| r.id)
                        .collect();
                    prop_assert_eq!(indexed, scan_dupes(&store, &c, band, &mode));
                }
            }
        }
    }

    #[test]
    fn same_call_band_mode_is_always_a_dupe(
        call_idx in 0u8..12,
        freq in 0u8..4,
        mode in 0u8..3,
        lower in any::<bool>(),
    ) {
        let mut log = Logbook::default();
        let ts = Utc.with_ymd_and_hms(2024, 6, 22, 12, 0, 0).unwrap();
        let f = FREQS[freq as usize];
        let m = MODES[mode as usize];

        let first = log.submit_qso(QsoDraft::new(call(call_idx), f, m, ts)).expect("valid");
        prop_assert_eq!(first.dupe, DupeStatus::Unique);

        let again_call = if lower { call(call_idx).to_lowercase() } else { call(call_idx) };
        let second = log.submit_qso(QsoDraft::new(again_call, f, m, ts)).expect("valid");
        prop_assert_eq!(second.dupe, DupeStatus::Duplicate);
        prop_assert_eq!(log.count(), 2);
    }

    #[test]
    fn other_band_or_mode_is_never_a_dupe(
        call_idx in 0u8..12,
        a in (0u8..4, 0u8..3),
        b in (0u8..4, 0u8..3),
    ) {
        let band_a = Band::from_mhz(FREQS[a.0 as usize].parse().unwrap());
        let band_b = Band::from_mhz(FREQS[b.0 as usize].parse().unwrap());
        prop_assume!(band_a != band_b || a.1 != b.1);

        let mut log = Logbook::default();
        let ts = Utc.with_ymd_and_hms(2024, 6, 22, 12, 0, 0).unwrap();
        let first = log
            .submit_qso(QsoDraft::new(call(call_idx), FREQS[a.0 as usize], MODES[a.1 as usize], ts))
            .expect("valid");
        let second = log
            .submit_qso(QsoDraft::new(call(call_idx), FREQS[b.0 as usize], MODES[b.1 as usize], ts))
            .expect("valid");
        prop_assert_eq!(first.dupe, DupeStatus::Unique);
        prop_assert_eq!(second.dupe, DupeStatus::Unique);
    }
}
