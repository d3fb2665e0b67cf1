use chrono::{DateTime, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use termlog::{
    adif::ExportFilter,
    core::store::LogStore,
    engine::{ContestConfig, ModeConfig},
    logbook::Logbook,
    qso::{QsoDraft, QsoRecord},
    types::{Band, Mode},
};

const FREQS: [&str; 4] = ["3.550", "7.030", "14.050", "21.050"];

fn ts(i: u64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 22, 0, 0, 0).unwrap() + chrono::Duration::seconds(i as i64)
}

fn draft(i: u64) -> QsoDraft {
    QsoDraft::new(
        format!("K{}AA", i % 5_000),
        FREQS[(i % 4) as usize],
        "CW",
        ts(i),
    )
}

fn record(i: u64) -> QsoRecord {
    draft(i).validate().expect("valid")
}

fn bench_appends(c: &mut Criterion) {
    let records: Vec<QsoRecord> = (0..50_000).map(record).collect();
    c.bench_function("store_append_50k", |b| {
        b.iter(|| {
            let mut store = LogStore::new();
            for rec in &records {
                store.append(rec.clone());
            }
        });
    });
}

fn bench_contest_submit(c: &mut Criterion) {
    c.bench_function("contest_submit_10k", |b| {
        b.iter(|| {
            let mut log = Logbook::default();
            log.start_mode(ModeConfig::Contest(ContestConfig {
                serial_start: Some(1),
                ..ContestConfig::default()
            }))
            .expect("start");
            for i in 0..10_000u64 {
                log.submit_qso(draft(i)).expect("submit");
            }
        });
    });
}

fn bench_dupe_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("dupe_lookup");
    for n in [1_000u64, 10_000, 50_000] {
        let mut store = LogStore::new();
        for i in 0..n {
            store.append(record(i));
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| store.find_duplicate_candidates("K1234AA", Band::B20m, &Mode::CW).len());
        });
    }
    group.finish();
}

fn bench_adif_export(c: &mut Criterion) {
    let mut log = Logbook::default();
    for i in 0..10_000u64 {
        log.submit_qso(draft(i)).expect("submit");
    }
    let filter = ExportFilter::default();
    c.bench_function("adif_export_10k", |b| {
        b.iter(|| log.export_adif(&filter).len());
    });

    let text = log.export_adif(&filter);
    c.bench_function("adif_import_10k", |b| {
        b.iter(|| {
            let mut fresh = Logbook::default();
            fresh.import_adif(&text).expect("import").imported
        });
    });
}

criterion_group!(
    benches,
    bench_appends,
    bench_contest_submit,
    bench_dupe_lookup,
    bench_adif_export
);
criterion_main!(benches);
