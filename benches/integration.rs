use airgrid::{normalizer_for, Source, SourceMerger};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use polars::prelude::*;
use std::collections::HashMap;

const HOURS: i64 = 24 * 365;
const START_EPOCH: i64 = 1_704_067_200;

fn purpleair_raw() -> PolarsResult<DataFrame> {
    let mut sensors = Vec::new();
    let mut stamps = Vec::new();
    let mut pm = Vec::new();
    for hour in 0..HOURS {
        for sensor in ["101", "102", "103"] {
            sensors.push(sensor.to_string());
            stamps.push((START_EPOCH + hour * 3600 + 600).to_string());
            pm.push(format!("{:.1}", (hour % 40) as f64 / 2.0));
        }
    }
    df!(
        "sensor_index" => sensors,
        "time_stamp" => stamps,
        "pm2.5_atm" => pm,
    )
}

fn openmeteo_raw() -> PolarsResult<DataFrame> {
    let stamps: Vec<String> = (0..HOURS)
        .map(|hour| {
            chrono::DateTime::from_timestamp(START_EPOCH + hour * 3600, 0)
                .map(|ts| ts.format("%Y-%m-%dT%H:%M:%SZ").to_string())
                .unwrap_or_default()
        })
        .collect();
    let temps: Vec<String> = (0..HOURS).map(|h| format!("{}", 20 + h % 8)).collect();
    df!(
        "timestamp_utc" => stamps,
        "temperature_2m" => temps,
    )
}

fn bench_integration(c: &mut Criterion) {
    let purpleair = purpleair_raw().expect("purpleair frame");
    let openmeteo = openmeteo_raw().expect("openmeteo frame");

    c.bench_function("normalize_purpleair", |b| {
        b.iter(|| normalizer_for(Source::PurpleAir).normalize(black_box(purpleair.clone())))
    });

    let mut cleaned = HashMap::new();
    cleaned.insert(
        Source::PurpleAir,
        normalizer_for(Source::PurpleAir)
            .normalize(purpleair)
            .expect("normalized purpleair"),
    );
    cleaned.insert(
        Source::OpenMeteo,
        normalizer_for(Source::OpenMeteo)
            .normalize(openmeteo)
            .expect("normalized openmeteo"),
    );
    let merger = SourceMerger::default();
    c.bench_function("merge_year", |b| b.iter(|| merger.merge(black_box(&cleaned))));
}

criterion_group!(benches, bench_integration);
criterion_main!(benches);
