use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use football_terminal::analysis::{match_kpis, pass_network, player_performance};
use football_terminal::boosting::{BoostParams, GradientBoosting};
use football_terminal::events::parse_events_json;
use football_terminal::features::{self, PassRecord};
use football_terminal::preprocess::Preprocessor;
use football_terminal::simulate::load_actions;

fn synthetic_records(n: usize) -> Vec<PassRecord> {
    (0..n)
        .map(|i| {
            let start_x = 5.0 + (i * 7 % 100) as f64;
            let start_y = 5.0 + (i * 13 % 70) as f64;
            let end_x = (start_x + (i * 11 % 40) as f64 - 10.0).clamp(0.0, 120.0);
            let end_y = (start_y + (i * 5 % 30) as f64 - 15.0).clamp(0.0, 80.0);
            let distance = features::calculate_distance(start_x, start_y, end_x, end_y);
            PassRecord {
                start_x,
                start_y,
                end_x,
                end_y,
                distance,
                angle: features::calculate_angle(start_x, start_y, end_x, end_y),
                completed: distance < 25.0 || i % 9 == 0,
                minute: (i % 95) as u32,
            }
        })
        .collect()
}

fn bench_events_parse(c: &mut Criterion) {
    c.bench_function("events_parse", |b| {
        b.iter(|| {
            let events = parse_events_json(black_box(EVENTS_JSON)).unwrap();
            black_box(events.len());
        })
    });
}

fn bench_match_analysis(c: &mut Criterion) {
    let events = parse_events_json(EVENTS_JSON).unwrap();
    c.bench_function("match_analysis", |b| {
        b.iter(|| {
            let kpis = match_kpis(black_box(&events));
            let network = pass_network(black_box(&events));
            let perf = player_performance(black_box(&events), "Bob");
            black_box((kpis.passes, network.links.len(), perf.touches.len()));
        })
    });
}

fn bench_simulator_actions(c: &mut Criterion) {
    let events = parse_events_json(EVENTS_JSON).unwrap();
    c.bench_function("simulator_actions", |b| {
        b.iter(|| {
            let actions = load_actions(black_box(&events)).unwrap();
            black_box(actions.len());
        })
    });
}

fn bench_feature_engineering(c: &mut Criterion) {
    let records = synthetic_records(20_000);
    c.bench_function("feature_engineering_20k", |b| {
        b.iter(|| {
            let rows = features::engineer_all(black_box(&records));
            black_box(rows.len());
        })
    });
}

fn bench_boosting_fit(c: &mut Criterion) {
    let rows = features::engineer_all(&synthetic_records(2_000));
    let pre = Preprocessor::fit(&rows).unwrap();
    let x = pre.transform(&rows);
    let y: Vec<u8> = rows.iter().map(|r| r.label()).collect();
    let params = BoostParams {
        n_estimators: 20,
        max_depth: 4,
        ..BoostParams::default()
    };
    let mut group = c.benchmark_group("boosting");
    group.sample_size(10);
    group.bench_function("fit_2k_rows_20_trees", |b| {
        b.iter(|| {
            let mut model = GradientBoosting::new(params);
            model.fit(black_box(&x), black_box(&y)).unwrap();
            black_box(model.trees.len());
        })
    });
    group.finish();
}

criterion_group!(
    perf,
    bench_events_parse,
    bench_match_analysis,
    bench_simulator_actions,
    bench_feature_engineering,
    bench_boosting_fit
);
criterion_main!(perf);

static EVENTS_JSON: &str = include_str!("../tests/fixtures/data/events/9001.json");
