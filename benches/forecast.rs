use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use meteocast::training::grid_search::ClassifierGrid;
use meteocast::{
    Forecaster, ForestParams, LatLon, LocationId, Observation, PreparedObservation, Trainer,
};

fn series(len: usize) -> Vec<Observation> {
    let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
    (0..len)
        .map(|i| {
            let hour = (i % 24) as f64;
            let mut o = Observation::empty("Hanoi", start + Duration::hours(i as i64));
            o.temperature = Some(26.0 + 4.0 * ((hour - 9.0) * std::f64::consts::PI / 12.0).sin());
            o.relative_humidity = Some(70.0 + (i % 7) as f64);
            o.pressure = Some(1008.0);
            o.wind_speed = Some(2.0 + (i % 3) as f64);
            o.cloud_fraction = Some(if (14..17).contains(&(i % 24)) { 95.0 } else { 30.0 });
            o.precipitation_last_hour = Some(0.0);
            o.condition_code = Some(if (14..17).contains(&(i % 24)) { "rain" } else { "cloudy" }.to_string());
            o
        })
        .collect()
}

fn bench_forecast(c: &mut Criterion) {
    let observations = series(24 * 14);
    let trainer = Trainer::builder()
        .regressor_params(ForestParams { n_estimators: 30, ..ForestParams::regressor() })
        .classifier_params(ForestParams { n_estimators: 30, ..ForestParams::classifier() })
        .build();
    let pair = trainer
        .train_series(LocationId::new("Hanoi"), LatLon(21.0285, 105.8542), &observations)
        .unwrap();
    let seed: Vec<_> = observations.iter().map(PreparedObservation::from_observation).collect();
    let start = seed.last().unwrap().timestamp + Duration::hours(1);
    let forecaster = Forecaster::default();

    c.bench_function("forecast_24h", |b| {
        b.iter(|| forecaster.forecast(black_box(&pair), black_box(&seed), start, 24))
    });
    c.bench_function("forecast_72h", |b| {
        b.iter(|| forecaster.forecast(black_box(&pair), black_box(&seed), start, 72))
    });
}

fn bench_training(c: &mut Criterion) {
    let observations = series(24 * 7);
    let trainer = Trainer::builder()
        .regressor_params(ForestParams { n_estimators: 20, ..ForestParams::regressor() })
        .classifier_params(ForestParams { n_estimators: 20, ..ForestParams::classifier() })
        .classifier_grid(ClassifierGrid {
            n_estimators: vec![20],
            max_depth: vec![Some(5), None],
            min_samples_leaf: vec![1, 3],
        })
        .build();
    let mut group = c.benchmark_group("training");
    group.sample_size(10);
    group.bench_function("train_series_7d", |b| {
        b.iter(|| {
            trainer.train_series(
                LocationId::new("Hanoi"),
                LatLon(21.0285, 105.8542),
                black_box(&observations),
            )
        })
    });
    group.finish();
}

criterion_group!(benches, bench_forecast, bench_training);
criterion_main!(benches);
