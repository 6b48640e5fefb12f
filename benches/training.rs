use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kolosal_forecast::timeseries::{build_lags, drop_undefined};
use kolosal_forecast::training::{XGBoostConfig, XGBoostRegressor};
use kolosal_forecast::utils::columns_to_array2;
use polars::prelude::*;
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;

const VARIABLES: [&str; 5] = ["wind_speed", "wind_direction", "pressure", "vpd", "soil_moisture"];

fn create_hourly_data(n_rows: usize) -> DataFrame {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let series: Vec<Series> = VARIABLES
        .iter()
        .enumerate()
        .map(|(k, name)| {
            let values: Vec<f64> = (0..n_rows)
                .map(|i| (i as f64 / 24.0 * (k + 1) as f64).sin() * 10.0 + rng.gen::<f64>())
                .collect();
            Series::new((*name).into(), values)
        })
        .collect();

    DataFrame::new(series).unwrap()
}

fn bench_build_lags(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_lags");

    for n_rows in [1_000, 10_000].iter() {
        let df = create_hourly_data(*n_rows);
        group.bench_with_input(BenchmarkId::new("h24", n_rows), &df, |b, df| {
            b.iter(|| build_lags(black_box(df), &VARIABLES, 24).unwrap())
        });
    }

    group.finish();
}

fn bench_booster_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("booster_fit");
    group.sample_size(10);

    for n_rows in [500, 2_000].iter() {
        let df = create_hourly_data(*n_rows + 24);
        let lagged = build_lags(&df, &VARIABLES, 24).unwrap();
        let trainable = drop_undefined(&lagged.frame, &lagged.lag_columns).unwrap();
        let x = columns_to_array2(&trainable, &lagged.lag_columns).unwrap();
        let y = columns_to_array2(&trainable, &[VARIABLES[0].to_string()])
            .unwrap()
            .column(0)
            .to_owned();

        group.bench_with_input(BenchmarkId::new("fit", n_rows), &(x, y), |b, (x, y)| {
            b.iter(|| {
                let mut model = XGBoostRegressor::new(XGBoostConfig {
                    n_estimators: 50,
                    ..Default::default()
                });
                model.fit(black_box(x), black_box(y)).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build_lags, bench_booster_fit);
criterion_main!(benches);
