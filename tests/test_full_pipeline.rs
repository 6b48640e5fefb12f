//! Integration test: clean → train → load → forecast through temp directories

use kolosal_forecast::config::ForecastConfig;
use kolosal_forecast::export::{save_artifact, ModelMetadata, ModelRegistry, SerializationFormat};
use kolosal_forecast::inference::{predict_one, AlignState, FeatureRow, ForecastEngine, ModelForecast};
use kolosal_forecast::preprocessing::DataCleaner;
use kolosal_forecast::training::{ForecastModel, ForecastTrainer, Regressor, TargetOutcome, XGBoostConfig, XGBoostRegressor};
use kolosal_forecast::utils::DataLoader;
use ndarray::{array, Array2};
use polars::prelude::*;
use std::fmt::Write as _;
use std::fs;

fn quick_booster() -> XGBoostConfig {
    XGBoostConfig {
        n_estimators: 15,
        ..Default::default()
    }
}

fn write_raw_export(path: &std::path::Path, hours: usize) {
    let mut text = String::from("latitude,longitude,elevation\n13.11,80.25,15.0\n\n");
    text.push_str("time,temperature_2m (°C),pressure_msl (hPa)\n");
    for h in 0..hours {
        let temp = 28.0 + (h as f64 * 0.26).sin() * 3.0;
        let pressure = 1008.0 + (h as f64 * 0.1).cos();
        // Every tenth pressure reading is missing in the export
        let pressure = if h % 10 == 5 { String::new() } else { format!("{:.2}", pressure) };
        writeln!(text, "2024-03-{:02}T{:02}:00,{:.2},{}", 1 + h / 24, h % 24, temp, pressure).unwrap();
    }
    fs::write(path, text).unwrap();
}

#[test]
fn test_clean_train_predict() {
    let dir = tempfile::tempdir().unwrap();
    let raw = dir.path().join("raw").join("export.csv");
    fs::create_dir_all(raw.parent().unwrap()).unwrap();
    write_raw_export(&raw, 120);

    let cleaner = DataCleaner::new();
    let df = cleaner.load_raw(&raw).unwrap();
    let mut cleaned = cleaner.clean(&df).unwrap();
    assert_eq!(cleaner.validate_time_order(&cleaned).unwrap().parsed, 120);
    let cleaned_path = dir.path().join("processed").join("cleaned.csv");
    cleaner.save(&mut cleaned, &cleaned_path).unwrap();

    let model_dir = dir.path().join("models");
    let config = ForecastConfig::new(["pressure_msl (hPa)", "humidity"])
        .with_lag_hours(12)
        .with_forecast_hours(3)
        .with_model_dir(&model_dir)
        .with_booster(quick_booster());

    let data = DataLoader::new().load_auto(&cleaned_path).unwrap();
    let report = ForecastTrainer::new(config.clone()).run(&data).unwrap();
    assert_eq!(report.n_trained(), 3);
    assert_eq!(report.n_skipped(), 3);
    assert!(model_dir.join("xgb_pressure_msl_hPa__t_1.kfm").exists());

    let registry = ModelRegistry::load_all(&model_dir).unwrap();
    assert_eq!(registry.len(), 3);

    let forecast = ForecastEngine::new(config).forecast(&data, &registry).unwrap();
    assert_eq!(forecast.len(), 3);
    assert_eq!(forecast.n_succeeded(), 3);
    for f in &forecast.forecasts {
        match f {
            ModelForecast::Succeeded { prediction, .. } => {
                assert!(prediction.value.is_finite());
                // Inference lags every column; the pressure lags are all present
                assert!(prediction.filled.is_empty());
            }
            other => panic!("unexpected failure: {:?}", other),
        }
    }
}

#[test]
fn test_missing_lag_column_is_zero_filled() {
    let x = Array2::from_shape_fn((30, 2), |(i, j)| (i + j) as f64);
    let y = x.column(0).mapv(|v| v * 0.5);
    let mut booster = XGBoostRegressor::new(quick_booster());
    booster.fit(&x, &y).unwrap();
    let model = ForecastModel::named(vec!["v_lag1".into(), "v_lag2".into()], booster.clone());

    let row = FeatureRow::new(vec!["v".into(), "v_lag1".into()], vec![9.0, 8.0]).unwrap();
    let prediction = predict_one(&row, &model, 0.0).unwrap();

    assert_eq!(prediction.filled, vec!["v_lag2".to_string()]);
    assert_eq!(prediction.value, booster.predict_row(&[8.0, 0.0]).unwrap());
}

#[test]
fn test_empty_registry_forecasts_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ModelRegistry::load_all(dir.path().join("models")).unwrap();
    let df = df!("v" => &[1.0, 2.0, 3.0]).unwrap();

    let report = ForecastEngine::new(ForecastConfig::default())
        .forecast(&df, &registry)
        .unwrap();
    assert_eq!(report.len(), 0);
}

#[test]
fn test_failing_model_does_not_stop_others() {
    let dir = tempfile::tempdir().unwrap();
    let x = Array2::from_shape_vec((5, 1), vec![1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    let y = array![2.0, 4.0, 6.0, 8.0, 10.0];
    let mut booster = XGBoostRegressor::new(quick_booster());
    booster.fit(&x, &y).unwrap();

    let named = ForecastModel::named(vec!["v_lag1".into()], booster);
    // Opaque model receives the whole row and rejects its width
    let opaque = named.clone().into_unnamed();
    save_artifact(&named, &ModelMetadata::for_target("good"), dir.path(), SerializationFormat::Binary).unwrap();
    save_artifact(&opaque, &ModelMetadata::for_target("opaque"), dir.path(), SerializationFormat::Json).unwrap();

    let registry = ModelRegistry::load_all(dir.path()).unwrap();
    let df = df!("v" => &[1.0, 2.0, 3.0, 4.0]).unwrap();
    let config = ForecastConfig::default().with_lag_hours(1);
    let report = ForecastEngine::new(config).forecast(&df, &registry).unwrap();

    assert_eq!(report.len(), 2);
    assert!(report.get("good").unwrap().value().is_some());
    assert_eq!(report.get("good").unwrap().state(), AlignState::Succeeded);
    let opaque_forecast = report.get("opaque").unwrap();
    assert_eq!(opaque_forecast.state(), AlignState::Failed);
    match opaque_forecast {
        ModelForecast::Failed { stage, .. } => assert_eq!(*stage, AlignState::Predicting),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(named.model_type(), "xgboost_regressor");
}

#[test]
fn test_per_target_persist_failure_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("xgb_x_t_1.kfm")).unwrap();
    let x: Vec<f64> = (0..30).map(|i| i as f64).collect();
    let df = df!("x" => &x).unwrap();

    let config = ForecastConfig::new(["x"])
        .with_lag_hours(2)
        .with_forecast_hours(2)
        .with_model_dir(dir.path())
        .with_booster(quick_booster());
    let report = ForecastTrainer::new(config).run(&df).unwrap();

    assert!(matches!(report.outcome("x_t+1"), Some(TargetOutcome::Failed { .. })));
    assert!(report.outcome("x_t+2").unwrap().is_trained());
}
