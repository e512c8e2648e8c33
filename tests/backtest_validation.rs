use chrono::{NaiveDate, TimeDelta};
use foldcast::config::BacktestConfig;
use foldcast::data::{generate_const_df, TSDataset};
use foldcast::engines::backtest::validate_backtest;
use foldcast::metrics::{ForecastMetric, Metric, MetricAggregationMode, MetricKind};
use foldcast::models::NaiveModel;
use foldcast::tracking::ExperimentTracker;
use foldcast::types::TARGET_COLUMN;
use foldcast::{FoldcastError, Pipeline};
use polars::prelude::*;

fn dataset(periods: usize) -> TSDataset {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let df = generate_const_df(periods, start, TimeDelta::days(1), 2, 1.0).unwrap();
    TSDataset::new(df, TimeDelta::days(1)).unwrap()
}

fn pipeline(horizon: usize) -> Pipeline {
    Pipeline::new(Box::new(NaiveModel::new(1).unwrap()), vec![], horizon).unwrap()
}

fn mae() -> Vec<Box<dyn Metric>> {
    vec![Box::new(ForecastMetric::mae())]
}

fn configuration_message(err: FoldcastError) -> String {
    match err {
        FoldcastError::Configuration(message) => message,
        other => panic!("expected a configuration error, got {:?}", other),
    }
}

#[test]
fn test_zero_folds() {
    let config = BacktestConfig::default().with_n_folds(0);
    let err = pipeline(5)
        .backtest(&dataset(50), &mae(), &config, &ExperimentTracker::new())
        .unwrap_err();
    assert!(configuration_message(err).contains("0 given"));
}

#[test]
fn test_zero_folds_reported_before_metrics() {
    let config = BacktestConfig::default().with_n_folds(0);
    let err = pipeline(5)
        .backtest(&dataset(50), &[], &config, &ExperimentTracker::new())
        .unwrap_err();
    assert!(configuration_message(err).contains("Folds number"));
}

#[test]
fn test_short_series_names_segment() {
    let config = BacktestConfig::default().with_n_folds(9);
    let err = pipeline(5)
        .backtest(&dataset(40), &mae(), &config, &ExperimentTracker::new())
        .unwrap_err();
    let message = configuration_message(err);
    assert!(message.contains("segment_0"));
    assert!(message.contains("45"));
}

#[test]
fn test_leading_missing_values_count_towards_length() {
    // segment_1 starts observing 10 steps after segment_0
    let ts = dataset(40);
    let mut df = ts.to_frame();
    let target: Vec<Option<f64>> = (0..80).map(|row| if (40..50).contains(&row) { None } else { Some(1.0) }).collect();
    df.with_column(Series::new(TARGET_COLUMN.into(), target)).unwrap();
    let ts = TSDataset::new(df, TimeDelta::days(1)).unwrap();

    let config = BacktestConfig::default().with_n_folds(7);
    assert!(validate_backtest(&ts, &mae(), &config, 5).is_ok());

    let config = BacktestConfig::default().with_n_folds(3);
    let result = pipeline(5)
        .backtest(&ts, &mae(), &config, &ExperimentTracker::new())
        .unwrap();
    assert_eq!(result.folds.len(), 3);
}

#[test]
fn test_fold_count_overflow() {
    let config = BacktestConfig::default().with_n_folds(usize::MAX / 2 + 1);
    let err = pipeline(2)
        .backtest(&dataset(50), &mae(), &config, &ExperimentTracker::new())
        .unwrap_err();
    assert!(configuration_message(err).contains("exceed"));
}

#[test]
fn test_empty_metrics() {
    let err = pipeline(5)
        .backtest(&dataset(50), &[], &BacktestConfig::default(), &ExperimentTracker::new())
        .unwrap_err();
    configuration_message(err);
}

#[test]
fn test_macro_metric_is_named() {
    let metrics: Vec<Box<dyn Metric>> = vec![
        Box::new(ForecastMetric::mae()),
        Box::new(ForecastMetric::new(MetricKind::Mse, MetricAggregationMode::Macro)),
    ];
    let err = pipeline(5)
        .backtest(&dataset(50), &metrics, &BacktestConfig::default(), &ExperimentTracker::new())
        .unwrap_err();
    assert!(configuration_message(err).contains("MSE"));
}

#[test]
fn test_duplicate_metric_names() {
    let metrics: Vec<Box<dyn Metric>> = vec![
        Box::new(ForecastMetric::mae()),
        Box::new(ForecastMetric::mae()),
    ];
    let err = pipeline(5)
        .backtest(&dataset(50), &metrics, &BacktestConfig::default(), &ExperimentTracker::new())
        .unwrap_err();
    assert!(configuration_message(err).contains("MAE"));
}

#[test]
fn test_zero_jobs() {
    let config = BacktestConfig::default().with_n_jobs(0);
    let err = pipeline(5)
        .backtest(&dataset(50), &mae(), &config, &ExperimentTracker::new())
        .unwrap_err();
    configuration_message(err);
}

#[test]
fn test_exact_minimum_length_leaves_no_train_data() {
    let config = BacktestConfig::default().with_n_folds(5);
    let err = pipeline(10)
        .backtest(&dataset(50), &mae(), &config, &ExperimentTracker::new())
        .unwrap_err();
    configuration_message(err);
}
