use anyhow::Context;
use chrono::{NaiveDate, TimeDelta};
use foldcast::config::ConfigManager;
use foldcast::data::{generate_ar_df, TSDataset};
use foldcast::metrics::{ForecastMetric, Metric};
use foldcast::models::NaiveModel;
use foldcast::tracking::ExperimentTracker;
use foldcast::transforms::{StandardScalerTransform, Transform};
use foldcast::types::TARGET_COLUMN;
use foldcast::Pipeline;
use log::info;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let manager = ConfigManager::new();
    if let Some(path) = std::env::args().nth(1) {
        manager
            .load_from_file(&path)
            .with_context(|| format!("loading config from {}", path))?;
    }
    let config = manager.get();

    let start = NaiveDate::from_ymd_opt(2021, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("invalid start date")?;
    let df = generate_ar_df(365, start, TimeDelta::days(1), &[0.6, 0.2], 1.0, 3, 42)?;
    let ts = TSDataset::new(df, TimeDelta::days(1))?;

    let transforms: Vec<Box<dyn Transform>> =
        vec![Box::new(StandardScalerTransform::new(TARGET_COLUMN, true))];
    let pipeline = Pipeline::from_config(Box::new(NaiveModel::new(7)?), transforms, &config.pipeline)?;
    let metrics: Vec<Box<dyn Metric>> = vec![
        Box::new(ForecastMetric::mae()),
        Box::new(ForecastMetric::smape()),
    ];
    let tracker = ExperimentTracker::from_config(&config.tracking);

    let (metrics_df, forecast_df, fold_info_df) = pipeline
        .backtest(&ts, &metrics, &config.backtest, &tracker)?
        .into_tables();

    info!("Metrics:\n{}", metrics_df);
    info!("Forecasts:\n{}", forecast_df.head(Some(10)));
    info!("Folds:\n{}", fold_info_df);
    Ok(())
}
