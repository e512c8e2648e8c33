use super::aggregation::{fold_info_frame, forecast_frame, metrics_frame};
use super::executor::{FoldExecutor, FoldRecord};
use super::splitter::FoldSplitter;
use crate::config::BacktestConfig;
use crate::data::TSDataset;
use crate::engines::pipeline::Pipeline;
use crate::error::{FoldcastError, Result};
use crate::metrics::{Metric, MetricAggregationMode};
use crate::tracking::ExperimentTracker;
use crate::types::TARGET_COLUMN;
use log::{debug, info};
use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

pub const RESULTS_JOB_TYPE: &str = "crossval_results";
pub const RESULTS_GROUP: &str = "all";

/// Backtest tables plus the per-fold records they were built from
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub metrics: DataFrame,
    pub forecasts: DataFrame,
    pub fold_info: DataFrame,
    pub folds: BTreeMap<usize, FoldRecord>,
}

impl BacktestResult {
    /// `(metrics_df, forecast_df, fold_info_df)`
    pub fn into_tables(self) -> (DataFrame, DataFrame, DataFrame) {
        (self.metrics, self.forecasts, self.fold_info)
    }
}

/// Check backtest inputs before any fold runs. Fold count is checked
/// first, then segment lengths, then the metric list. A segment's length
/// counts missing target values too.
pub fn validate_backtest(
    ts: &TSDataset,
    metrics: &[Box<dyn Metric>],
    config: &BacktestConfig,
    horizon: usize,
) -> Result<()> {
    if config.n_folds < 1 {
        return Err(FoldcastError::Configuration(format!(
            "Folds number should be a positive number, {} given",
            config.n_folds
        )));
    }

    let min_required_length = horizon.checked_mul(config.n_folds).ok_or_else(|| {
        FoldcastError::Configuration(format!(
            "{} folds of horizon {} exceed the addressable timestamp range",
            config.n_folds, horizon
        ))
    })?;
    for segment in ts.segments() {
        let length = ts.segment_values(segment, TARGET_COLUMN)?.len();
        if length < min_required_length {
            return Err(FoldcastError::Configuration(format!(
                "All the series from feature dataframe should contain at least {} x {} = {} timestamps; \
                 series {} does not.",
                horizon, config.n_folds, min_required_length, segment
            )));
        }
    }

    if metrics.is_empty() {
        return Err(FoldcastError::Configuration(
            "At least one metric required".to_string(),
        ));
    }
    let mut names = HashSet::new();
    for metric in metrics {
        if metric.mode() != MetricAggregationMode::PerSegment {
            return Err(FoldcastError::Configuration(format!(
                "All the metrics should be in {}, {} is in {} mode",
                MetricAggregationMode::PerSegment,
                metric.name(),
                metric.mode()
            )));
        }
        if !names.insert(metric.name()) {
            return Err(FoldcastError::Configuration(format!(
                "Metric {} is given more than once",
                metric.name()
            )));
        }
    }

    if config.n_jobs < 1 {
        return Err(FoldcastError::Configuration(format!(
            "Number of jobs should be a positive number, {} given",
            config.n_jobs
        )));
    }
    Ok(())
}

/// Drives a full backtest of one pipeline template.
pub struct BacktestOrchestrator<'a> {
    pipeline: &'a Pipeline,
    tracker: &'a ExperimentTracker,
}

impl<'a> BacktestOrchestrator<'a> {
    pub fn new(pipeline: &'a Pipeline, tracker: &'a ExperimentTracker) -> Self {
        Self { pipeline, tracker }
    }

    pub fn run(&self, ts: &TSDataset, metrics: &[Box<dyn Metric>], config: &BacktestConfig) -> Result<BacktestResult> {
        let horizon = self.pipeline.horizon();
        validate_backtest(ts, metrics, config, horizon)?;
        info!(
            "Backtest: {} folds, horizon {}, {} mode, {} jobs",
            config.n_folds, horizon, config.mode, config.n_jobs
        );

        let splitter = FoldSplitter::new(config.n_folds, horizon, config.mode)?;
        let splits = splitter.generate_folds(ts)?;
        let executor = FoldExecutor::new(self.pipeline, metrics, self.tracker);

        let records: Vec<FoldRecord> = if config.n_jobs == 1 {
            splits
                .map(|split| executor.run_fold(split?))
                .collect::<Result<_>>()?
        } else {
            debug!("Running folds on {} worker threads", config.n_jobs);
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.n_jobs)
                .build()
                .map_err(|e| FoldcastError::Execution(format!("Failed to build worker pool: {}", e)))?;
            pool.install(|| {
                splits
                    .par_bridge()
                    .map(|split| executor.run_fold(split?))
                    .collect::<Result<Vec<_>>>()
            })?
        };
        let folds: BTreeMap<usize, FoldRecord> =
            records.into_iter().map(|record| (record.fold_number, record)).collect();

        let metrics_df = metrics_frame(&folds, config.aggregate_metrics)?;
        let forecast_df = forecast_frame(&folds)?;
        let fold_info_df = fold_info_frame(&folds)?;

        self.tracker
            .run_experiment(RESULTS_JOB_TYPE, RESULTS_GROUP, |logger| {
                logger.log_backtest_metrics(ts, &metrics_df, &forecast_df, &fold_info_df)
            })?;
        info!("Backtest finished: {} folds", folds.len());

        Ok(BacktestResult {
            metrics: metrics_df,
            forecasts: forecast_df,
            fold_info: fold_info_df,
            folds,
        })
    }
}
