use super::aggregation::fold_metrics_frame;
use super::types::DataSplit;
use crate::data::TSDataset;
use crate::engines::pipeline::Pipeline;
use crate::error::Result;
use crate::metrics::{compute_metrics, Metric};
use crate::tracking::ExperimentTracker;
use crate::types::{MetricsTable, TimeRange};
use log::{debug, info};

pub const FOLD_JOB_TYPE: &str = "crossval";

/// Outcome of one fold
#[derive(Debug, Clone)]
pub struct FoldRecord {
    pub fold_number: usize,
    pub train_range: TimeRange,
    pub test_range: TimeRange,
    /// Forecast for the test window, original scale
    pub forecast: TSDataset,
    pub metrics: MetricsTable,
}

/// Runs folds against a shared, never-fitted pipeline template.
pub struct FoldExecutor<'a> {
    pipeline: &'a Pipeline,
    metrics: &'a [Box<dyn Metric>],
    tracker: &'a ExperimentTracker,
}

impl<'a> FoldExecutor<'a> {
    pub fn new(pipeline: &'a Pipeline, metrics: &'a [Box<dyn Metric>], tracker: &'a ExperimentTracker) -> Self {
        Self {
            pipeline,
            metrics,
            tracker,
        }
    }

    /// Fit a fresh copy of the pipeline on the fold's train data, forecast
    /// the test window and score it.
    pub fn run_fold(&self, split: DataSplit) -> Result<FoldRecord> {
        let DataSplit {
            fold_number,
            train,
            test,
            train_range,
            test_range,
        } = split;
        debug!(
            "Fold {}: train {} .. {}, test {} .. {}",
            fold_number, train_range.start, train_range.end, test_range.start, test_range.end
        );

        let mut pipeline = self.pipeline.clone();
        pipeline.fit(train)?;
        let forecast = pipeline.forecast()?;
        let metrics = compute_metrics(self.metrics, &test, &forecast)?;

        let metrics_df = fold_metrics_frame(&metrics)?;
        let forecast_df = forecast.to_frame();
        let test_df = test.to_frame();
        self.tracker
            .run_experiment(FOLD_JOB_TYPE, &fold_number.to_string(), |logger| {
                logger.log_backtest_run(&metrics_df, &forecast_df, &test_df)
            })?;

        info!("Fold {} is done", fold_number);
        Ok(FoldRecord {
            fold_number,
            train_range,
            test_range,
            forecast,
            metrics,
        })
    }
}
