use crate::data::TSDataset;
use crate::error::Result;
use polars::prelude::*;

/// Experiment-tracking sink.
///
/// A tracker drives every logger through `start_experiment`, one or more
/// `log_*` calls and `finish_experiment`. Calls for one experiment never
/// interleave with another experiment's calls on the same logger.
pub trait ExperimentLogger: Send + Sync {
    fn start_experiment(&self, job_type: &str, group: &str) -> Result<()>;

    /// Record one fold: its metrics, forecast and test tables
    fn log_backtest_run(&self, metrics: &DataFrame, forecast: &DataFrame, test: &DataFrame) -> Result<()>;

    /// Record the whole backtest once all folds are aggregated
    fn log_backtest_metrics(
        &self,
        ts: &TSDataset,
        metrics_df: &DataFrame,
        forecast_df: &DataFrame,
        fold_info_df: &DataFrame,
    ) -> Result<()>;

    fn finish_experiment(&self) -> Result<()>;
}
