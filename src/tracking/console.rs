use super::base::ExperimentLogger;
use crate::data::TSDataset;
use crate::error::{FoldcastError, Result};
use polars::prelude::*;
use std::sync::Mutex;

/// Writes tracking events through the `log` facade at info level.
#[derive(Default)]
pub struct ConsoleLogger {
    current: Mutex<Option<String>>,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self::default()
    }

    fn experiment(&self) -> Result<String> {
        let current = self
            .current
            .lock()
            .map_err(|_| FoldcastError::Tracking("Console logger lock poisoned".to_string()))?;
        Ok(current.clone().unwrap_or_else(|| "<no experiment>".to_string()))
    }
}

impl ExperimentLogger for ConsoleLogger {
    fn start_experiment(&self, job_type: &str, group: &str) -> Result<()> {
        let name = format!("{}/{}", job_type, group);
        log::info!("Experiment {} started", name);
        *self
            .current
            .lock()
            .map_err(|_| FoldcastError::Tracking("Console logger lock poisoned".to_string()))? = Some(name);
        Ok(())
    }

    fn log_backtest_run(&self, metrics: &DataFrame, forecast: &DataFrame, test: &DataFrame) -> Result<()> {
        log::info!(
            "[{}] fold metrics ({} forecast rows, {} test rows):\n{}",
            self.experiment()?,
            forecast.height(),
            test.height(),
            metrics
        );
        Ok(())
    }

    fn log_backtest_metrics(
        &self,
        ts: &TSDataset,
        metrics_df: &DataFrame,
        forecast_df: &DataFrame,
        fold_info_df: &DataFrame,
    ) -> Result<()> {
        log::info!(
            "[{}] backtest over {} segments x {} timestamps, {} forecast rows\n{}\n{}",
            self.experiment()?,
            ts.segments().len(),
            ts.len(),
            forecast_df.height(),
            fold_info_df,
            metrics_df
        );
        Ok(())
    }

    fn finish_experiment(&self) -> Result<()> {
        let finished = self
            .current
            .lock()
            .map_err(|_| FoldcastError::Tracking("Console logger lock poisoned".to_string()))?
            .take();
        if let Some(name) = finished {
            log::info!("Experiment {} finished", name);
        }
        Ok(())
    }
}
