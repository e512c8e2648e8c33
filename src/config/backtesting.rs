use super::traits::ConfigSection;
use crate::engines::backtest::CrossValidationMode;
use crate::error::{FoldcastError, Result};
use serde::{Deserialize, Serialize};

/// Options of one backtest call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub n_folds: usize,
    pub mode: CrossValidationMode,
    pub aggregate_metrics: bool,
    /// Worker pool size; 1 runs folds in the calling thread
    pub n_jobs: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            n_folds: 5,
            mode: CrossValidationMode::Expand,
            aggregate_metrics: false,
            n_jobs: 1,
        }
    }
}

impl BacktestConfig {
    pub fn with_n_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    pub fn with_mode(mut self, mode: CrossValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_aggregate_metrics(mut self, aggregate_metrics: bool) -> Self {
        self.aggregate_metrics = aggregate_metrics;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }
}

impl ConfigSection for BacktestConfig {
    fn section_name() -> &'static str {
        "backtest"
    }

    fn validate(&self) -> Result<()> {
        if self.n_folds < 1 {
            return Err(FoldcastError::Configuration(format!(
                "Folds number should be a positive number, {} given",
                self.n_folds
            )));
        }
        if self.n_jobs < 1 {
            return Err(FoldcastError::Configuration(
                "Number of jobs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
