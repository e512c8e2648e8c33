use super::base::ExperimentLogger;
use super::console::ConsoleLogger;
use super::local_file::LocalFileLogger;
use crate::config::TrackingConfig;
use crate::error::Result;
use std::sync::{Mutex, PoisonError};

/// Explicitly passed experiment-tracking handle.
///
/// `run_experiment` drives each logger through start, the given logging
/// closure and finish while holding a lifecycle lock, so records from
/// concurrently running folds are emitted whole and exactly once.
#[derive(Default)]
pub struct ExperimentTracker {
    loggers: Vec<Box<dyn ExperimentLogger>>,
    lifecycle: Mutex<()>,
}

impl ExperimentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        let mut tracker = Self::new();
        if config.console {
            tracker.add(Box::new(ConsoleLogger::new()));
        }
        if let Some(dir) = &config.log_dir {
            tracker.add(Box::new(LocalFileLogger::new(dir)));
        }
        tracker
    }

    pub fn with_logger<L: ExperimentLogger + 'static>(mut self, logger: L) -> Self {
        self.add(Box::new(logger));
        self
    }

    pub fn add(&mut self, logger: Box<dyn ExperimentLogger>) {
        self.loggers.push(logger);
    }

    pub fn len(&self) -> usize {
        self.loggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.is_empty()
    }

    /// Run one experiment on every logger. `finish_experiment` is called
    /// even when logging fails; the first error is returned.
    pub fn run_experiment<F>(&self, job_type: &str, group: &str, log: F) -> Result<()>
    where
        F: Fn(&dyn ExperimentLogger) -> Result<()>,
    {
        if self.loggers.is_empty() {
            return Ok(());
        }
        let _guard = self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner);

        for logger in &self.loggers {
            logger.start_experiment(job_type, group)?;
            let logged = log(logger.as_ref());
            let finished = logger.finish_experiment();
            logged?;
            finished?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TSDataset;
    use crate::error::FoldcastError;
    use polars::prelude::DataFrame;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Events(Arc<Mutex<Vec<String>>>);

    impl ExperimentLogger for Events {
        fn start_experiment(&self, job_type: &str, group: &str) -> Result<()> {
            self.0.lock().unwrap().push(format!("start {} {}", job_type, group));
            Ok(())
        }

        fn log_backtest_run(&self, _: &DataFrame, _: &DataFrame, _: &DataFrame) -> Result<()> {
            Err(FoldcastError::Tracking("sink unavailable".to_string()))
        }

        fn log_backtest_metrics(&self, _: &TSDataset, _: &DataFrame, _: &DataFrame, _: &DataFrame) -> Result<()> {
            Ok(())
        }

        fn finish_experiment(&self) -> Result<()> {
            self.0.lock().unwrap().push("finish".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_finish_runs_after_failed_log() {
        let events = Events::default();
        let tracker = ExperimentTracker::new().with_logger(events.clone());
        let empty = DataFrame::empty();

        let result = tracker.run_experiment("crossval", "3", |logger| {
            logger.log_backtest_run(&empty, &empty, &empty)
        });

        assert!(result.is_err());
        assert_eq!(*events.0.lock().unwrap(), vec!["start crossval 3", "finish"]);
    }

    #[test]
    fn test_empty_tracker_is_noop() {
        let tracker = ExperimentTracker::new();
        assert!(tracker.is_empty());
        assert!(tracker.run_experiment("crossval", "0", |_| unreachable!()).is_ok());
    }
}
