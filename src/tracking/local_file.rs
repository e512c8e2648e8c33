use super::base::ExperimentLogger;
use crate::data::TSDataset;
use crate::error::{FoldcastError, Result};
use polars::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Shape and column means of one logged table
#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub means: BTreeMap<String, f64>,
}

impl TableSummary {
    pub fn from_frame(df: &DataFrame) -> Self {
        let mut means = BTreeMap::new();
        for column in df.get_columns() {
            if column.dtype() == &DataType::Float64 {
                if let Some(mean) = column.as_materialized_series().mean() {
                    means.insert(column.name().to_string(), mean);
                }
            }
        }
        Self {
            rows: df.height(),
            columns: df.get_column_names().iter().map(|c| c.to_string()).collect(),
            means,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TrackedEntry {
    BacktestRun {
        metrics: TableSummary,
        forecast: TableSummary,
        test: TableSummary,
    },
    BacktestMetrics {
        segments: Vec<String>,
        timestamps: usize,
        metrics: TableSummary,
        forecast: TableSummary,
        fold_info: TableSummary,
    },
}

#[derive(Debug, Serialize)]
struct ExperimentRecord {
    job_type: String,
    group: String,
    started_at: String,
    entries: Vec<TrackedEntry>,
}

/// Writes one JSON document per experiment to `<root>/<job_type>/<group>.json`.
pub struct LocalFileLogger {
    root: PathBuf,
    current: Mutex<Option<ExperimentRecord>>,
}

impl LocalFileLogger {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            current: Mutex::new(None),
        }
    }

    fn push(&self, entry: TrackedEntry) -> Result<()> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| FoldcastError::Tracking("File logger lock poisoned".to_string()))?;
        let record = current.as_mut().ok_or_else(|| {
            FoldcastError::Tracking("Logged outside of a started experiment".to_string())
        })?;
        record.entries.push(entry);
        Ok(())
    }
}

impl ExperimentLogger for LocalFileLogger {
    fn start_experiment(&self, job_type: &str, group: &str) -> Result<()> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| FoldcastError::Tracking("File logger lock poisoned".to_string()))?;
        *current = Some(ExperimentRecord {
            job_type: job_type.to_string(),
            group: group.to_string(),
            started_at: chrono::Utc::now().to_rfc3339(),
            entries: Vec::new(),
        });
        Ok(())
    }

    fn log_backtest_run(&self, metrics: &DataFrame, forecast: &DataFrame, test: &DataFrame) -> Result<()> {
        self.push(TrackedEntry::BacktestRun {
            metrics: TableSummary::from_frame(metrics),
            forecast: TableSummary::from_frame(forecast),
            test: TableSummary::from_frame(test),
        })
    }

    fn log_backtest_metrics(
        &self,
        ts: &TSDataset,
        metrics_df: &DataFrame,
        forecast_df: &DataFrame,
        fold_info_df: &DataFrame,
    ) -> Result<()> {
        self.push(TrackedEntry::BacktestMetrics {
            segments: ts.segments().to_vec(),
            timestamps: ts.len(),
            metrics: TableSummary::from_frame(metrics_df),
            forecast: TableSummary::from_frame(forecast_df),
            fold_info: TableSummary::from_frame(fold_info_df),
        })
    }

    fn finish_experiment(&self) -> Result<()> {
        let record = self
            .current
            .lock()
            .map_err(|_| FoldcastError::Tracking("File logger lock poisoned".to_string()))?
            .take();
        let Some(record) = record else {
            return Ok(());
        };

        let dir = self.root.join(&record.job_type);
        fs::create_dir_all(&dir)?;
        let file = File::create(dir.join(format!("{}.json", record.group)))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &record)?;
        Ok(())
    }
}
