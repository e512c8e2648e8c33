use super::functions;
use crate::data::TSDataset;
use crate::error::{FoldcastError, Result};
use crate::types::{MetricsTable, TARGET_COLUMN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How a metric reports its score across segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricAggregationMode {
    /// One score per segment
    PerSegment,
    /// Per-segment scores averaged into a single value keyed `"macro"`
    Macro,
}

impl fmt::Display for MetricAggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerSegment => write!(f, "per-segment"),
            Self::Macro => write!(f, "macro"),
        }
    }
}

pub trait Metric: Send + Sync {
    fn name(&self) -> &str;

    fn mode(&self) -> MetricAggregationMode;

    /// Score `y_pred` against `y_true` on the `target` column
    fn compute(&self, y_true: &TSDataset, y_pred: &TSDataset) -> Result<BTreeMap<String, f64>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Mae,
    Mse,
    Mape,
    Smape,
    MedAe,
    R2,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mae => "MAE",
            Self::Mse => "MSE",
            Self::Mape => "MAPE",
            Self::Smape => "SMAPE",
            Self::MedAe => "MedAE",
            Self::R2 => "R2",
        }
    }

    fn score(&self, y_true: &[f64], y_pred: &[f64]) -> f64 {
        match self {
            Self::Mae => functions::mae(y_true, y_pred),
            Self::Mse => functions::mse(y_true, y_pred),
            Self::Mape => functions::mape(y_true, y_pred),
            Self::Smape => functions::smape(y_true, y_pred),
            Self::MedAe => functions::medae(y_true, y_pred),
            Self::R2 => functions::r2(y_true, y_pred),
        }
    }
}

/// Regression error metric on the target column
#[derive(Debug, Clone)]
pub struct ForecastMetric {
    kind: MetricKind,
    mode: MetricAggregationMode,
}

impl ForecastMetric {
    pub fn new(kind: MetricKind, mode: MetricAggregationMode) -> Self {
        Self { kind, mode }
    }

    pub fn mae() -> Self {
        Self::new(MetricKind::Mae, MetricAggregationMode::PerSegment)
    }

    pub fn mse() -> Self {
        Self::new(MetricKind::Mse, MetricAggregationMode::PerSegment)
    }

    pub fn mape() -> Self {
        Self::new(MetricKind::Mape, MetricAggregationMode::PerSegment)
    }

    pub fn smape() -> Self {
        Self::new(MetricKind::Smape, MetricAggregationMode::PerSegment)
    }

    pub fn medae() -> Self {
        Self::new(MetricKind::MedAe, MetricAggregationMode::PerSegment)
    }

    pub fn r2() -> Self {
        Self::new(MetricKind::R2, MetricAggregationMode::PerSegment)
    }

    fn aligned_values(&self, ts: &TSDataset, segment: &str, role: &str) -> Result<Vec<f64>> {
        ts.segment_values(segment, TARGET_COLUMN)?
            .into_iter()
            .map(|v| {
                v.ok_or_else(|| {
                    FoldcastError::Metric(format!(
                        "{}: {} target of segment {} has missing values",
                        self.name(),
                        role,
                        segment
                    ))
                })
            })
            .collect()
    }
}

impl Metric for ForecastMetric {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    fn mode(&self) -> MetricAggregationMode {
        self.mode
    }

    fn compute(&self, y_true: &TSDataset, y_pred: &TSDataset) -> Result<BTreeMap<String, f64>> {
        if y_true.segments() != y_pred.segments() {
            return Err(FoldcastError::Metric(format!(
                "{}: segments differ between true {:?} and predicted {:?}",
                self.name(),
                y_true.segments(),
                y_pred.segments()
            )));
        }
        if y_true.index() != y_pred.index() {
            return Err(FoldcastError::Metric(format!(
                "{}: true and predicted timestamps are not aligned",
                self.name()
            )));
        }
        if y_true.is_empty() {
            return Err(FoldcastError::Metric(format!("{}: nothing to score", self.name())));
        }

        let mut scores = BTreeMap::new();
        for segment in y_true.segments() {
            let truth = self.aligned_values(y_true, segment, "true")?;
            let pred = self.aligned_values(y_pred, segment, "predicted")?;
            scores.insert(segment.clone(), self.kind.score(&truth, &pred));
        }

        match self.mode {
            MetricAggregationMode::PerSegment => Ok(scores),
            MetricAggregationMode::Macro => {
                let mean = scores.values().sum::<f64>() / scores.len() as f64;
                Ok(BTreeMap::from([("macro".to_string(), mean)]))
            }
        }
    }
}

/// Score every metric, keyed by metric name
pub fn compute_metrics(
    metrics: &[Box<dyn Metric>],
    y_true: &TSDataset,
    y_pred: &TSDataset,
) -> Result<MetricsTable> {
    metrics
        .iter()
        .map(|metric| Ok((metric.name().to_string(), metric.compute(y_true, y_pred)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use polars::df;

    fn dataset(values: &[f64]) -> TSDataset {
        let day = 86_400_000i64;
        let df = df! {
            "timestamp" => &[0, day, 0, day],
            "segment" => &["a", "a", "b", "b"],
            "target" => values,
        }
        .unwrap();
        TSDataset::new(df, TimeDelta::days(1)).unwrap()
    }

    #[test]
    fn test_per_segment_scores() {
        let y_true = dataset(&[1.0, 2.0, 10.0, 10.0]);
        let y_pred = dataset(&[2.0, 2.0, 13.0, 7.0]);

        let scores = ForecastMetric::mae().compute(&y_true, &y_pred).unwrap();
        assert_eq!(scores.get("a"), Some(&0.5));
        assert_eq!(scores.get("b"), Some(&3.0));
    }

    #[test]
    fn test_macro_mode_averages_segments() {
        let y_true = dataset(&[1.0, 2.0, 10.0, 10.0]);
        let y_pred = dataset(&[2.0, 2.0, 13.0, 7.0]);

        let metric = ForecastMetric::new(MetricKind::Mae, MetricAggregationMode::Macro);
        let scores = metric.compute(&y_true, &y_pred).unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores.get("macro"), Some(&1.75));
    }

    #[test]
    fn test_missing_prediction_is_an_error() {
        let day = 86_400_000i64;
        let y_true = dataset(&[1.0, 2.0, 10.0, 10.0]);
        let df = df! {
            "timestamp" => &[0, day, 0, day],
            "segment" => &["a", "a", "b", "b"],
            "target" => &[Some(1.0), None, Some(1.0), Some(1.0)],
        }
        .unwrap();
        let y_pred = TSDataset::new(df, TimeDelta::days(1)).unwrap();

        assert!(ForecastMetric::mse().compute(&y_true, &y_pred).is_err());
    }
}
