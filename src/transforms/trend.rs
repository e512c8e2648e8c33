use super::base::Transform;
use super::feature_selection::REGRESSOR_PREFIX;
use crate::analysis::BinarySegmentation;
use crate::error::{FoldcastError, Result};
use crate::types::{SEGMENT_COLUMN, TIMESTAMP_COLUMN};
use polars::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
struct TrendPiece {
    start_ms: i64,
    slope: f64,
    intercept: f64,
}

impl TrendPiece {
    fn value_at(&self, origin_ms: i64, t_ms: i64) -> f64 {
        self.intercept + self.slope * (t_ms - origin_ms) as f64
    }
}

#[derive(Debug, Clone)]
struct SegmentTrend {
    origin_ms: i64,
    pieces: Vec<TrendPiece>,
}

impl SegmentTrend {
    fn value_at(&self, t_ms: i64) -> f64 {
        // timestamps before the first piece use it; after the last one extrapolate it
        let piece = self
            .pieces
            .iter()
            .rev()
            .find(|p| p.start_ms <= t_ms)
            .unwrap_or(&self.pieces[0]);
        piece.value_at(self.origin_ms, t_ms)
    }
}

/// Piecewise linear trend of `in_column` written as a regressor.
///
/// Each segment is split at change points found by binary segmentation and
/// every regime gets its own least-squares line over time. The fitted trend
/// lands in `regressor_{in_column}_{out_postfix}`; the input column is left
/// untouched, so inverse transform is the identity.
#[derive(Debug, Clone)]
pub struct TrendTransform {
    in_column: String,
    out_postfix: String,
    n_bkps: usize,
    min_size: usize,
    trends: BTreeMap<String, SegmentTrend>,
}

impl TrendTransform {
    pub fn new(in_column: &str, n_bkps: usize) -> Self {
        Self {
            in_column: in_column.to_string(),
            out_postfix: "trend".to_string(),
            n_bkps,
            min_size: 2,
            trends: BTreeMap::new(),
        }
    }

    pub fn with_out_postfix(mut self, postfix: &str) -> Self {
        self.out_postfix = postfix.to_string();
        self
    }

    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }

    pub fn out_column(&self) -> String {
        format!("{}{}_{}", REGRESSOR_PREFIX, self.in_column, self.out_postfix)
    }

    fn fit_segment(&self, segment: &str, points: &[(i64, f64)]) -> Result<SegmentTrend> {
        let origin_ms = points
            .first()
            .map(|(t, _)| *t)
            .ok_or_else(|| {
                FoldcastError::Transform(format!(
                    "Segment {} has no {} values to fit a trend on",
                    segment, self.in_column
                ))
            })?;

        let signal: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
        let ends = BinarySegmentation::new(self.n_bkps)
            .with_min_size(self.min_size)
            .map_err(|e| FoldcastError::Transform(e.to_string()))?
            .predict(&signal);

        let mut pieces = Vec::with_capacity(ends.len());
        let mut start = 0;
        for end in ends {
            let regime = &points[start..end];
            let xs: Vec<f64> = regime.iter().map(|(t, _)| (t - origin_ms) as f64).collect();
            let (slope, intercept) = least_squares(&xs, &signal[start..end]);
            pieces.push(TrendPiece {
                start_ms: regime[0].0,
                slope,
                intercept,
            });
            start = end;
        }
        Ok(SegmentTrend { origin_ms, pieces })
    }
}

fn least_squares(xs: &[f64], ys: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (mut cov, mut var) = (0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mean_x) * (y - mean_y);
        var += (x - mean_x).powi(2);
    }
    let slope = if var > 0.0 { cov / var } else { 0.0 };
    (slope, mean_y - slope * mean_x)
}

impl Transform for TrendTransform {
    fn name(&self) -> &str {
        "TrendTransform"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        let segments = df.column(SEGMENT_COLUMN)?.str()?;
        let timestamps = df.column(TIMESTAMP_COLUMN)?.cast(&DataType::Int64)?;
        let values = df.column(&self.in_column)?.cast(&DataType::Float64)?;

        let mut points: BTreeMap<String, Vec<(i64, f64)>> = BTreeMap::new();
        for ((segment, t), value) in segments
            .into_iter()
            .zip(timestamps.i64()?.into_iter())
            .zip(values.f64()?.into_iter())
        {
            let Some(segment) = segment else { continue };
            let entry = points.entry(segment.to_string()).or_default();
            if let (Some(t), Some(value)) = (t, value) {
                entry.push((t, value));
            }
        }

        self.trends = points
            .iter()
            .map(|(segment, pts)| Ok((segment.clone(), self.fit_segment(segment, pts)?)))
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn transform(&self, mut df: DataFrame) -> Result<DataFrame> {
        if self.trends.is_empty() {
            return Err(FoldcastError::Transform("TrendTransform is not fitted".to_string()));
        }
        let segments = df.column(SEGMENT_COLUMN)?.str()?;
        let timestamps = df.column(TIMESTAMP_COLUMN)?.cast(&DataType::Int64)?;

        let trend = segments
            .into_iter()
            .zip(timestamps.i64()?.into_iter())
            .map(|(segment, t)| {
                let segment = segment.unwrap_or_default();
                let fitted = self.trends.get(segment).ok_or_else(|| {
                    FoldcastError::Transform(format!("Segment {} was not seen during fit", segment))
                })?;
                Ok(t.map(|t| fitted.value_at(t)))
            })
            .collect::<Result<Vec<Option<f64>>>>()?;

        df.with_column(Series::new(self.out_column().into(), trend))?;
        Ok(df)
    }

    fn inverse_transform(&self, df: DataFrame) -> Result<DataFrame> {
        Ok(df)
    }

    fn clone_box(&self) -> Box<dyn Transform> {
        Box::new(self.clone())
    }
}
