use super::base::Transform;
use crate::error::{FoldcastError, Result};
use crate::types::SEGMENT_COLUMN;
use polars::prelude::*;
use std::collections::BTreeMap;

/// Per-segment standard scaling of one column: `(x - mean) / std`.
#[derive(Debug, Clone)]
pub struct StandardScalerTransform {
    in_column: String,
    inplace: bool,
    out_column: String,
    // segment -> (mean, std)
    stats: BTreeMap<String, (f64, f64)>,
}

impl StandardScalerTransform {
    pub fn new(in_column: &str, inplace: bool) -> Self {
        let out_column = if inplace {
            in_column.to_string()
        } else {
            format!("{}_scaled", in_column)
        };
        Self {
            in_column: in_column.to_string(),
            inplace,
            out_column,
            stats: BTreeMap::new(),
        }
    }

    pub fn stats(&self) -> &BTreeMap<String, (f64, f64)> {
        &self.stats
    }

    fn map_rows<F>(&self, df: &DataFrame, column: &str, f: F) -> Result<Series>
    where
        F: Fn(f64, f64, f64) -> f64,
    {
        if self.stats.is_empty() {
            return Err(FoldcastError::Transform(
                "StandardScalerTransform is not fitted".to_string(),
            ));
        }
        let segments = df.column(SEGMENT_COLUMN)?.str()?;
        let values = df.column(column)?.cast(&DataType::Float64)?;

        let mapped = segments
            .into_iter()
            .zip(values.f64()?.into_iter())
            .map(|(segment, value)| {
                let segment = segment.unwrap_or_default();
                let &(mean, std) = self.stats.get(segment).ok_or_else(|| {
                    FoldcastError::Transform(format!("Segment {} was not seen during fit", segment))
                })?;
                Ok(value.map(|v| f(v, mean, std)))
            })
            .collect::<Result<Vec<Option<f64>>>>()?;

        Ok(Series::new(self.out_column.as_str().into(), mapped))
    }
}

impl Transform for StandardScalerTransform {
    fn name(&self) -> &str {
        "StandardScalerTransform"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        let segments = df.column(SEGMENT_COLUMN)?.str()?;
        let values = df.column(&self.in_column)?.cast(&DataType::Float64)?;

        let mut acc: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (segment, value) in segments.into_iter().zip(values.f64()?.into_iter()) {
            if let (Some(segment), Some(value)) = (segment, value) {
                acc.entry(segment.to_string()).or_default().push(value);
            }
        }

        self.stats = acc
            .into_iter()
            .map(|(segment, values)| {
                let n = values.len() as f64;
                let mean = values.iter().sum::<f64>() / n;
                let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
                let std = if variance > 0.0 { variance.sqrt() } else { 1.0 };
                (segment, (mean, std))
            })
            .collect();
        Ok(())
    }

    fn transform(&self, mut df: DataFrame) -> Result<DataFrame> {
        let scaled = self.map_rows(&df, &self.in_column, |v, mean, std| (v - mean) / std)?;
        df.with_column(scaled)?;
        Ok(df)
    }

    fn inverse_transform(&self, mut df: DataFrame) -> Result<DataFrame> {
        if !self.inplace {
            return Ok(df);
        }
        let restored = self.map_rows(&df, &self.out_column, |v, mean, std| v * std + mean)?;
        df.with_column(restored)?;
        Ok(df)
    }

    fn clone_box(&self) -> Box<dyn Transform> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn frame() -> DataFrame {
        df! {
            "segment" => &["a", "a", "b", "b"],
            "target" => &[1.0, 3.0, 10.0, 10.0],
        }
        .unwrap()
    }

    #[test]
    fn test_per_segment_stats() {
        let mut scaler = StandardScalerTransform::new("target", true);
        let out = scaler.fit_transform(frame()).unwrap();

        assert_eq!(scaler.stats().get("a"), Some(&(2.0, 1.0)));
        // constant segment falls back to unit std
        assert_eq!(scaler.stats().get("b"), Some(&(10.0, 1.0)));

        let target = out.column("target").unwrap().f64().unwrap();
        assert_eq!(target.get(0), Some(-1.0));
        assert_eq!(target.get(1), Some(1.0));
        assert_eq!(target.get(2), Some(0.0));
    }

    #[test]
    fn test_inverse_restores_values() {
        let mut scaler = StandardScalerTransform::new("target", true);
        let out = scaler.fit_transform(frame()).unwrap();
        let restored = scaler.inverse_transform(out).unwrap();
        assert!(restored.equals(&frame()));
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let scaler = StandardScalerTransform::new("target", true);
        assert!(scaler.transform(frame()).is_err());
    }
}
