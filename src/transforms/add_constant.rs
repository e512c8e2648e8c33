use super::base::Transform;
use crate::error::{FoldcastError, Result};
use polars::prelude::*;

/// Adds a constant to a column.
///
/// With `inplace` the column is overwritten and the inverse subtracts the
/// constant again; otherwise the result goes to `{in_column}_add_{value}`
/// and the inverse leaves the frame untouched.
#[derive(Debug, Clone)]
pub struct AddConstTransform {
    value: f64,
    in_column: String,
    inplace: bool,
    out_column: String,
}

impl AddConstTransform {
    pub fn new(value: f64, in_column: &str, inplace: bool) -> Self {
        let out_column = if inplace {
            in_column.to_string()
        } else {
            format!("{}_add_{}", in_column, value)
        };
        Self {
            value,
            in_column: in_column.to_string(),
            inplace,
            out_column,
        }
    }

    pub fn out_column(&self) -> &str {
        &self.out_column
    }
}

impl Transform for AddConstTransform {
    fn name(&self) -> &str {
        "AddConstTransform"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        df.column(&self.in_column).map_err(|_| {
            FoldcastError::Transform(format!("Column {} is not in the dataset", self.in_column))
        })?;
        Ok(())
    }

    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let out = df
            .lazy()
            .with_column((col(self.in_column.as_str()) + lit(self.value)).alias(self.out_column.as_str()))
            .collect()?;
        Ok(out)
    }

    fn inverse_transform(&self, df: DataFrame) -> Result<DataFrame> {
        if !self.inplace {
            return Ok(df);
        }
        let out = df
            .lazy()
            .with_column((col(self.out_column.as_str()) - lit(self.value)).alias(self.in_column.as_str()))
            .collect()?;
        Ok(out)
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
            "segment" => &["a", "a", "b"],
            "target" => &[1.0, 2.0, 3.0],
        }
        .unwrap()
    }

    #[test]
    fn test_inplace_roundtrip() {
        let mut transform = AddConstTransform::new(10.0, "target", true);
        let shifted = transform.fit_transform(frame()).unwrap();
        let target = shifted.column("target").unwrap().f64().unwrap();
        assert_eq!(target.get(2), Some(13.0));

        let restored = transform.inverse_transform(shifted).unwrap();
        assert!(restored.equals(&frame()));
    }

    #[test]
    fn test_out_column_keeps_source() {
        let mut transform = AddConstTransform::new(1.5, "target", false);
        let out = transform.fit_transform(frame()).unwrap();
        assert_eq!(transform.out_column(), "target_add_1.5");
        assert_eq!(out.column("target_add_1.5").unwrap().f64().unwrap().get(0), Some(2.5));
        assert_eq!(out.column("target").unwrap().f64().unwrap().get(0), Some(1.0));
    }

    #[test]
    fn test_fit_rejects_missing_column() {
        let mut transform = AddConstTransform::new(1.0, "regressor_x", true);
        assert!(transform.fit(&frame()).is_err());
    }
}
