use crate::error::{FoldcastError, Result};
use crate::types::{SEGMENT_COLUMN, TARGET_COLUMN, TIMESTAMP_COLUMN};
use polars::prelude::*;
use std::collections::HashMap;

pub struct DataValidator;

impl DataValidator {
    pub fn required_columns() -> [&'static str; 3] {
        [TIMESTAMP_COLUMN, SEGMENT_COLUMN, TARGET_COLUMN]
    }

    /// Validate that a long-format frame has timestamp, segment and target columns
    pub fn validate_required_columns(df: &DataFrame) -> Result<()> {
        let columns = df.get_column_names();
        for required in Self::required_columns() {
            if !columns.iter().any(|col| col.as_str() == required) {
                return Err(FoldcastError::Dataset(format!(
                    "Missing required column: {} (found: {:?})",
                    required, columns
                )));
            }
        }
        Ok(())
    }

    /// Check for minimum required rows
    pub fn validate_minimum_rows(df: &DataFrame, min_rows: usize) -> Result<()> {
        if df.height() < min_rows {
            return Err(FoldcastError::Dataset(format!(
                "Insufficient data: {} rows, minimum {} required",
                df.height(),
                min_rows
            )));
        }
        Ok(())
    }

    /// Null count per column, only for columns that contain nulls
    pub fn check_nulls(df: &DataFrame) -> HashMap<String, usize> {
        df.get_columns()
            .iter()
            .filter(|column| column.null_count() > 0)
            .map(|column| (column.name().to_string(), column.null_count()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn test_missing_target_column() {
        let df = df! {
            "timestamp" => &[0i64, 1],
            "segment" => &["a", "a"],
        }
        .unwrap();

        assert!(DataValidator::validate_required_columns(&df).is_err());
    }

    #[test]
    fn test_null_report() {
        let df = df! {
            "target" => &[Some(1.0), None, None],
            "feature" => &[1.0, 2.0, 3.0],
        }
        .unwrap();

        let report = DataValidator::check_nulls(&df);
        assert_eq!(report.get("target"), Some(&2));
        assert!(!report.contains_key("feature"));
    }
}
