use crate::data::TSDataset;
use crate::error::{FoldcastError, Result};
use crate::types::TimeRange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Train window policy across folds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossValidationMode {
    /// Train always starts at the first timestamp; history grows per fold
    Expand,
    /// Train start moves forward one horizon per fold; history length is fixed
    Constant,
}

impl CrossValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expand => "expand",
            Self::Constant => "constant",
        }
    }

    pub(crate) fn constant_history_length(&self) -> usize {
        match self {
            Self::Expand => 0,
            Self::Constant => 1,
        }
    }
}

impl fmt::Display for CrossValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrossValidationMode {
    type Err = FoldcastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "expand" => Ok(Self::Expand),
            "constant" => Ok(Self::Constant),
            other => Err(FoldcastError::Configuration(format!(
                "Only '{}' and '{}' modes allowed, got '{}'",
                Self::Expand,
                Self::Constant,
                other
            ))),
        }
    }
}

/// Index positions of one fold, all inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldBounds {
    pub fold_number: usize,
    pub min_train_idx: usize,
    pub max_train_idx: usize,
    pub min_test_idx: usize,
    pub max_test_idx: usize,
}

impl FoldBounds {
    pub fn train_len(&self) -> usize {
        self.max_train_idx - self.min_train_idx + 1
    }

    pub fn test_len(&self) -> usize {
        self.max_test_idx - self.min_test_idx + 1
    }
}

/// One train/test pair produced by the splitter
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub fold_number: usize,
    pub train: TSDataset,
    pub test: TSDataset,
    pub train_range: TimeRange,
    pub test_range: TimeRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("expand".parse::<CrossValidationMode>().unwrap(), CrossValidationMode::Expand);
        assert_eq!("Constant".parse::<CrossValidationMode>().unwrap(), CrossValidationMode::Constant);

        let err = "sliding".parse::<CrossValidationMode>().unwrap_err();
        assert!(matches!(err, FoldcastError::Configuration(_)));
    }
}
