use super::types::{CrossValidationMode, DataSplit, FoldBounds};
use crate::data::TSDataset;
use crate::error::{FoldcastError, Result};
use crate::types::TimeRange;

/// Splits a dataset into `n_folds` consecutive test windows of `horizon`
/// timestamps at the end of the index, oldest window first.
#[derive(Debug, Clone)]
pub struct FoldSplitter {
    n_folds: usize,
    horizon: usize,
    mode: CrossValidationMode,
}

impl FoldSplitter {
    pub fn new(n_folds: usize, horizon: usize, mode: CrossValidationMode) -> Result<Self> {
        if n_folds < 1 {
            return Err(FoldcastError::Configuration(format!(
                "Folds number should be a positive number, {} given",
                n_folds
            )));
        }
        if horizon < 1 {
            return Err(FoldcastError::Configuration(
                "Horizon must be a positive number".to_string(),
            ));
        }
        if horizon.checked_mul(n_folds).is_none() {
            return Err(FoldcastError::Configuration(format!(
                "{} folds of horizon {} exceed the addressable timestamp range",
                n_folds, horizon
            )));
        }
        Ok(Self {
            n_folds,
            horizon,
            mode,
        })
    }

    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn mode(&self) -> CrossValidationMode {
        self.mode
    }

    /// Fold positions for an index of `total` timestamps
    pub fn fold_bounds(&self, total: usize) -> Result<Vec<FoldBounds>> {
        // checked in `new`
        let required = self.horizon * self.n_folds;
        if total <= required {
            return Err(FoldcastError::Configuration(format!(
                "Index has {} timestamps; {} folds of horizon {} leave no train data for the first fold",
                total, self.n_folds, self.horizon
            )));
        }

        let constant_history_length = self.mode.constant_history_length();
        let bounds = (1..=self.n_folds)
            .rev()
            .map(|offset| {
                let fold_number = self.n_folds - offset;
                let max_train_idx = total - self.horizon * offset - 1;
                let min_test_idx = max_train_idx + 1;
                FoldBounds {
                    fold_number,
                    min_train_idx: fold_number * self.horizon * constant_history_length,
                    max_train_idx,
                    min_test_idx,
                    max_test_idx: min_test_idx + self.horizon - 1,
                }
            })
            .collect();
        Ok(bounds)
    }

    /// Lazily slice `ts` into train/test pairs
    pub fn generate_folds<'a>(&self, ts: &'a TSDataset) -> Result<FoldIter<'a>> {
        Ok(FoldIter {
            ts,
            bounds: self.fold_bounds(ts.len())?.into_iter(),
        })
    }
}

/// Train/test pairs in fold order. Each pair owns its own copy of the data.
pub struct FoldIter<'a> {
    ts: &'a TSDataset,
    bounds: std::vec::IntoIter<FoldBounds>,
}

impl<'a> FoldIter<'a> {
    fn split(&self, bounds: FoldBounds) -> Result<DataSplit> {
        let index = self.ts.index();
        let train_range = TimeRange::new(index[bounds.min_train_idx], index[bounds.max_train_idx]);
        let test_range = TimeRange::new(index[bounds.min_test_idx], index[bounds.max_test_idx]);

        let (train, test) = self.ts.train_test_split(
            train_range.start,
            train_range.end,
            test_range.start,
            test_range.end,
        )?;

        Ok(DataSplit {
            fold_number: bounds.fold_number,
            train,
            test,
            train_range,
            test_range,
        })
    }
}

impl<'a> Iterator for FoldIter<'a> {
    type Item = Result<DataSplit>;

    fn next(&mut self) -> Option<Self::Item> {
        let bounds = self.bounds.next()?;
        Some(self.split(bounds))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.bounds.size_hint()
    }
}

impl<'a> ExactSizeIterator for FoldIter<'a> {}

/// Convenience wrapper around `FoldSplitter::generate_folds`
pub fn generate_folds(
    ts: &TSDataset,
    n_folds: usize,
    horizon: usize,
    mode: CrossValidationMode,
) -> Result<FoldIter<'_>> {
    FoldSplitter::new(n_folds, horizon, mode)?.generate_folds(ts)
}
