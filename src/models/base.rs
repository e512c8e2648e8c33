use crate::data::TSDataset;
use crate::error::{FoldcastError, Result};
use crate::types::TARGET_COLUMN;
use std::fmt;

/// Forecasting model fitted on a (transformed) dataset.
///
/// `forecast` receives the dataset produced by `TSDataset::make_future` and
/// returns it with the `target` column filled in, still in the transformed
/// space; the pipeline applies the inverse transforms afterwards.
pub trait Model: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn fit(&mut self, ts: &TSDataset) -> Result<()>;

    fn forecast(&self, future: TSDataset) -> Result<TSDataset>;

    fn clone_box(&self) -> Box<dyn Model>;
}

impl Clone for Box<dyn Model> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Last `n` target observations of a segment; fails when any of them is missing.
pub(crate) fn tail_history(ts: &TSDataset, segment: &str, n: usize) -> Result<Vec<f64>> {
    let values = ts.segment_values(segment, TARGET_COLUMN)?;
    if values.len() < n {
        return Err(FoldcastError::Model(format!(
            "Segment {} has {} observations, {} required",
            segment,
            values.len(),
            n
        )));
    }
    values[values.len() - n..]
        .iter()
        .map(|v| {
            v.ok_or_else(|| {
                FoldcastError::Model(format!("Segment {} has missing values in its history", segment))
            })
        })
        .collect()
}
