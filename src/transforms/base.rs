use crate::error::Result;
use polars::prelude::*;
use std::fmt;

/// Stateful feature transform over a long-format dataset frame.
///
/// Implementations must keep the row order and row count of the frame
/// they are given; they may only add or replace columns.
pub trait Transform: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Learn transform state from the frame
    fn fit(&mut self, df: &DataFrame) -> Result<()>;

    fn transform(&self, df: DataFrame) -> Result<DataFrame>;

    fn inverse_transform(&self, df: DataFrame) -> Result<DataFrame>;

    fn clone_box(&self) -> Box<dyn Transform>;

    fn fit_transform(&mut self, df: DataFrame) -> Result<DataFrame> {
        self.fit(&df)?;
        self.transform(df)
    }
}

impl Clone for Box<dyn Transform> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
