pub mod analysis;
pub mod config;
pub mod data;
pub mod engines;
pub mod error;
pub mod metrics;
pub mod models;
pub mod tracking;
pub mod transforms;
pub mod types;

pub use engines::backtest::{BacktestResult, CrossValidationMode, FoldSplitter};
pub use engines::Pipeline;
pub use error::{FoldcastError, Result};
