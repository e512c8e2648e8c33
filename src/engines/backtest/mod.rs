//! Time-series cross-validation: fold splitting, per-fold execution and
//! aggregation of fold results.

pub mod aggregation;
pub mod executor;
pub mod orchestrator;
pub mod splitter;
pub mod types;

pub use executor::{FoldExecutor, FoldRecord};
pub use orchestrator::{validate_backtest, BacktestOrchestrator, BacktestResult};
pub use splitter::{generate_folds, FoldIter, FoldSplitter};
pub use types::{CrossValidationMode, DataSplit, FoldBounds};
