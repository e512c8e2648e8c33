pub mod backtest;
pub mod pipeline;

pub use pipeline::Pipeline;
