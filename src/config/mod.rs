pub mod backtesting;
pub mod manager;
pub mod pipeline;
pub mod tracking;
pub mod traits;

pub use backtesting::BacktestConfig;
pub use manager::{AppConfig, ConfigManager};
pub use pipeline::PipelineConfig;
pub use tracking::TrackingConfig;
pub use traits::ConfigSection;
