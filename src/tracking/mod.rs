pub mod base;
pub mod console;
pub mod local_file;
pub mod tracker;

pub use base::ExperimentLogger;
pub use console::ConsoleLogger;
pub use local_file::{LocalFileLogger, TableSummary};
pub use tracker::ExperimentTracker;
