use thiserror::Error;

#[derive(Error, Debug)]
pub enum FoldcastError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Metric error: {0}")]
    Metric(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Tracking error: {0}")]
    Tracking(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FoldcastError>;
