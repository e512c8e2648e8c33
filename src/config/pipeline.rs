use super::traits::ConfigSection;
use crate::error::{FoldcastError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of future timestamps to forecast
    pub horizon: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { horizon: 1 }
    }
}

impl ConfigSection for PipelineConfig {
    fn section_name() -> &'static str {
        "pipeline"
    }

    fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(FoldcastError::Configuration(
                "Horizon must be a positive number".to_string(),
            ));
        }
        Ok(())
    }
}
