use super::traits::ConfigSection;
use crate::error::{FoldcastError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Log experiments through the `log` facade
    pub console: bool,
    /// Write one JSON document per experiment under this directory
    pub log_dir: Option<PathBuf>,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            console: true,
            log_dir: None,
        }
    }
}

impl ConfigSection for TrackingConfig {
    fn section_name() -> &'static str {
        "tracking"
    }

    fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.log_dir {
            if dir.as_os_str().is_empty() {
                return Err(FoldcastError::Configuration(
                    "Tracking log_dir must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
