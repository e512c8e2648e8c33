use super::{
    backtesting::BacktestConfig, pipeline::PipelineConfig, tracking::TrackingConfig,
    traits::ConfigSection,
};
use crate::error::{FoldcastError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Prefix of environment overrides, e.g. `FOLDCAST__BACKTEST__N_FOLDS=3`
pub const ENV_PREFIX: &str = "FOLDCAST";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineConfig,
    pub backtest: BacktestConfig,
    pub tracking: TrackingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        self.backtest.validate()?;
        self.tracking.validate()?;
        Ok(())
    }
}

pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigManager {
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(AppConfig::default())),
        }
    }

    /// Load a TOML or JSON file, layered with `FOLDCAST__SECTION__KEY`
    /// environment overrides.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| FoldcastError::Configuration(format!("Failed to read config: {}", e)))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| FoldcastError::Configuration(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
        Ok(())
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let config = self.get();
        let toml_str = toml::to_string_pretty(&config)
            .map_err(|e| FoldcastError::Configuration(format!("Failed to serialize: {}", e)))?;

        std::fs::write(path, toml_str)
            .map_err(|e| FoldcastError::Configuration(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn get(&self) -> AppConfig {
        self.config.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Apply `f` and keep the result only if it still validates
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = config.clone();
        f(&mut updated);
        updated.validate()?;
        *config = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::backtest::CrossValidationMode;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("foldcast-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_load_partial_toml() {
        let path = temp_path("partial.toml");
        fs::write(
            &path,
            "[pipeline]\nhorizon = 7\n\n[backtest]\nn_folds = 3\nmode = \"constant\"\n",
        )
        .unwrap();

        let manager = ConfigManager::new();
        manager.load_from_file(&path).unwrap();
        let config = manager.get();

        assert_eq!(config.pipeline.horizon, 7);
        assert_eq!(config.backtest.n_folds, 3);
        assert_eq!(config.backtest.mode, CrossValidationMode::Constant);
        assert_eq!(config.backtest.n_jobs, 1);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let path = temp_path("bad_mode.toml");
        fs::write(&path, "[backtest]\nmode = \"sliding\"\n").unwrap();

        let manager = ConfigManager::new();
        let err = manager.load_from_file(&path).unwrap_err();
        assert!(matches!(err, FoldcastError::Configuration(_)));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path("roundtrip.toml");
        let manager = ConfigManager::new();
        manager
            .update(|config| {
                config.backtest.aggregate_metrics = true;
                config.backtest.n_jobs = 4;
            })
            .unwrap();
        manager.save_to_file(&path).unwrap();

        let reloaded = ConfigManager::new();
        reloaded.load_from_file(&path).unwrap();
        assert_eq!(reloaded.get(), manager.get());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_update_is_discarded() {
        let manager = ConfigManager::new();
        assert!(manager.update(|config| config.backtest.n_folds = 0).is_err());
        assert_eq!(manager.get().backtest.n_folds, 5);
    }
}
