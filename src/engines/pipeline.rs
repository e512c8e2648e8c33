use super::backtest::{BacktestOrchestrator, BacktestResult};
use crate::config::{BacktestConfig, PipelineConfig};
use crate::data::TSDataset;
use crate::error::{FoldcastError, Result};
use crate::metrics::Metric;
use crate::models::Model;
use crate::tracking::ExperimentTracker;
use crate::transforms::Transform;
use log::debug;

/// Transforms + model + horizon, fitted as one unit.
///
/// Cloning a pipeline deep-copies the model and every transform, so a clone
/// can be fitted without touching the original.
#[derive(Debug, Clone)]
pub struct Pipeline {
    model: Box<dyn Model>,
    transforms: Vec<Box<dyn Transform>>,
    horizon: usize,
    ts: Option<TSDataset>,
}

impl Pipeline {
    pub fn new(model: Box<dyn Model>, transforms: Vec<Box<dyn Transform>>, horizon: usize) -> Result<Self> {
        if horizon < 1 {
            return Err(FoldcastError::Configuration(format!(
                "Horizon must be a positive number, {} given",
                horizon
            )));
        }
        Ok(Self {
            model,
            transforms,
            horizon,
            ts: None,
        })
    }

    pub fn from_config(
        model: Box<dyn Model>,
        transforms: Vec<Box<dyn Transform>>,
        config: &PipelineConfig,
    ) -> Result<Self> {
        Self::new(model, transforms, config.horizon)
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    pub fn transforms(&self) -> &[Box<dyn Transform>] {
        &self.transforms
    }

    pub fn is_fitted(&self) -> bool {
        self.ts.is_some()
    }

    /// Fit the transforms on `ts`, then the model on the transformed data.
    /// The pipeline's own transform list stays unfitted; the fitted chain
    /// lives on the stored dataset.
    pub fn fit(&mut self, ts: TSDataset) -> Result<&mut Self> {
        let mut ts = ts;
        ts.fit_transform(self.transforms.clone())?;
        self.model.fit(&ts)?;
        debug!(
            "Fitted {} on {} timestamps x {} segments",
            self.model.name(),
            ts.len(),
            ts.segments().len()
        );
        self.ts = Some(ts);
        Ok(self)
    }

    /// Forecast `horizon` steps past the fitted data, in the original scale
    pub fn forecast(&self) -> Result<TSDataset> {
        let ts = self.ts.as_ref().ok_or_else(|| {
            FoldcastError::Model("Pipeline is not fitted! Fit the Pipeline before calling forecast method.".to_string())
        })?;

        let future = ts.make_future(self.horizon)?;
        let mut predictions = self.model.forecast(future)?;
        if predictions.len() != self.horizon {
            return Err(FoldcastError::Model(format!(
                "{} returned {} timestamps, expected {}",
                self.model.name(),
                predictions.len(),
                self.horizon
            )));
        }
        predictions.inverse_transform()?;
        Ok(predictions)
    }

    /// Cross-validate this pipeline on `ts`. `self` is used as a template
    /// and is never fitted.
    pub fn backtest(
        &self,
        ts: &TSDataset,
        metrics: &[Box<dyn Metric>],
        config: &BacktestConfig,
        tracker: &ExperimentTracker,
    ) -> Result<BacktestResult> {
        BacktestOrchestrator::new(self, tracker).run(ts, metrics, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_const_df;
    use crate::models::NaiveModel;
    use crate::transforms::AddConstTransform;
    use crate::types::TARGET_COLUMN;
    use chrono::{NaiveDate, TimeDelta};

    fn dataset() -> TSDataset {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let df = generate_const_df(30, start, TimeDelta::days(1), 2, 4.0).unwrap();
        TSDataset::new(df, TimeDelta::days(1)).unwrap()
    }

    #[test]
    fn test_zero_horizon_rejected() {
        let err = Pipeline::new(Box::new(NaiveModel::new(1).unwrap()), vec![], 0).unwrap_err();
        assert!(matches!(err, FoldcastError::Configuration(_)));
    }

    #[test]
    fn test_forecast_before_fit() {
        let pipeline = Pipeline::new(Box::new(NaiveModel::new(1).unwrap()), vec![], 5).unwrap();
        assert!(matches!(pipeline.forecast().unwrap_err(), FoldcastError::Model(_)));
    }

    #[test]
    fn test_forecast_returns_original_scale() {
        let transforms: Vec<Box<dyn Transform>> =
            vec![Box::new(AddConstTransform::new(100.0, TARGET_COLUMN, true))];
        let mut pipeline = Pipeline::new(Box::new(NaiveModel::new(1).unwrap()), transforms, 7).unwrap();
        pipeline.fit(dataset()).unwrap();

        let forecast = pipeline.forecast().unwrap();
        assert_eq!(forecast.len(), 7);
        assert_eq!(
            forecast.segment_values("segment_1", TARGET_COLUMN).unwrap(),
            vec![Some(4.0); 7]
        );
    }

    #[test]
    fn test_clone_is_independent() {
        let template = Pipeline::new(Box::new(NaiveModel::new(1).unwrap()), vec![], 3).unwrap();
        let mut fitted = template.clone();
        fitted.fit(dataset()).unwrap();

        assert!(fitted.is_fitted());
        assert!(!template.is_fitted());
    }
}
