use super::base::{tail_history, Model};
use crate::data::TSDataset;
use crate::error::{FoldcastError, Result};
use crate::types::{SegmentValues, TARGET_COLUMN};
use std::collections::BTreeMap;

/// Seasonal naive model: repeats the last `lag` observations of each segment.
#[derive(Debug, Clone)]
pub struct NaiveModel {
    lag: usize,
    history: BTreeMap<String, Vec<f64>>,
}

impl NaiveModel {
    pub fn new(lag: usize) -> Result<Self> {
        if lag == 0 {
            return Err(FoldcastError::Configuration(
                "NaiveModel lag must be positive".to_string(),
            ));
        }
        Ok(Self {
            lag,
            history: BTreeMap::new(),
        })
    }
}

impl Model for NaiveModel {
    fn name(&self) -> &str {
        "NaiveModel"
    }

    fn fit(&mut self, ts: &TSDataset) -> Result<()> {
        self.history = ts
            .segments()
            .iter()
            .map(|segment| Ok((segment.clone(), tail_history(ts, segment, self.lag)?)))
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn forecast(&self, mut future: TSDataset) -> Result<TSDataset> {
        let mut values = SegmentValues::new();
        for segment in future.segments() {
            let last = self.history.get(segment).ok_or_else(|| {
                FoldcastError::Model(format!("NaiveModel was not fitted on segment {}", segment))
            })?;
            let forecast = (0..future.len()).map(|i| Some(last[i % self.lag])).collect();
            values.insert(segment.clone(), forecast);
        }
        future.with_feature(TARGET_COLUMN, &values)?;
        Ok(future)
    }

    fn clone_box(&self) -> Box<dyn Model> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::generate_periodic_df;
    use chrono::{NaiveDate, TimeDelta};

    #[test]
    fn test_seasonal_naive_repeats_pattern() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let df = generate_periodic_df(21, start, TimeDelta::days(1), 7, 2, 10, 3).unwrap();
        let ts = TSDataset::new(df, TimeDelta::days(1)).unwrap();

        let mut model = NaiveModel::new(7).unwrap();
        model.fit(&ts).unwrap();
        let forecast = model.forecast(ts.make_future(7).unwrap()).unwrap();

        for segment in ts.segments() {
            let history = ts.segment_values(segment, TARGET_COLUMN).unwrap();
            let predicted = forecast.segment_values(segment, TARGET_COLUMN).unwrap();
            assert_eq!(predicted, history[14..21].to_vec());
        }
    }

    #[test]
    fn test_forecast_before_fit_fails() {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let df = generate_periodic_df(10, start, TimeDelta::days(1), 2, 1, 10, 3).unwrap();
        let ts = TSDataset::new(df, TimeDelta::days(1)).unwrap();

        let model = NaiveModel::new(1).unwrap();
        assert!(model.forecast(ts.make_future(2).unwrap()).is_err());
    }
}
