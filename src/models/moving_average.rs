use super::base::{tail_history, Model};
use crate::data::TSDataset;
use crate::error::{FoldcastError, Result};
use crate::types::{SegmentValues, TARGET_COLUMN};
use std::collections::BTreeMap;

/// Recursive moving average: each step forecasts the mean of the previous
/// `window` values, feeding forecasts back into the window.
#[derive(Debug, Clone)]
pub struct MovingAverageModel {
    window: usize,
    history: BTreeMap<String, Vec<f64>>,
}

impl MovingAverageModel {
    pub fn new(window: usize) -> Result<Self> {
        if window == 0 {
            return Err(FoldcastError::Configuration(
                "MovingAverageModel window must be positive".to_string(),
            ));
        }
        Ok(Self {
            window,
            history: BTreeMap::new(),
        })
    }
}

impl Model for MovingAverageModel {
    fn name(&self) -> &str {
        "MovingAverageModel"
    }

    fn fit(&mut self, ts: &TSDataset) -> Result<()> {
        self.history = ts
            .segments()
            .iter()
            .map(|segment| Ok((segment.clone(), tail_history(ts, segment, self.window)?)))
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn forecast(&self, mut future: TSDataset) -> Result<TSDataset> {
        let mut values = SegmentValues::new();
        for segment in future.segments() {
            let mut window = self.history.get(segment).cloned().ok_or_else(|| {
                FoldcastError::Model(format!(
                    "MovingAverageModel was not fitted on segment {}",
                    segment
                ))
            })?;

            let mut forecast = Vec::with_capacity(future.len());
            for _ in 0..future.len() {
                let next = window.iter().sum::<f64>() / self.window as f64;
                window.remove(0);
                window.push(next);
                forecast.push(Some(next));
            }
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
    use chrono::TimeDelta;
    use polars::df;

    #[test]
    fn test_recursive_average() {
        let day = 86_400_000i64;
        let df = df! {
            "timestamp" => &[0, day, 2 * day, 3 * day],
            "segment" => &["a", "a", "a", "a"],
            "target" => &[1.0, 2.0, 4.0, 6.0],
        }
        .unwrap();
        let ts = TSDataset::new(df, TimeDelta::days(1)).unwrap();

        let mut model = MovingAverageModel::new(2).unwrap();
        model.fit(&ts).unwrap();
        let forecast = model.forecast(ts.make_future(2).unwrap()).unwrap();

        // mean(4, 6) = 5, then mean(6, 5) = 5.5
        assert_eq!(
            forecast.segment_values("a", TARGET_COLUMN).unwrap(),
            vec![Some(5.0), Some(5.5)]
        );
    }
}
