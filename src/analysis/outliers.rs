use crate::data::TSDataset;
use crate::error::{FoldcastError, Result};
use crate::metrics::functions::median_sorted;
use crate::types::TARGET_COLUMN;
use chrono::NaiveDateTime;
use log::warn;
use std::collections::BTreeMap;

/// Point outliers per segment.
///
/// Each segment's target is cut into consecutive windows of `window_size`
/// points (the last one may be shorter). A point is an outlier when it lies
/// further than `alpha` population standard deviations from its window's
/// median. Missing values are skipped.
pub fn get_anomalies_median(
    ts: &TSDataset,
    window_size: usize,
    alpha: f64,
) -> Result<BTreeMap<String, Vec<NaiveDateTime>>> {
    if window_size == 0 {
        return Err(FoldcastError::Configuration(
            "Window size must be positive".to_string(),
        ));
    }

    let mut outliers = BTreeMap::new();
    for segment in ts.segments() {
        let values = ts.segment_values(segment, TARGET_COLUMN)?;
        let missing = values.len() - ts.target_length(segment)?;
        if missing > 0 {
            warn!("Segment {} has {} missing target values, skipping them", segment, missing);
        }

        let mut anomalies = Vec::new();
        for (w, window) in values.chunks(window_size).enumerate() {
            let present: Vec<(usize, f64)> = window
                .iter()
                .enumerate()
                .filter_map(|(i, v)| v.map(|v| (w * window_size + i, v)))
                .collect();
            if present.is_empty() {
                continue;
            }

            let mut sorted: Vec<f64> = present.iter().map(|(_, v)| *v).collect();
            sorted.sort_by(|a, b| a.total_cmp(b));
            let median = median_sorted(&sorted);
            let mean = sorted.iter().sum::<f64>() / sorted.len() as f64;
            let std = (sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / sorted.len() as f64).sqrt();

            anomalies.extend(
                present
                    .iter()
                    .filter(|(_, v)| (v - median).abs() > alpha * std)
                    .map(|(pos, _)| ts.index()[*pos]),
            );
        }
        outliers.insert(segment.clone(), anomalies);
    }
    Ok(outliers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use polars::df;

    #[test]
    fn test_spike_is_detected() {
        let day = 86_400_000i64;
        let mut target = vec![Some(1.0); 10];
        target[6] = Some(50.0);
        target[2] = None;

        let df = df! {
            "timestamp" => (0..10).map(|i| i * day).collect::<Vec<_>>(),
            "segment" => vec!["a"; 10],
            "target" => target,
        }
        .unwrap();
        let ts = TSDataset::new(df, TimeDelta::days(1)).unwrap();

        let outliers = get_anomalies_median(&ts, 5, 1.5).unwrap();
        assert_eq!(outliers["a"], vec![ts.index()[6]]);
    }

    #[test]
    fn test_zero_window_rejected() {
        let df = df! {
            "timestamp" => &[0i64],
            "segment" => &["a"],
            "target" => &[1.0],
        }
        .unwrap();
        let ts = TSDataset::new(df, TimeDelta::days(1)).unwrap();
        assert!(get_anomalies_median(&ts, 0, 3.0).is_err());
    }
}
