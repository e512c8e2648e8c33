use super::dataset::build_long_frame;
use crate::error::{FoldcastError, Result};
use crate::types::{SegmentValues, TARGET_COLUMN};
use chrono::{NaiveDateTime, TimeDelta};
use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

fn make_index(periods: usize, start: NaiveDateTime, freq: TimeDelta) -> Result<Vec<NaiveDateTime>> {
    (0..periods)
        .map(|step| {
            i32::try_from(step)
                .ok()
                .and_then(|step| freq.checked_mul(step))
                .and_then(|offset| start.checked_add_signed(offset))
                .ok_or_else(|| FoldcastError::Dataset(format!("Timestamp overflow at step {}", step)))
        })
        .collect()
}

fn segment_names(n_segments: usize) -> Vec<String> {
    (0..n_segments).map(|i| format!("segment_{}", i)).collect()
}

fn to_frame(
    periods: usize,
    start: NaiveDateTime,
    freq: TimeDelta,
    segments: &[String],
    targets: &SegmentValues,
) -> Result<DataFrame> {
    let index = make_index(periods, start, freq)?;
    build_long_frame(&index, segments, &[(TARGET_COLUMN, targets)])
}

/// Autoregressive series `x_t = sum(ar_coef[j] * x_{t-1-j}) + noise_t`,
/// noise drawn from `N(0, sigma^2)`.
pub fn generate_ar_df(
    periods: usize,
    start: NaiveDateTime,
    freq: TimeDelta,
    ar_coef: &[f64],
    sigma: f64,
    n_segments: usize,
    random_seed: u64,
) -> Result<DataFrame> {
    let noise = Normal::new(0.0, sigma)
        .map_err(|e| FoldcastError::Configuration(format!("Invalid noise sigma {}: {}", sigma, e)))?;
    let mut rng = StdRng::seed_from_u64(random_seed);
    let segments = segment_names(n_segments);

    let mut targets = SegmentValues::new();
    for segment in &segments {
        let mut values: Vec<f64> = Vec::with_capacity(periods);
        for t in 0..periods {
            let ar: f64 = ar_coef
                .iter()
                .enumerate()
                .filter(|(lag, _)| t > *lag)
                .map(|(lag, coef)| coef * values[t - 1 - lag])
                .sum();
            values.push(ar + rng.sample(noise));
        }
        targets.insert(segment.clone(), values.into_iter().map(Some).collect());
    }

    to_frame(periods, start, freq, &segments, &targets)
}

/// Every segment holds `scale` at every timestamp.
pub fn generate_const_df(
    periods: usize,
    start: NaiveDateTime,
    freq: TimeDelta,
    n_segments: usize,
    scale: f64,
) -> Result<DataFrame> {
    let segments = segment_names(n_segments);
    let targets: SegmentValues = segments
        .iter()
        .map(|segment| (segment.clone(), vec![Some(scale); periods]))
        .collect();
    to_frame(periods, start, freq, &segments, &targets)
}

/// Each segment repeats a random integer pattern of length `period` drawn
/// from `0..scale`.
pub fn generate_periodic_df(
    periods: usize,
    start: NaiveDateTime,
    freq: TimeDelta,
    period: usize,
    n_segments: usize,
    scale: u32,
    random_seed: u64,
) -> Result<DataFrame> {
    if period == 0 || scale == 0 {
        return Err(FoldcastError::Configuration(
            "Period and scale must be positive".to_string(),
        ));
    }
    let mut rng = StdRng::seed_from_u64(random_seed);
    let segments = segment_names(n_segments);

    let mut targets = SegmentValues::new();
    for segment in &segments {
        let pattern: Vec<f64> = (0..period).map(|_| rng.gen_range(0..scale) as f64).collect();
        let values = (0..periods).map(|t| Some(pattern[t % period])).collect();
        targets.insert(segment.clone(), values);
    }

    to_frame(periods, start, freq, &segments, &targets)
}
