use crate::data::TSDataset;
use crate::error::{FoldcastError, Result};
use crate::types::TARGET_COLUMN;
use chrono::NaiveDateTime;
use log::{debug, warn};
use std::collections::BTreeMap;

// subsequences flatter than this are not rescaled
const ZNORM_THRESHOLD: f64 = 0.01;

/// Equiprobable N(0, 1) breakpoints for alphabets of 2 to 10 letters.
fn breakpoints(alphabet_size: usize) -> Option<&'static [f64]> {
    let cuts: &'static [f64] = match alphabet_size {
        2 => &[0.0],
        3 => &[-0.43, 0.43],
        4 => &[-0.67, 0.0, 0.67],
        5 => &[-0.84, -0.25, 0.25, 0.84],
        6 => &[-0.97, -0.43, 0.0, 0.43, 0.97],
        7 => &[-1.07, -0.57, -0.18, 0.18, 0.57, 1.07],
        8 => &[-1.15, -0.67, -0.32, 0.0, 0.32, 0.67, 1.15],
        9 => &[-1.22, -0.76, -0.43, -0.14, 0.14, 0.43, 0.76, 1.22],
        10 => &[-1.28, -0.84, -0.52, -0.25, 0.0, 0.25, 0.52, 0.84, 1.28],
        _ => return None,
    };
    Some(cuts)
}

fn znorm(window: &[f64]) -> Vec<f64> {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let std = (window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
    if std < ZNORM_THRESHOLD {
        return window.to_vec();
    }
    window.iter().map(|v| (v - mean) / std).collect()
}

/// Piecewise aggregate approximation; handles lengths not divisible by `size`.
fn paa(values: &[f64], size: usize) -> Vec<f64> {
    let n = values.len();
    let mut frames = vec![0.0; size];
    for k in 0..n * size {
        frames[k / n] += values[k / size];
    }
    frames.iter().map(|sum| sum / n as f64).collect()
}

fn sax_word(values: &[f64], word_length: usize, cuts: &[f64]) -> Vec<u8> {
    paa(values, word_length)
        .into_iter()
        .map(|v| cuts.iter().filter(|&&c| c <= v).count() as u8)
        .collect()
}

/// Euclidean distance, or `None` once it reaches `limit`.
fn distance_below(a: &[f64], b: &[f64], limit: f64) -> Option<f64> {
    let limit_sq = limit * limit;
    let mut sum = 0.0;
    for (x, y) in a.iter().zip(b) {
        sum += (x - y).powi(2);
        if sum >= limit_sq {
            return None;
        }
    }
    Some(sum.sqrt())
}

/// Start positions of the `num_discords` most unusual subsequences of
/// length `window` (HOT SAX).
///
/// A discord is the subsequence whose nearest non-overlapping neighbour,
/// after z-normalisation, is furthest away. Later discords may not overlap
/// earlier ones. Fewer are returned when the series runs out of candidates.
pub fn find_discords(
    series: &[f64],
    window: usize,
    num_discords: usize,
    alphabet_size: usize,
    word_length: usize,
) -> Result<Vec<usize>> {
    let cuts = breakpoints(alphabet_size).ok_or_else(|| {
        FoldcastError::Configuration(format!(
            "Alphabet size must be between 2 and 10, got {}",
            alphabet_size
        ))
    })?;
    if window == 0 || word_length == 0 || word_length > window {
        return Err(FoldcastError::Configuration(format!(
            "Word length {} must be between 1 and the anomaly length {}",
            word_length, window
        )));
    }
    if series.len() < window {
        return Ok(Vec::new());
    }

    let n_windows = series.len() - window + 1;
    let subsequences: Vec<Vec<f64>> = series.windows(window).map(znorm).collect();
    let words: Vec<Vec<u8>> = subsequences
        .iter()
        .map(|s| sax_word(s, word_length, cuts))
        .collect();

    let mut buckets: BTreeMap<&[u8], Vec<usize>> = BTreeMap::new();
    for (i, word) in words.iter().enumerate() {
        buckets.entry(word.as_slice()).or_default().push(i);
    }

    // rare words first: their subsequences are the likeliest discords
    let mut outer: Vec<usize> = (0..n_windows).collect();
    outer.sort_by_key(|&i| (buckets[words[i].as_slice()].len(), i));

    let mut excluded = vec![false; n_windows];
    let mut discords = Vec::new();
    for _ in 0..num_discords {
        let mut best: Option<(usize, f64)> = None;

        for &i in &outer {
            if excluded[i] {
                continue;
            }
            let best_distance = best.map_or(0.0, |(_, d)| d);
            let same_word = &buckets[words[i].as_slice()];
            let others = (0..n_windows).filter(|&j| words[j] != words[i]);

            let mut nearest = f64::INFINITY;
            let mut abandoned = false;
            for j in same_word.iter().copied().chain(others) {
                if i.abs_diff(j) < window {
                    continue;
                }
                if let Some(d) = distance_below(&subsequences[i], &subsequences[j], nearest) {
                    nearest = d;
                    if nearest < best_distance {
                        abandoned = true;
                        break;
                    }
                }
            }

            if !abandoned && nearest.is_finite() && best.map_or(true, |(_, d)| nearest > d) {
                best = Some((i, nearest));
            }
        }

        let Some((start, distance)) = best else { break };
        debug!("Discord at {} with nearest neighbour distance {:.4}", start, distance);
        discords.push(start);
        let from = start.saturating_sub(window - 1);
        let to = (start + window).min(n_windows);
        excluded[from..to].iter_mut().for_each(|e| *e = true);
    }
    Ok(discords)
}

/// Sequence outliers per segment as inclusive `(start, end)` timestamps of
/// subsequences of `anomaly_length` points.
///
/// Missing target values are dropped first, so a subsequence may span a
/// gap in the index.
pub fn get_sequence_anomalies(
    ts: &TSDataset,
    num_anomalies: usize,
    anomaly_length: usize,
    alphabet_size: usize,
    word_length: usize,
) -> Result<BTreeMap<String, Vec<(NaiveDateTime, NaiveDateTime)>>> {
    let mut outliers = BTreeMap::new();
    for segment in ts.segments() {
        let (timestamps, values): (Vec<NaiveDateTime>, Vec<f64>) = ts
            .index()
            .iter()
            .zip(ts.segment_values(segment, TARGET_COLUMN)?)
            .filter_map(|(t, v)| v.map(|v| (*t, v)))
            .unzip();

        let missing = ts.len() - values.len();
        if missing > 0 {
            warn!(
                "Segment {} has {} missing target values, removing them before the search",
                segment, missing
            );
        }

        let starts = find_discords(&values, anomaly_length, num_anomalies, alphabet_size, word_length)?;
        outliers.insert(
            segment.clone(),
            starts
                .into_iter()
                .map(|s| (timestamps[s], timestamps[s + anomaly_length - 1]))
                .collect(),
        );
    }
    Ok(outliers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use polars::df;

    fn sine_with_bump(n: usize, bump: std::ops::Range<usize>) -> Vec<f64> {
        (0..n)
            .map(|i| {
                if bump.contains(&i) {
                    3.0
                } else {
                    (i as f64 * std::f64::consts::TAU / 20.0).sin()
                }
            })
            .collect()
    }

    #[test]
    fn test_discord_covers_bump() {
        let series = sine_with_bump(200, 120..130);
        let discords = find_discords(&series, 20, 1, 3, 4).unwrap();

        assert_eq!(discords.len(), 1);
        let start = discords[0];
        assert!(start + 20 > 120 && start < 130, "discord at {}", start);
    }

    #[test]
    fn test_discords_do_not_overlap() {
        let series = sine_with_bump(200, 120..130);
        let discords = find_discords(&series, 20, 2, 4, 5).unwrap();

        assert_eq!(discords.len(), 2);
        assert!(discords[0].abs_diff(discords[1]) >= 20);
    }

    #[test]
    fn test_parameter_checks() {
        let series = sine_with_bump(50, 0..0);
        assert!(find_discords(&series, 10, 1, 11, 3).is_err());
        assert!(find_discords(&series, 10, 1, 3, 11).is_err());
        assert!(find_discords(&series, 0, 1, 3, 1).is_err());
        assert!(find_discords(&series[..5], 10, 1, 3, 3).unwrap().is_empty());
    }

    #[test]
    fn test_segment_timestamps() {
        let day = 86_400_000i64;
        let mut target: Vec<Option<f64>> = sine_with_bump(120, 60..66).into_iter().map(Some).collect();
        target[5] = None;

        let df = df! {
            "timestamp" => (0..120).map(|i| i * day).collect::<Vec<_>>(),
            "segment" => vec!["a"; 120],
            "target" => target,
        }
        .unwrap();
        let ts = TSDataset::new(df, TimeDelta::days(1)).unwrap();

        let anomalies = get_sequence_anomalies(&ts, 1, 20, 3, 4).unwrap();
        let (start, end) = anomalies["a"][0];
        assert_eq!(end - start, TimeDelta::days(19));
        assert!(start <= ts.index()[65] && end >= ts.index()[60]);
    }
}
