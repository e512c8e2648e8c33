use crate::error::{FoldcastError, Result};

/// Binary segmentation under an L2 (piecewise constant mean) cost.
///
/// Repeatedly splits the regime whose best split lowers the total cost the
/// most, until `n_bkps` breakpoints are placed or no split helps.
#[derive(Debug, Clone)]
pub struct BinarySegmentation {
    pub n_bkps: usize,
    pub min_size: usize,
}

impl BinarySegmentation {
    pub fn new(n_bkps: usize) -> Self {
        Self { n_bkps, min_size: 2 }
    }

    pub fn with_min_size(mut self, min_size: usize) -> Result<Self> {
        if min_size == 0 {
            return Err(FoldcastError::Configuration(
                "Change point min_size must be positive".to_string(),
            ));
        }
        self.min_size = min_size;
        Ok(self)
    }

    /// Exclusive regime ends in increasing order; the last one is always
    /// `signal.len()`.
    pub fn predict(&self, signal: &[f64]) -> Vec<usize> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }

        let mut sum = vec![0.0; n + 1];
        let mut sum_sq = vec![0.0; n + 1];
        for (i, v) in signal.iter().enumerate() {
            sum[i + 1] = sum[i] + v;
            sum_sq[i + 1] = sum_sq[i] + v * v;
        }
        let cost = |start: usize, end: usize| {
            let len = (end - start) as f64;
            let s = sum[end] - sum[start];
            sum_sq[end] - sum_sq[start] - s * s / len
        };

        let mut ends = vec![n];
        for _ in 0..self.n_bkps {
            let mut best: Option<(usize, f64)> = None;
            let mut start = 0;
            for &end in &ends {
                if end - start >= 2 * self.min_size {
                    let whole = cost(start, end);
                    for split in (start + self.min_size)..=(end - self.min_size) {
                        let gain = whole - cost(start, split) - cost(split, end);
                        if gain > 1e-12 && best.map_or(true, |(_, g)| gain > g) {
                            best = Some((split, gain));
                        }
                    }
                }
                start = end;
            }

            match best {
                Some((split, _)) => {
                    ends.push(split);
                    ends.sort_unstable();
                }
                None => break,
            }
        }
        ends
    }
}
