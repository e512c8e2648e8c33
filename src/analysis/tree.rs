//! CART regression tree with impurity-based feature importances

use crate::error::{FoldcastError, Result};

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Regression tree minimising squared error.
#[derive(Debug, Clone)]
pub struct DecisionTreeRegressor {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    root: Option<TreeNode>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            root: None,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Fit on row-major samples `x` with targets `y`
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<&mut Self> {
        if x.len() != y.len() {
            return Err(FoldcastError::Model(format!(
                "Tree got {} samples and {} targets",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(FoldcastError::Model("Cannot fit a tree on no samples".to_string()));
        }
        let n_features = x[0].len();
        if x.iter().any(|row| row.len() != n_features) {
            return Err(FoldcastError::Model("Tree samples differ in length".to_string()));
        }

        self.n_features = n_features;
        let mut importances = vec![0.0; n_features];
        let indices: Vec<usize> = (0..x.len()).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for importance in &mut importances {
                *importance /= total;
            }
        }
        self.feature_importances = importances;
        Ok(self)
    }

    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        let mut node = self
            .root
            .as_ref()
            .ok_or_else(|| FoldcastError::Model("Tree is not fitted".to_string()))?;
        if row.len() != self.n_features {
            return Err(FoldcastError::Model(format!(
                "Tree expects {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        loop {
            match node {
                TreeNode::Leaf { value } => return Ok(*value),
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    /// Normalised total squared-error reduction per feature; all zeros when
    /// the tree never split.
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    fn build_tree(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let (sum, sum_sq) = indices
            .iter()
            .fold((0.0, 0.0), |(s, s2), &i| (s + y[i], s2 + y[i] * y[i]));
        let value = sum / n_samples as f64;
        let sse = sum_sq - sum * sum / n_samples as f64;

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || sse <= f64::EPSILON;
        if should_stop {
            return TreeNode::Leaf { value };
        }

        match self.find_best_split(x, y, indices, sse) {
            Some(split) => {
                importances[split.feature_idx] += split.gain;
                TreeNode::Split {
                    feature_idx: split.feature_idx,
                    threshold: split.threshold,
                    left: Box::new(self.build_tree(x, y, &split.left, depth + 1, importances)),
                    right: Box::new(self.build_tree(x, y, &split.right, depth + 1, importances)),
                }
            }
            None => TreeNode::Leaf { value },
        }
    }

    fn find_best_split(&self, x: &[Vec<f64>], y: &[f64], indices: &[usize], parent_sse: f64) -> Option<BestSplit> {
        let n = indices.len();
        let mut best: Option<(usize, f64, f64)> = None;

        for feature_idx in 0..self.n_features {
            let mut sorted = indices.to_vec();
            sorted.sort_by(|&a, &b| x[a][feature_idx].total_cmp(&x[b][feature_idx]));

            let total: f64 = sorted.iter().map(|&i| y[i]).sum();
            let total_sq: f64 = sorted.iter().map(|&i| y[i] * y[i]).sum();
            let (mut left_sum, mut left_sq) = (0.0, 0.0);

            for k in 1..n {
                let prev = sorted[k - 1];
                left_sum += y[prev];
                left_sq += y[prev] * y[prev];

                let (lo, hi) = (x[prev][feature_idx], x[sorted[k]][feature_idx]);
                if lo == hi || k < self.min_samples_leaf || n - k < self.min_samples_leaf {
                    continue;
                }

                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = left_sq - left_sum * left_sum / k as f64;
                let right_sse = right_sq - right_sum * right_sum / (n - k) as f64;
                let gain = parent_sse - left_sse - right_sse;

                if gain > 0.0 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature_idx, (lo + hi) / 2.0, gain));
                }
            }
        }

        best.map(|(feature_idx, threshold, gain)| {
            let (left, right) = indices
                .iter()
                .copied()
                .partition(|&i| x[i][feature_idx] <= threshold);
            BestSplit {
                feature_idx,
                threshold,
                gain,
                left,
                right,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_importance_goes_to_informative_feature() {
        // y depends on feature 0 only
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 4) as f64, (i * 7 % 11) as f64]).collect();
        let y: Vec<f64> = x.iter().map(|row| row[0] * 10.0).collect();

        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&x, &y).unwrap();

        let importances = tree.feature_importances();
        assert!((importances[0] - 1.0).abs() < 1e-12);
        assert_eq!(importances[1], 0.0);
        assert_eq!(tree.predict(&[3.0, 0.0]).unwrap(), 30.0);
    }

    #[test]
    fn test_depth_limit() {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..8).map(|i| i as f64).collect();

        let mut stump = DecisionTreeRegressor::new().with_max_depth(1);
        stump.fit(&x, &y).unwrap();
        assert_eq!(stump.predict(&[0.0]).unwrap(), 1.5);
        assert_eq!(stump.predict(&[7.0]).unwrap(), 5.5);
    }

    #[test]
    fn test_predict_before_fit() {
        assert!(DecisionTreeRegressor::new().predict(&[1.0]).is_err());
    }
}
