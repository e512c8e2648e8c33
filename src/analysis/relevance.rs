use super::tree::DecisionTreeRegressor;
use crate::error::Result;
use crate::types::{SEGMENT_COLUMN, TARGET_COLUMN};
use polars::prelude::*;
use std::collections::BTreeMap;

/// segment -> regressor -> relevance of the regressor for the segment target
pub type RelevanceTable = BTreeMap<String, BTreeMap<String, f64>>;

/// How a regressor's relevance to the target is scored inside one segment.
#[derive(Debug, Clone, PartialEq)]
pub enum RelevanceMethod {
    /// Absolute Pearson correlation over rows where both are present
    Correlation,
    /// Importances of a regression tree fitted on rows with no missing values
    Tree { max_depth: Option<usize> },
}

impl RelevanceMethod {
    pub fn table(&self, df: &DataFrame, regressors: &[String]) -> Result<RelevanceTable> {
        let target = split_by_segment(df, TARGET_COLUMN)?;
        let columns = regressors
            .iter()
            .map(|name| split_by_segment(df, name))
            .collect::<Result<Vec<_>>>()?;

        let mut table = RelevanceTable::new();
        for (segment, y) in &target {
            let features: Vec<&Vec<Option<f64>>> = columns
                .iter()
                .filter_map(|column| column.get(segment))
                .collect();
            let scores: Vec<f64> = match self {
                RelevanceMethod::Correlation => features
                    .iter()
                    .map(|x| {
                        let (xs, ys): (Vec<f64>, Vec<f64>) = x
                            .iter()
                            .zip(y)
                            .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
                            .unzip();
                        pearson(&xs, &ys).abs()
                    })
                    .collect(),
                RelevanceMethod::Tree { max_depth } => tree_relevance(&features, y, *max_depth)?,
            };
            table.insert(
                segment.clone(),
                regressors.iter().cloned().zip(scores).collect(),
            );
        }
        Ok(table)
    }
}

fn tree_relevance(features: &[&Vec<Option<f64>>], y: &[Option<f64>], max_depth: Option<usize>) -> Result<Vec<f64>> {
    let mut rows = Vec::new();
    let mut targets = Vec::new();
    for (i, target) in y.iter().enumerate() {
        let row: Option<Vec<f64>> = features.iter().map(|column| column[i]).collect();
        if let (Some(row), Some(target)) = (row, target) {
            rows.push(row);
            targets.push(*target);
        }
    }
    if rows.len() < 2 {
        return Ok(vec![0.0; features.len()]);
    }

    let mut tree = DecisionTreeRegressor::new();
    tree.max_depth = max_depth;
    tree.fit(&rows, &targets)?;
    Ok(tree.feature_importances().to_vec())
}

/// Values of `column` grouped by segment in frame order.
pub(crate) fn split_by_segment(df: &DataFrame, column: &str) -> Result<BTreeMap<String, Vec<Option<f64>>>> {
    let segments = df.column(SEGMENT_COLUMN)?.str()?;
    let values = df.column(column)?.cast(&DataType::Float64)?;

    let mut grouped: BTreeMap<String, Vec<Option<f64>>> = BTreeMap::new();
    for (segment, value) in segments.into_iter().zip(values.f64()?.into_iter()) {
        if let Some(segment) = segment {
            grouped.entry(segment.to_string()).or_default().push(value);
        }
    }
    Ok(grouped)
}

/// Zero when either side is constant or there are fewer than two points.
pub(crate) fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return 0.0;
    }
    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return 0.0;
    }
    cov / (var_x * var_y).sqrt()
}

/// One-way ANOVA F statistic of `values` grouped by `labels`.
fn f_statistic(values: &[f64], labels: &[usize]) -> f64 {
    let mut groups: BTreeMap<usize, Vec<f64>> = BTreeMap::new();
    for (value, label) in values.iter().zip(labels) {
        groups.entry(*label).or_default().push(*value);
    }
    let n = values.len() as f64;
    let k = groups.len() as f64;
    if k < 2.0 || n <= k {
        return 0.0;
    }

    let grand = values.iter().sum::<f64>() / n;
    let (mut between, mut within) = (0.0, 0.0);
    for group in groups.values() {
        let mean = group.iter().sum::<f64>() / group.len() as f64;
        between += group.len() as f64 * (mean - grand).powi(2);
        within += group.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    }
    if within <= 0.0 {
        return if between > 0.0 { f64::INFINITY } else { 0.0 };
    }
    (between / (k - 1.0)) / (within / (n - k))
}

/// Greedy minimum-redundancy maximum-relevance selection of up to `k`
/// columns of `table` (rows x columns) for class `labels`.
///
/// Relevance is the ANOVA F statistic; redundancy is the mean absolute
/// correlation with the columns already picked.
pub fn mrmr_select(table: &[Vec<f64>], labels: &[usize], k: usize) -> Vec<usize> {
    let n_columns = table.first().map_or(0, Vec::len);
    let columns: Vec<Vec<f64>> = (0..n_columns)
        .map(|j| table.iter().map(|row| row[j]).collect())
        .collect();
    let relevance: Vec<f64> = columns.iter().map(|c| f_statistic(c, labels)).collect();

    let mut selected: Vec<usize> = Vec::new();
    let mut redundancy_sum = vec![0.0; n_columns];
    while selected.len() < k.min(n_columns) {
        let best = (0..n_columns)
            .filter(|j| !selected.contains(j))
            .map(|j| {
                let score = if selected.is_empty() {
                    relevance[j]
                } else {
                    relevance[j] / (redundancy_sum[j] / selected.len() as f64).max(0.001)
                };
                (j, score)
            })
            .fold(None, |best: Option<(usize, f64)>, (j, score)| match best {
                Some((_, s)) if s >= score => best,
                _ => Some((j, score)),
            });
        let Some((pick, _)) = best else { break };

        selected.push(pick);
        for j in 0..n_columns {
            redundancy_sum[j] += pearson(&columns[j], &columns[pick]).abs();
        }
    }
    selected
}
