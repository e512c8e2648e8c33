use super::base::Transform;
use crate::analysis::relevance::split_by_segment;
use crate::analysis::{mrmr_select, DecisionTreeRegressor, HierarchicalClustering, Linkage, RelevanceMethod};
use crate::error::{FoldcastError, Result};
use crate::types::TARGET_COLUMN;
use log::warn;
use polars::prelude::*;

pub const REGRESSOR_PREFIX: &str = "regressor_";

fn regressor_columns(df: &DataFrame) -> Vec<String> {
    let mut regressors: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| name.starts_with(REGRESSOR_PREFIX))
        .map(|name| name.to_string())
        .collect();
    regressors.sort();
    regressors
}

/// Drop every regressor column not in `selected`; other columns stay.
fn keep_selected(name: &str, selected: Option<&[String]>, mut df: DataFrame) -> Result<DataFrame> {
    let selected = selected
        .ok_or_else(|| FoldcastError::Transform(format!("{} is not fitted", name)))?;
    for column in regressor_columns(&df) {
        if !selected.contains(&column) {
            df = df.drop(&column)?;
        }
    }
    Ok(df)
}

/// Keeps the `top_k` regressors a regression tree finds most important for
/// the target, fitted on all segments' rows without missing values.
#[derive(Debug, Clone)]
pub struct TreeFeatureSelectionTransform {
    model: DecisionTreeRegressor,
    top_k: usize,
    selected: Option<Vec<String>>,
}

impl TreeFeatureSelectionTransform {
    pub fn new(model: DecisionTreeRegressor, top_k: usize) -> Self {
        Self {
            model,
            top_k,
            selected: None,
        }
    }

    pub fn selected_regressors(&self) -> Option<&[String]> {
        self.selected.as_deref()
    }
}

impl Transform for TreeFeatureSelectionTransform {
    fn name(&self) -> &str {
        "TreeFeatureSelectionTransform"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        let regressors = regressor_columns(df);
        if regressors.is_empty() {
            warn!("No regressor columns to select from");
            self.selected = Some(Vec::new());
            return Ok(());
        }

        let columns = std::iter::once(TARGET_COLUMN)
            .chain(regressors.iter().map(String::as_str))
            .map(|name| -> Result<Column> { Ok(df.column(name)?.cast(&DataType::Float64)?) })
            .collect::<Result<Vec<Column>>>()?;
        let columns = columns
            .iter()
            .map(|c| c.f64().map(|ca| ca.into_iter().collect::<Vec<_>>()))
            .collect::<PolarsResult<Vec<_>>>()?;

        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..df.height() {
            let values: Option<Vec<f64>> = columns.iter().map(|c| c[i]).collect();
            if let Some(values) = values {
                targets.push(values[0]);
                rows.push(values[1..].to_vec());
            }
        }

        self.model.fit(&rows, &targets)?;
        let importances = self.model.feature_importances();
        let mut order: Vec<usize> = (0..regressors.len()).collect();
        // stable sort keeps name order among equal importances
        order.sort_by(|&a, &b| importances[b].total_cmp(&importances[a]));

        self.selected = Some(
            order
                .into_iter()
                .take(self.top_k)
                .map(|i| regressors[i].clone())
                .collect(),
        );
        Ok(())
    }

    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        keep_selected(self.name(), self.selected_regressors(), df)
    }

    fn inverse_transform(&self, df: DataFrame) -> Result<DataFrame> {
        Ok(df)
    }

    fn clone_box(&self) -> Box<dyn Transform> {
        Box::new(self.clone())
    }
}

/// Keeps `top_k` regressors chosen by mRMR over a relevance table.
///
/// Segments are clustered by their targets; each regressor's column of the
/// segment x regressor relevance table is then scored for how well it
/// separates the clusters, penalised by redundancy with regressors already
/// picked.
#[derive(Debug, Clone)]
pub struct MRMRFeatureSelectionTransform {
    relevance: RelevanceMethod,
    top_k: usize,
    clustering: HierarchicalClustering,
    selected: Option<Vec<String>>,
}

impl MRMRFeatureSelectionTransform {
    pub fn new(relevance: RelevanceMethod, top_k: usize, n_clusters: usize, linkage: Linkage) -> Result<Self> {
        if n_clusters < 2 {
            return Err(FoldcastError::Configuration(format!(
                "Number of clusters must be greater than 1, got {}",
                n_clusters
            )));
        }
        Ok(Self {
            relevance,
            top_k,
            clustering: HierarchicalClustering::new(n_clusters, linkage),
            selected: None,
        })
    }

    pub fn selected_regressors(&self) -> Option<&[String]> {
        self.selected.as_deref()
    }
}

impl Transform for MRMRFeatureSelectionTransform {
    fn name(&self) -> &str {
        "MRMRFeatureSelectionTransform"
    }

    fn fit(&mut self, df: &DataFrame) -> Result<()> {
        let regressors = regressor_columns(df);
        if regressors.len() <= self.clustering.n_clusters {
            return Err(FoldcastError::Transform(format!(
                "{} clusters need more than {} regressors",
                self.clustering.n_clusters,
                regressors.len()
            )));
        }

        let targets = split_by_segment(df, TARGET_COLUMN)?;
        let series: Vec<Vec<Option<f64>>> = targets.values().cloned().collect();
        let labels = self.clustering.cluster(&series)?;

        let table = self.relevance.table(df, &regressors)?;
        let rows: Vec<Vec<f64>> = table
            .values()
            .map(|scores| regressors.iter().map(|r| scores.get(r).copied().unwrap_or(0.0)).collect())
            .collect();

        let picked = mrmr_select(&rows, &labels, self.top_k);
        self.selected = Some(picked.into_iter().map(|i| regressors[i].clone()).collect());
        Ok(())
    }

    fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        keep_selected(self.name(), self.selected_regressors(), df)
    }

    fn inverse_transform(&self, df: DataFrame) -> Result<DataFrame> {
        Ok(df)
    }

    fn clone_box(&self) -> Box<dyn Transform> {
        Box::new(self.clone())
    }
}
