use super::executor::FoldRecord;
use crate::error::Result;
use crate::types::{to_millis, MetricsTable, FOLD_COLUMN, SEGMENT_COLUMN};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

fn datetime_column(name: &str, millis: Vec<i64>) -> Result<Column> {
    Ok(Series::new(name.into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
        .into_column())
}

fn fold_column(len: usize, fold_number: usize) -> Column {
    Series::new(FOLD_COLUMN.into(), vec![fold_number as u32; len]).into_column()
}

/// One row per segment, one column per metric
pub fn fold_metrics_frame(metrics: &MetricsTable) -> Result<DataFrame> {
    let segments: BTreeSet<&str> = metrics
        .values()
        .flat_map(|scores| scores.keys().map(String::as_str))
        .collect();

    let mut columns = vec![Series::new(
        SEGMENT_COLUMN.into(),
        segments.iter().copied().collect::<Vec<_>>(),
    )
    .into_column()];
    for (name, scores) in metrics {
        let values: Vec<Option<f64>> = segments.iter().map(|s| scores.get(*s).copied()).collect();
        columns.push(Series::new(name.as_str().into(), values).into_column());
    }
    Ok(DataFrame::new(columns)?)
}

/// Per-fold metrics sorted by segment then fold number, or their mean per
/// segment (without the fold column) when `aggregate` is set. The mean
/// ignores NaN scores.
pub fn metrics_frame(folds: &BTreeMap<usize, FoldRecord>, aggregate: bool) -> Result<DataFrame> {
    let names: BTreeSet<&str> = folds
        .values()
        .flat_map(|record| record.metrics.keys().map(String::as_str))
        .collect();
    let rows: BTreeSet<(&str, usize)> = folds
        .values()
        .flat_map(|record| {
            record
                .metrics
                .values()
                .flat_map(move |scores| scores.keys().map(move |s| (s.as_str(), record.fold_number)))
        })
        .collect();

    let mut columns = vec![Series::new(
        SEGMENT_COLUMN.into(),
        rows.iter().map(|(segment, _)| *segment).collect::<Vec<_>>(),
    )
    .into_column()];
    for name in &names {
        let values: Vec<Option<f64>> = rows
            .iter()
            .map(|(segment, fold)| {
                folds
                    .get(fold)
                    .and_then(|record| record.metrics.get(*name))
                    .and_then(|scores| scores.get(*segment))
                    .copied()
            })
            .collect();
        columns.push(Series::new((*name).into(), values).into_column());
    }
    columns.push(
        Series::new(
            FOLD_COLUMN.into(),
            rows.iter().map(|(_, fold)| *fold as u32).collect::<Vec<_>>(),
        )
        .into_column(),
    );
    let df = DataFrame::new(columns)?;

    if !aggregate {
        return Ok(df);
    }
    // NaN scores (e.g. MAPE on zero targets) are skipped like nulls
    let means: Vec<Expr> = names
        .iter()
        .map(|name| col(*name).filter(col(*name).is_not_nan()).mean())
        .collect();
    Ok(df
        .lazy()
        .group_by_stable([col(SEGMENT_COLUMN)])
        .agg(means)
        .collect()?)
}

/// All fold forecasts stacked in fold order with a fold number column
pub fn forecast_frame(folds: &BTreeMap<usize, FoldRecord>) -> Result<DataFrame> {
    let mut stacked: Option<DataFrame> = None;
    for record in folds.values() {
        let mut frame = record.forecast.to_frame();
        frame.with_column(fold_column(frame.height(), record.fold_number))?;
        match stacked.as_mut() {
            Some(acc) => {
                acc.vstack_mut(&frame)?;
            }
            None => stacked = Some(frame),
        }
    }
    Ok(stacked.unwrap_or_else(DataFrame::empty))
}

/// Train and test boundaries of every fold
pub fn fold_info_frame(folds: &BTreeMap<usize, FoldRecord>) -> Result<DataFrame> {
    let records: Vec<&FoldRecord> = folds.values().collect();
    let millis = |pick: fn(&FoldRecord) -> i64| records.iter().map(|r| pick(r)).collect::<Vec<_>>();

    Ok(DataFrame::new(vec![
        datetime_column("train_start_time", millis(|r| to_millis(r.train_range.start)))?,
        datetime_column("train_end_time", millis(|r| to_millis(r.train_range.end)))?,
        datetime_column("test_start_time", millis(|r| to_millis(r.test_range.start)))?,
        datetime_column("test_end_time", millis(|r| to_millis(r.test_range.end)))?,
        Series::new(
            FOLD_COLUMN.into(),
            records.iter().map(|r| r.fold_number as u32).collect::<Vec<_>>(),
        )
        .into_column(),
    ])?)
}
