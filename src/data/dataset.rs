use super::validator::DataValidator;
use crate::error::{FoldcastError, Result};
use crate::transforms::Transform;
use crate::types::*;
use chrono::{NaiveDateTime, TimeDelta};
use polars::prelude::*;

/// Multi-segment time series container.
///
/// Rows are stored in long format and sorted by `(segment, timestamp)`, so
/// every segment owns one contiguous block of `index.len()` rows. All
/// segments share the same regular index.
#[derive(Debug, Clone)]
pub struct TSDataset {
    df: DataFrame,
    raw_df: DataFrame,
    index: Vec<NaiveDateTime>,
    segments: Vec<String>,
    freq: TimeDelta,
    transforms: Vec<Box<dyn Transform>>,
}

impl TSDataset {
    /// Build a dataset from a long-format frame with `timestamp`, `segment`
    /// and `target` columns. Any other column is treated as a numeric feature.
    pub fn new(df: DataFrame, freq: TimeDelta) -> Result<Self> {
        if freq <= TimeDelta::zero() {
            return Err(FoldcastError::Dataset(format!(
                "Frequency must be positive, got {}",
                freq
            )));
        }
        DataValidator::validate_required_columns(&df)?;
        DataValidator::validate_minimum_rows(&df, 1)?;

        let df = normalize_columns(&df)?
            .sort([SEGMENT_COLUMN, TIMESTAMP_COLUMN], SortMultipleOptions::default())?;

        let millis = timestamp_millis(&df)?;
        let segment_per_row = segment_names(&df)?;

        let mut segments: Vec<String> = Vec::new();
        for name in &segment_per_row {
            if segments.last() != Some(name) {
                segments.push(name.clone());
            }
        }

        if df.height() % segments.len() != 0 {
            return Err(FoldcastError::Dataset(
                "All segments must share the same timestamp index".to_string(),
            ));
        }
        let period = df.height() / segments.len();

        for (k, segment) in segments.iter().enumerate() {
            let rows = k * period..(k + 1) * period;
            if segment_per_row[rows.clone()].iter().any(|s| s != segment)
                || millis[rows] != millis[..period]
            {
                return Err(FoldcastError::Dataset(format!(
                    "Segment {} does not share the dataset timestamp index",
                    segment
                )));
            }
        }

        let step = freq.num_milliseconds();
        if let Some(pos) = millis[..period].windows(2).position(|w| w[1] - w[0] != step) {
            return Err(FoldcastError::Dataset(format!(
                "Timestamp index is not regular at frequency {} (position {})",
                freq,
                pos + 1
            )));
        }

        let index = millis[..period]
            .iter()
            .map(|&ms| from_millis(ms))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw_df: df.clone(),
            df,
            index,
            segments,
            freq,
            transforms: Vec::new(),
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn freq(&self) -> TimeDelta {
        self.freq
    }

    /// Number of timestamps in the index
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn columns(&self) -> Vec<String> {
        self.df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub fn transforms(&self) -> &[Box<dyn Transform>] {
        &self.transforms
    }

    /// Tabular export of the current (possibly transformed) data
    pub fn to_frame(&self) -> DataFrame {
        self.df.clone()
    }

    /// Values of one feature for one segment, in index order
    pub fn segment_values(&self, segment: &str, feature: &str) -> Result<Vec<Option<f64>>> {
        let block = self.segment_block(&self.df, segment)?;
        let column = block.column(feature)?.cast(&DataType::Float64)?;
        Ok(column.f64()?.into_iter().collect())
    }

    /// Number of non-missing target observations in a segment
    pub fn target_length(&self, segment: &str) -> Result<usize> {
        Ok(self
            .segment_values(segment, TARGET_COLUMN)?
            .iter()
            .filter(|v| v.is_some())
            .count())
    }

    pub fn position(&self, timestamp: NaiveDateTime) -> Result<usize> {
        self.index.binary_search(&timestamp).map_err(|_| {
            FoldcastError::Dataset(format!("Timestamp {} is not in the dataset index", timestamp))
        })
    }

    /// Raw copy of the rows between two index positions, both inclusive.
    pub fn slice_positions(&self, start: usize, end: usize) -> Result<TSDataset> {
        if start > end || end >= self.len() {
            return Err(FoldcastError::Dataset(format!(
                "Invalid slice [{}, {}] for index of length {}",
                start,
                end,
                self.len()
            )));
        }

        let length = end - start + 1;
        let period = self.len();
        let mut frame = self.raw_df.slice(start as i64, length);
        for k in 1..self.segments.len() {
            let block = self.raw_df.slice((k * period + start) as i64, length);
            frame.vstack_mut(&block)?;
        }

        Ok(Self {
            raw_df: frame.clone(),
            df: frame,
            index: self.index[start..=end].to_vec(),
            segments: self.segments.clone(),
            freq: self.freq,
            transforms: Vec::new(),
        })
    }

    /// Split into untransformed train and test datasets by timestamp bounds.
    pub fn train_test_split(
        &self,
        train_start: NaiveDateTime,
        train_end: NaiveDateTime,
        test_start: NaiveDateTime,
        test_end: NaiveDateTime,
    ) -> Result<(TSDataset, TSDataset)> {
        if train_end >= test_start {
            return Err(FoldcastError::Dataset(format!(
                "Train end {} must precede test start {}",
                train_end, test_start
            )));
        }
        let train = self.slice_positions(self.position(train_start)?, self.position(train_end)?)?;
        let test = self.slice_positions(self.position(test_start)?, self.position(test_end)?)?;
        Ok((train, test))
    }

    /// Fit every transform in order on the progressively transformed data
    /// and keep the fitted chain for `make_future` and `inverse_transform`.
    pub fn fit_transform(&mut self, mut transforms: Vec<Box<dyn Transform>>) -> Result<()> {
        let mut frame = self.df.clone();
        for transform in transforms.iter_mut() {
            transform.fit(&frame)?;
            frame = apply_checked(transform.as_ref(), frame, false)?;
        }
        self.df = frame;
        self.transforms = transforms;
        Ok(())
    }

    /// Dataset of the next `horizon` timestamps with a missing target and
    /// the fitted transforms applied.
    pub fn make_future(&self, horizon: usize) -> Result<TSDataset> {
        if horizon == 0 {
            return Err(FoldcastError::Dataset(
                "Future horizon must be positive".to_string(),
            ));
        }
        let last = self
            .index
            .last()
            .copied()
            .ok_or_else(|| FoldcastError::Dataset("Cannot extend an empty index".to_string()))?;

        let index = (1..=horizon)
            .map(|step| {
                i32::try_from(step)
                    .ok()
                    .and_then(|step| self.freq.checked_mul(step))
                    .and_then(|offset| last.checked_add_signed(offset))
                    .ok_or_else(|| {
                        FoldcastError::Dataset(format!("Future timestamp overflow at step {}", step))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let targets: SegmentValues = self
            .segments
            .iter()
            .map(|segment| (segment.clone(), vec![None; horizon]))
            .collect();
        let raw_df = build_long_frame(&index, &self.segments, &[(TARGET_COLUMN, &targets)])?;

        let mut df = raw_df.clone();
        for transform in &self.transforms {
            df = apply_checked(transform.as_ref(), df, false)?;
        }

        Ok(Self {
            df,
            raw_df,
            index,
            segments: self.segments.clone(),
            freq: self.freq,
            transforms: self.transforms.clone(),
        })
    }

    /// Undo the fitted transforms, last one first.
    pub fn inverse_transform(&mut self) -> Result<()> {
        let mut frame = self.df.clone();
        for transform in self.transforms.iter().rev() {
            frame = apply_checked(transform.as_ref(), frame, true)?;
        }
        self.df = frame;
        Ok(())
    }

    /// Write a feature column from per-segment values, replacing any
    /// existing column with the same name.
    pub fn with_feature(&mut self, name: &str, values: &SegmentValues) -> Result<()> {
        let mut column = Vec::with_capacity(self.df.height());
        for segment in &self.segments {
            let segment_values = values.get(segment).ok_or_else(|| {
                FoldcastError::Dataset(format!("No values given for segment {}", segment))
            })?;
            if segment_values.len() != self.len() {
                return Err(FoldcastError::Dataset(format!(
                    "Segment {} has {} values, index has {}",
                    segment,
                    segment_values.len(),
                    self.len()
                )));
            }
            column.extend_from_slice(segment_values);
        }
        self.df.with_column(Series::new(name.into(), column))?;
        Ok(())
    }

    fn segment_block(&self, frame: &DataFrame, segment: &str) -> Result<DataFrame> {
        let k = self
            .segments
            .iter()
            .position(|s| s == segment)
            .ok_or_else(|| FoldcastError::Dataset(format!("Unknown segment {}", segment)))?;
        Ok(frame.slice((k * self.len()) as i64, self.len()))
    }
}

/// Long-format frame for the given index and segments with one column per
/// `(name, values)` pair.
pub(crate) fn build_long_frame(
    index: &[NaiveDateTime],
    segments: &[String],
    features: &[(&str, &SegmentValues)],
) -> Result<DataFrame> {
    let rows = index.len() * segments.len();
    let mut millis = Vec::with_capacity(rows);
    let mut names = Vec::with_capacity(rows);
    for segment in segments {
        millis.extend(index.iter().map(|&ts| to_millis(ts)));
        names.extend(std::iter::repeat(segment.as_str()).take(index.len()));
    }

    let mut columns = vec![
        Series::new(TIMESTAMP_COLUMN.into(), millis)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            .into_column(),
        Series::new(SEGMENT_COLUMN.into(), names).into_column(),
    ];

    for (name, values) in features {
        let mut column: Vec<Option<f64>> = Vec::with_capacity(rows);
        for segment in segments {
            let segment_values = values.get(segment).ok_or_else(|| {
                FoldcastError::Dataset(format!("No {} values for segment {}", name, segment))
            })?;
            if segment_values.len() != index.len() {
                return Err(FoldcastError::Dataset(format!(
                    "Segment {} has {} {} values, index has {}",
                    segment,
                    segment_values.len(),
                    name,
                    index.len()
                )));
            }
            column.extend_from_slice(segment_values);
        }
        columns.push(Series::new((*name).into(), column).into_column());
    }

    Ok(DataFrame::new(columns)?)
}

fn apply_checked(transform: &dyn Transform, frame: DataFrame, inverse: bool) -> Result<DataFrame> {
    let height = frame.height();
    let out = if inverse {
        transform.inverse_transform(frame)?
    } else {
        transform.transform(frame)?
    };
    if out.height() != height {
        return Err(FoldcastError::Transform(format!(
            "{} changed the row count from {} to {}",
            transform.name(),
            height,
            out.height()
        )));
    }
    Ok(out)
}

fn normalize_columns(df: &DataFrame) -> Result<DataFrame> {
    let columns = df
        .get_columns()
        .iter()
        .map(|column| match column.name().as_str() {
            TIMESTAMP_COLUMN => column.cast(&DataType::Datetime(TimeUnit::Milliseconds, None)),
            SEGMENT_COLUMN => column.cast(&DataType::String),
            _ => column.cast(&DataType::Float64),
        })
        .collect::<PolarsResult<Vec<Column>>>()?;
    Ok(DataFrame::new(columns)?)
}

fn timestamp_millis(df: &DataFrame) -> Result<Vec<i64>> {
    let column = df.column(TIMESTAMP_COLUMN)?.cast(&DataType::Int64)?;
    column
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, ms)| {
            ms.ok_or_else(|| FoldcastError::Dataset(format!("Missing timestamp at row {}", row)))
        })
        .collect()
}

fn segment_names(df: &DataFrame) -> Result<Vec<String>> {
    df.column(SEGMENT_COLUMN)?
        .str()?
        .into_iter()
        .enumerate()
        .map(|(row, name)| {
            name.map(str::to_string)
                .ok_or_else(|| FoldcastError::Dataset(format!("Missing segment at row {}", row)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use crate::data::generators::generate_const_df;
    use crate::transforms::AddConstTransform;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_new_sorts_and_indexes() {
        let df = df! {
            "timestamp" => &[2i64 * 86_400_000, 0, 86_400_000, 0, 86_400_000, 2 * 86_400_000],
            "segment" => &["b", "b", "b", "a", "a", "a"],
            "target" => &[3.0, 1.0, 2.0, 10.0, 20.0, 30.0],
        }
        .unwrap();

        let ts = TSDataset::new(df, TimeDelta::days(1)).unwrap();
        assert_eq!(ts.segments(), &["a".to_string(), "b".to_string()]);
        assert_eq!(ts.len(), 3);
        assert_eq!(
            ts.segment_values("b", TARGET_COLUMN).unwrap(),
            vec![Some(1.0), Some(2.0), Some(3.0)]
        );
    }

    #[test]
    fn test_new_rejects_irregular_index() {
        let df = df! {
            "timestamp" => &[0i64, 86_400_000, 3 * 86_400_000],
            "segment" => &["a", "a", "a"],
            "target" => &[1.0, 2.0, 3.0],
        }
        .unwrap();

        assert!(TSDataset::new(df, TimeDelta::days(1)).is_err());
    }

    #[test]
    fn test_new_rejects_misaligned_segments() {
        let df = df! {
            "timestamp" => &[0i64, 86_400_000, 0],
            "segment" => &["a", "a", "b"],
            "target" => &[1.0, 2.0, 3.0],
        }
        .unwrap();

        assert!(TSDataset::new(df, TimeDelta::days(1)).is_err());
    }

    #[test]
    fn test_train_test_split_is_disjoint() {
        let df = generate_const_df(20, start(), TimeDelta::days(1), 2, 5.0).unwrap();
        let ts = TSDataset::new(df, TimeDelta::days(1)).unwrap();
        let index = ts.index().to_vec();

        let (train, test) = ts
            .train_test_split(index[0], index[14], index[15], index[19])
            .unwrap();

        assert_eq!(train.len(), 15);
        assert_eq!(test.len(), 5);
        assert_eq!(train.to_frame().height(), 30);
        assert_eq!(test.index()[0], index[15]);
    }

    #[test]
    fn test_make_future_applies_and_inverts_transforms() {
        let df = generate_const_df(10, start(), TimeDelta::days(1), 1, 5.0).unwrap();
        let mut ts = TSDataset::new(df, TimeDelta::days(1)).unwrap();
        ts.fit_transform(vec![Box::new(AddConstTransform::new(10.0, TARGET_COLUMN, true))])
            .unwrap();
        assert_eq!(ts.segment_values("segment_0", TARGET_COLUMN).unwrap()[0], Some(15.0));

        let mut future = ts.make_future(3).unwrap();
        assert_eq!(future.len(), 3);
        assert_eq!(future.index()[0], ts.index()[9] + TimeDelta::days(1));

        let mut values = SegmentValues::new();
        values.insert("segment_0".to_string(), vec![Some(15.0); 3]);
        future.with_feature(TARGET_COLUMN, &values).unwrap();
        future.inverse_transform().unwrap();
        assert_eq!(
            future.segment_values("segment_0", TARGET_COLUMN).unwrap(),
            vec![Some(5.0); 3]
        );
    }
}
