use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use foldcast::data::{generate_const_df, TSDataset};
use foldcast::engines::backtest::{generate_folds, CrossValidationMode, DataSplit, FoldSplitter};

fn daily_dataset(periods: usize, n_segments: usize) -> TSDataset {
    let start: NaiveDateTime = NaiveDate::from_ymd_opt(2022, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let df = generate_const_df(periods, start, TimeDelta::days(1), n_segments, 1.0).unwrap();
    TSDataset::new(df, TimeDelta::days(1)).unwrap()
}

fn splits(ts: &TSDataset, n_folds: usize, horizon: usize, mode: CrossValidationMode) -> Vec<DataSplit> {
    generate_folds(ts, n_folds, horizon, mode)
        .unwrap()
        .collect::<foldcast::Result<Vec<_>>>()
        .unwrap()
}

#[test]
fn test_hundred_days_three_folds_expand() {
    let ts = daily_dataset(100, 2);
    let index = ts.index().to_vec();
    let folds = splits(&ts, 3, 10, CrossValidationMode::Expand);

    let expected = [(0, 69, 70, 79), (0, 79, 80, 89), (0, 89, 90, 99)];
    assert_eq!(folds.len(), 3);
    for (fold, (train_start, train_end, test_start, test_end)) in folds.iter().zip(expected) {
        assert_eq!(fold.train_range.start, index[train_start]);
        assert_eq!(fold.train_range.end, index[train_end]);
        assert_eq!(fold.test_range.start, index[test_start]);
        assert_eq!(fold.test_range.end, index[test_end]);
        assert_eq!(fold.train.index().first(), Some(&index[train_start]));
        assert_eq!(fold.test.index().last(), Some(&index[test_end]));
    }
    assert_eq!(
        folds.iter().map(|f| f.fold_number).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[test]
fn test_test_follows_train_and_spans_horizon() {
    let ts = daily_dataset(60, 3);
    for mode in [CrossValidationMode::Expand, CrossValidationMode::Constant] {
        for n_folds in 1..=5 {
            let folds = splits(&ts, n_folds, 7, mode);
            assert_eq!(folds.len(), n_folds);
            for fold in &folds {
                assert_eq!(fold.train_range.end + TimeDelta::days(1), fold.test_range.start);
                assert_eq!(fold.test.len(), 7);
                assert_eq!(fold.test.segments(), ts.segments());
                assert_eq!(fold.test.to_frame().height(), 7 * 3);
            }
        }
    }
}

#[test]
fn test_constant_mode_keeps_train_length() {
    let ts = daily_dataset(80, 1);
    let folds = splits(&ts, 4, 5, CrossValidationMode::Constant);

    let lengths: Vec<_> = folds.iter().map(|f| f.train.len()).collect();
    assert_eq!(lengths, vec![60; 4]);
    assert_eq!(folds[1].train.index()[0], ts.index()[5]);
}

#[test]
fn test_expand_mode_grows_train() {
    let ts = daily_dataset(80, 1);
    let folds = splits(&ts, 4, 5, CrossValidationMode::Expand);

    let lengths: Vec<_> = folds.iter().map(|f| f.train.len()).collect();
    assert!(lengths.windows(2).all(|w| w[0] < w[1]));
    assert!(folds.iter().all(|f| f.train.index()[0] == ts.index()[0]));
}

#[test]
fn test_folds_are_produced_lazily() {
    let ts = daily_dataset(30, 1);
    let mut folds = FoldSplitter::new(3, 5, CrossValidationMode::Expand)
        .unwrap()
        .generate_folds(&ts)
        .unwrap();

    assert_eq!(folds.len(), 3);
    let first = folds.next().unwrap().unwrap();
    assert_eq!(first.fold_number, 0);
    assert_eq!(folds.len(), 2);
}

#[test]
fn test_not_enough_history() {
    let ts = daily_dataset(30, 1);
    assert!(generate_folds(&ts, 3, 10, CrossValidationMode::Expand).is_err());
}
