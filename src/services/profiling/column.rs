use chrono::NaiveDateTime;
use smallvec::SmallVec;
use std::collections::{HashMap, HashSet};

use super::scaled::ScaledSeries;
use super::types::*;
use crate::error::ProfileError;
use crate::models::{Cell, Column, ColumnKind, TIMESTAMP_FORMAT};

/// Profiles one column. The kind comes from the declared type tag; a value
/// that does not fit that kind makes the whole column unprofilable.
pub fn profile_column(column: &Column) -> Result<ColumnProfile, ProfileError> {
    let row_count = column.len();

    let (present, details) = match column.kind() {
        ColumnKind::Numeric => {
            let values = numeric_values(column)?;
            let present = values.len();
            (present, ColumnDetails::Numeric(numeric_details(values)))
        }
        ColumnKind::Categorical => {
            let (present, details) = categorical_details(&column.values);
            (present, ColumnDetails::Categorical(details))
        }
        ColumnKind::Temporal => {
            let values = temporal_values(column)?;
            let present = values.len();
            (present, ColumnDetails::Temporal(temporal_details(&values)))
        }
    };

    let missing = row_count - present;
    let missing_fraction = if row_count > 0 {
        missing as f64 / row_count as f64
    } else {
        0.0
    };

    Ok(ColumnProfile {
        name: column.name.clone(),
        missing,
        missing_fraction,
        missing_percent: missing_fraction * 100.0,
        unique: distinct_count(&column.values),
        details,
    })
}

/// Number of distinct present values, compared by canonical key.
fn distinct_count(values: &[Cell]) -> usize {
    values
        .iter()
        .filter(|v| is_present(v))
        .map(Cell::key)
        .collect::<HashSet<_>>()
        .len()
}

/// Non-finite reals count as missing for every column kind.
fn is_present(cell: &Cell) -> bool {
    !cell.is_missing() && !matches!(cell, Cell::Real(v) if !v.is_finite())
}

fn unexpected(column: &Column, row: usize, cell: &Cell) -> ProfileError {
    ProfileError::UnexpectedValue {
        column: column.name.clone(),
        kind: column.kind(),
        found: cell.type_name(),
        row,
    }
}

// ── Numeric ──────────────────────────────────────────────────────────

/// Present values of a numeric column, sorted ascending. Non-finite reals
/// count as missing.
fn numeric_values(column: &Column) -> Result<Vec<(f64, &Cell)>, ProfileError> {
    let mut values = Vec::with_capacity(column.len());
    for (row, cell) in column.values.iter().enumerate() {
        match cell {
            Cell::Null => {}
            Cell::Integer(i) => values.push((*i as f64, cell)),
            Cell::Real(v) if v.is_finite() => values.push((*v, cell)),
            Cell::Real(_) => {}
            other => return Err(unexpected(column, row, other)),
        }
    }
    values.sort_by(|a, b| a.0.total_cmp(&b.0));
    Ok(values)
}

fn numeric_details(values: Vec<(f64, &Cell)>) -> NumericDetails {
    let min_samples = values
        .iter()
        .take(EXTREME_SAMPLES)
        .map(|(_, cell)| cell.to_string())
        .collect::<SmallVec<[String; EXTREME_SAMPLES]>>();
    let max_samples = values
        .iter()
        .rev()
        .take(EXTREME_SAMPLES)
        .map(|(_, cell)| cell.to_string())
        .collect::<SmallVec<[String; EXTREME_SAMPLES]>>();

    let sorted: Vec<f64> = values.into_iter().map(|(v, _)| v).collect();

    NumericDetails {
        stats: numeric_stats(&sorted),
        histogram: histogram(&sorted),
        min_samples,
        max_samples,
    }
}

/// `sorted` must be ascending and finite.
pub(crate) fn numeric_stats(sorted: &[f64]) -> Option<NumericStats> {
    let (&min, &max) = (sorted.first()?, sorted.last()?);
    let series = ScaledSeries::new("values", sorted);

    Some(NumericStats {
        mean: series.mean(),
        median: series.median(),
        std: series.std(),
        min: Some(min),
        max: Some(max),
        q25: series.quantile(0.25),
        q75: series.quantile(0.75),
    })
}

/// `sorted` must be ascending and finite.
pub(crate) fn histogram(sorted: &[f64]) -> Option<Histogram> {
    let (&min, &max) = (sorted.first()?, sorted.last()?);

    if min == max {
        return Some(Histogram {
            counts: vec![sorted.len()],
            bins: vec![min, max],
        });
    }

    let buckets = HISTOGRAM_BUCKETS as f64;
    // Divided before subtracting so that extreme ranges do not overflow.
    let width = max / buckets - min / buckets;

    let mut counts = vec![0usize; HISTOGRAM_BUCKETS];
    for &v in sorted {
        let pos = v / width - min / width;
        let idx = (pos.max(0.0) as usize).min(HISTOGRAM_BUCKETS - 1);
        counts[idx] += 1;
    }

    let mut bins: Vec<f64> = (0..=HISTOGRAM_BUCKETS)
        .map(|i| min + width * i as f64)
        .collect();
    bins[HISTOGRAM_BUCKETS] = max;

    Some(Histogram { counts, bins })
}

// ── Categorical ──────────────────────────────────────────────────────

fn categorical_details(values: &[Cell]) -> (usize, CategoricalDetails) {
    let mut index: HashMap<String, usize> = HashMap::new();
    // First-seen order; the stable sort below keeps it for ties.
    let mut entries: Vec<TopValue> = Vec::new();
    let mut present = 0;

    for cell in values.iter().filter(|c| is_present(c)) {
        present += 1;
        match index.get(&cell.key()) {
            Some(&i) => entries[i].count += 1,
            None => {
                index.insert(cell.key(), entries.len());
                entries.push(TopValue {
                    value: cell.clone(),
                    count: 1,
                });
            }
        }
    }

    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(TOP_VALUES);

    (present, CategoricalDetails { top_values: entries })
}

// ── Temporal ─────────────────────────────────────────────────────────

fn temporal_values(column: &Column) -> Result<Vec<NaiveDateTime>, ProfileError> {
    let mut values = Vec::with_capacity(column.len());
    for (row, cell) in column.values.iter().enumerate() {
        match cell {
            c if c.is_missing() => {}
            Cell::Temporal(t) => values.push(*t),
            other => return Err(unexpected(column, row, other)),
        }
    }
    Ok(values)
}

fn temporal_details(values: &[NaiveDateTime]) -> TemporalDetails {
    let format = |t: &NaiveDateTime| t.format(TIMESTAMP_FORMAT).to_string();
    TemporalDetails {
        min: values.iter().min().map(format),
        max: values.iter().max().map(format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TypeTag;
    use chrono::NaiveDate;

    fn reals(name: &str, values: &[Option<f64>]) -> Column {
        Column::new(
            name,
            TypeTag::Real,
            values
                .iter()
                .map(|v| v.map_or(Cell::Null, Cell::Real))
                .collect(),
        )
    }

    fn texts(name: &str, values: &[&str]) -> Column {
        Column::new(
            name,
            TypeTag::Text,
            values.iter().map(|v| Cell::Text(v.to_string())).collect(),
        )
    }

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn numeric_basic_stats() {
        let col = reals("v", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(5.0)]);
        let profile = profile_column(&col).unwrap();
        assert_eq!(profile.kind(), ColumnKind::Numeric);
        assert_eq!(profile.missing, 0);
        assert_eq!(profile.unique, 5);

        let stats = profile.numeric().unwrap().stats.clone().unwrap();
        assert_eq!(stats.mean, Some(3.0));
        assert_eq!(stats.median, Some(3.0));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(5.0));
        assert_eq!(stats.q25, Some(2.0));
        assert_eq!(stats.q75, Some(4.0));
        let std = stats.std.unwrap();
        assert!((std - 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn stats_survive_values_near_the_float_limit() {
        let stats = numeric_stats(&[-1.7e308, 1.7e308]).unwrap();
        assert_eq!(stats.mean, Some(0.0));
        assert_eq!(stats.median, Some(0.0));
        assert_eq!(stats.q25, Some(-0.85e308));
        assert_eq!(stats.q75, Some(0.85e308));

        let stats = numeric_stats(&[1.6e308, 1.7e308, 1.7e308]).unwrap();
        assert!(stats.mean.unwrap().is_finite());
        assert!(stats.mean.unwrap() > 1.6e308);
        assert_eq!(stats.median, Some(1.7e308));
    }

    #[test]
    fn quantiles_interpolate() {
        let stats = numeric_stats(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(stats.median, Some(2.5));
        assert_eq!(stats.q25, Some(1.75));
        assert_eq!(stats.q75, Some(3.25));
    }

    #[test]
    fn missing_values_are_excluded() {
        let col = reals("v", &[Some(10.0), None, Some(20.0), Some(f64::NAN)]);
        let profile = profile_column(&col).unwrap();
        assert_eq!(profile.missing, 2);
        assert_eq!(profile.missing_fraction, 0.5);
        assert_eq!(profile.missing_percent, 50.0);
        let stats = profile.numeric().unwrap().stats.clone().unwrap();
        assert_eq!(stats.mean, Some(15.0));
    }

    #[test]
    fn all_null_column_has_no_stats() {
        let col = reals("v", &[None, None, None]);
        let profile = profile_column(&col).unwrap();
        assert_eq!(profile.missing, 3);
        assert_eq!(profile.missing_percent, 100.0);
        assert_eq!(profile.unique, 0);
        let numeric = profile.numeric().unwrap();
        assert!(numeric.stats.is_none());
        assert!(numeric.histogram.is_none());

        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("stats").is_none());
        assert!(json.get("histogram").is_none());
        assert_eq!(json["type"], "numeric");
    }

    #[test]
    fn empty_column_is_degenerate_not_an_error() {
        for col in [reals("v", &[]), texts("t", &[])] {
            let profile = profile_column(&col).unwrap();
            assert_eq!(profile.missing, 0);
            assert_eq!(profile.missing_fraction, 0.0);
            match &profile.details {
                ColumnDetails::Numeric(n) => {
                    assert!(n.stats.is_none());
                    assert!(n.histogram.is_none());
                    assert!(n.min_samples.is_empty());
                }
                ColumnDetails::Categorical(c) => assert!(c.top_values.is_empty()),
                ColumnDetails::Temporal(_) => unreachable!(),
            }
        }
    }

    #[test]
    fn single_value_std_is_absent() {
        let stats = numeric_stats(&[7.0]).unwrap();
        assert_eq!(stats.std, None);
        assert_eq!(stats.median, Some(7.0));
    }

    #[test]
    fn histogram_counts_sum_to_present_values() {
        let values: Vec<Option<f64>> = (0..137)
            .map(|i| if i % 10 == 0 { None } else { Some((i * i) as f64 / 7.0) })
            .collect();
        let col = reals("v", &values);
        let profile = profile_column(&col).unwrap();
        let hist = profile.numeric().unwrap().histogram.clone().unwrap();
        assert_eq!(hist.counts.len(), HISTOGRAM_BUCKETS);
        assert_eq!(hist.bins.len(), HISTOGRAM_BUCKETS + 1);
        assert_eq!(hist.counts.iter().sum::<usize>(), 137 - profile.missing);
        assert_eq!(hist.bins[0], 1.0 / 7.0);
        assert_eq!(hist.bins[HISTOGRAM_BUCKETS], (136 * 136) as f64 / 7.0);
    }

    #[test]
    fn histogram_max_lands_in_last_bucket() {
        let hist = histogram(&[0.0, 10.0, 20.0]).unwrap();
        assert_eq!(hist.counts[0], 1);
        assert_eq!(hist.counts[10], 1);
        assert_eq!(hist.counts[19], 1);
    }

    #[test]
    fn identical_values_collapse_to_one_bucket() {
        let col = reals("v", &[Some(4.0), Some(4.0), None, Some(4.0)]);
        let profile = profile_column(&col).unwrap();
        let hist = profile.numeric().unwrap().histogram.clone().unwrap();
        assert_eq!(hist.counts, vec![3]);
        assert_eq!(hist.bins, vec![4.0, 4.0]);
    }

    #[test]
    fn extreme_samples_keep_duplicates() {
        let col = Column::new(
            "n",
            TypeTag::Integer,
            [1, 1, 9, 2, 8, 3, 7, 9, 5, 1]
                .iter()
                .map(|&v| Cell::Integer(v))
                .collect(),
        );
        let profile = profile_column(&col).unwrap();
        let numeric = profile.numeric().unwrap();
        assert_eq!(numeric.min_samples.as_slice(), ["1", "1", "1", "2", "3"]);
        assert_eq!(numeric.max_samples.as_slice(), ["9", "9", "8", "7", "5"]);
    }

    #[test]
    fn infinite_reals_count_as_missing() {
        let col = reals("v", &[Some(1.0), Some(f64::INFINITY), Some(3.0)]);
        let profile = profile_column(&col).unwrap();
        assert_eq!(profile.missing, 1);
        assert_eq!(profile.unique, 2);
        let stats = profile.numeric().unwrap().stats.clone().unwrap();
        assert_eq!(stats.max, Some(3.0));
    }

    #[test]
    fn numeric_column_rejects_text() {
        let col = Column::new(
            "v",
            TypeTag::Integer,
            vec![Cell::Integer(1), Cell::Text("two".into())],
        );
        let err = profile_column(&col).unwrap_err();
        assert_eq!(
            err,
            ProfileError::UnexpectedValue {
                column: "v".into(),
                kind: ColumnKind::Numeric,
                found: "text",
                row: 1,
            }
        );
    }

    #[test]
    fn categorical_top_values_by_count() {
        let col = texts("c", &["a", "a", "b", "c", "a", "b"]);
        let profile = profile_column(&col).unwrap();
        assert_eq!(profile.unique, 3);
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(
            json["top_values"],
            serde_json::json!([
                {"value": "a", "count": 3},
                {"value": "b", "count": 2},
                {"value": "c", "count": 1}
            ])
        );
    }

    #[test]
    fn categorical_skips_non_finite_reals() {
        let col = Column::new(
            "c",
            TypeTag::Text,
            vec![
                Cell::Text("a".into()),
                Cell::Real(f64::INFINITY),
                Cell::Real(f64::NEG_INFINITY),
                Cell::Real(2.5),
            ],
        );
        let profile = profile_column(&col).unwrap();
        assert_eq!(profile.missing, 2);
        assert_eq!(profile.unique, 2);
        let top = &profile.categorical().unwrap().top_values;
        assert_eq!(top.len(), profile.unique);
        assert!(top.iter().all(|t| !t.value.is_missing()));
    }

    #[test]
    fn categorical_ties_keep_first_appearance() {
        let col = texts("c", &["z", "y", "x", "y", "z", "x"]);
        let profile = profile_column(&col).unwrap();
        let order: Vec<String> = profile
            .categorical()
            .unwrap()
            .top_values
            .iter()
            .map(|t| t.value.to_string())
            .collect();
        assert_eq!(order, ["z", "y", "x"]);
    }

    #[test]
    fn categorical_caps_at_ten_and_keeps_value_type() {
        let col = Column::new(
            "flag",
            TypeTag::Boolean,
            (0..30)
                .map(|i| if i % 3 == 0 { Cell::Null } else { Cell::Boolean(i % 2 == 0) })
                .collect(),
        );
        let profile = profile_column(&col).unwrap();
        assert_eq!(profile.missing, 10);
        let top = &profile.categorical().unwrap().top_values;
        assert_eq!(top.len(), 2);
        assert!(matches!(top[0].value, Cell::Boolean(_)));

        let many: Vec<String> = (0..25).map(|i| format!("v{i}")).collect();
        let refs: Vec<&str> = many.iter().map(String::as_str).collect();
        let profile = profile_column(&texts("c", &refs)).unwrap();
        assert_eq!(profile.categorical().unwrap().top_values.len(), TOP_VALUES);
        assert_eq!(profile.unique, 25);
    }

    #[test]
    fn temporal_min_max() {
        let col = Column::new(
            "d",
            TypeTag::Temporal,
            vec![
                Cell::Temporal(ts(2024, 5, 1)),
                Cell::Null,
                Cell::Temporal(ts(2023, 1, 15)),
                Cell::Temporal(ts(2024, 12, 31)),
            ],
        );
        let profile = profile_column(&col).unwrap();
        assert_eq!(profile.missing, 1);
        assert_eq!(profile.unique, 3);
        let temporal = profile.temporal().unwrap();
        assert_eq!(temporal.min.as_deref(), Some("2023-01-15 00:00:00"));
        assert_eq!(temporal.max.as_deref(), Some("2024-12-31 00:00:00"));
    }

    #[test]
    fn temporal_all_null_has_no_bounds() {
        let col = Column::new("d", TypeTag::Temporal, vec![Cell::Null, Cell::Null]);
        let profile = profile_column(&col).unwrap();
        assert_eq!(profile.temporal().unwrap().min, None);
        assert_eq!(profile.temporal().unwrap().max, None);
    }

    #[test]
    fn temporal_column_rejects_unparsed_text() {
        let col = Column::new(
            "d",
            TypeTag::Temporal,
            vec![Cell::Temporal(ts(2024, 1, 1)), Cell::Text("yesterday".into())],
        );
        assert!(matches!(
            profile_column(&col),
            Err(ProfileError::UnexpectedValue { found: "text", row: 1, .. })
        ));
    }
}
