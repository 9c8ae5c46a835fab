//! Final pass over a summary before it crosses the service boundary.
//!
//! Every number is rewritten to a plain, JSON-representable value: `-0.0`
//! becomes `0.0` and non-finite floats become null wherever the slot is
//! nullable. Sequences are walked element by element and structs field by
//! field. Strings, booleans and nulls pass through unchanged, so applying
//! the pass twice is the same as applying it once.

use smallvec::SmallVec;

use super::types::*;
use crate::models::Cell;

pub trait Normalize {
    fn normalize(self) -> Self;
}

fn plain(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

/// Bare `f64` slots are finite by construction; only the sign of zero is fixed.
impl Normalize for f64 {
    fn normalize(self) -> Self {
        plain(self)
    }
}

impl Normalize for Option<f64> {
    fn normalize(self) -> Self {
        self.filter(|v| v.is_finite()).map(plain)
    }
}

impl Normalize for Cell {
    fn normalize(self) -> Self {
        match self {
            Cell::Real(v) if !v.is_finite() => Cell::Null,
            Cell::Real(v) => Cell::Real(plain(v)),
            other => other,
        }
    }
}

impl<T: Normalize> Normalize for Vec<T> {
    fn normalize(self) -> Self {
        self.into_iter().map(Normalize::normalize).collect()
    }
}

impl<A: smallvec::Array> Normalize for SmallVec<A> {
    // Extreme samples are already strings.
    fn normalize(self) -> Self {
        self
    }
}

macro_rules! normalize_option {
    ($($ty:ty),*) => {
        $(impl Normalize for Option<$ty> {
            fn normalize(self) -> Self {
                self.map(Normalize::normalize)
            }
        })*
    };
}

normalize_option!(NumericStats, Histogram, CorrelationMatrix);

impl Normalize for usize {
    fn normalize(self) -> Self {
        self
    }
}

impl Normalize for ProfileSummary {
    fn normalize(self) -> Self {
        ProfileSummary {
            overview: self.overview.normalize(),
            columns: self.columns.normalize(),
            correlation_matrix: self.correlation_matrix.normalize(),
            correlations: self.correlations.normalize(),
            strong_correlations: self.strong_correlations.normalize(),
            interactions: self.interactions.normalize(),
        }
    }
}

impl Normalize for DatasetOverview {
    fn normalize(self) -> Self {
        DatasetOverview {
            memory_usage: self.memory_usage.normalize(),
            ..self
        }
    }
}

impl Normalize for ColumnProfile {
    fn normalize(self) -> Self {
        ColumnProfile {
            missing_fraction: self.missing_fraction.normalize(),
            missing_percent: self.missing_percent.normalize(),
            details: self.details.normalize(),
            ..self
        }
    }
}

impl Normalize for ColumnDetails {
    fn normalize(self) -> Self {
        match self {
            ColumnDetails::Numeric(n) => ColumnDetails::Numeric(NumericDetails {
                stats: n.stats.normalize(),
                histogram: n.histogram.normalize(),
                min_samples: n.min_samples.normalize(),
                max_samples: n.max_samples.normalize(),
            }),
            ColumnDetails::Categorical(c) => ColumnDetails::Categorical(CategoricalDetails {
                top_values: c.top_values.normalize(),
            }),
            ColumnDetails::Temporal(t) => ColumnDetails::Temporal(t),
        }
    }
}

impl Normalize for NumericStats {
    fn normalize(self) -> Self {
        NumericStats {
            mean: self.mean.normalize(),
            median: self.median.normalize(),
            std: self.std.normalize(),
            min: self.min.normalize(),
            max: self.max.normalize(),
            q25: self.q25.normalize(),
            q75: self.q75.normalize(),
        }
    }
}

impl Normalize for Histogram {
    fn normalize(self) -> Self {
        Histogram {
            counts: self.counts.normalize(),
            bins: self.bins.normalize(),
        }
    }
}

impl Normalize for TopValue {
    fn normalize(self) -> Self {
        TopValue {
            value: self.value.normalize(),
            count: self.count,
        }
    }
}

impl Normalize for CorrelationMatrix {
    fn normalize(self) -> Self {
        CorrelationMatrix {
            columns: self.columns,
            data: self.data.normalize(),
        }
    }
}

impl Normalize for CorrelationEntry {
    fn normalize(self) -> Self {
        CorrelationEntry {
            correlation: self.correlation.normalize(),
            ..self
        }
    }
}

impl Normalize for InteractionSample {
    fn normalize(self) -> Self {
        InteractionSample {
            correlation: self.correlation.normalize(),
            data: self.data.normalize(),
            ..self
        }
    }
}

impl Normalize for Point {
    fn normalize(self) -> Self {
        Point {
            x: self.x.normalize(),
            y: self.y.normalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn summary() -> ProfileSummary {
        ProfileSummary {
            overview: DatasetOverview {
                row_count: 3,
                column_count: 2,
                memory_usage: -0.0,
                duplicate_rows: 0,
            },
            columns: vec![
                ColumnProfile {
                    name: "v".into(),
                    missing: 1,
                    missing_fraction: 1.0 / 3.0,
                    missing_percent: 100.0 / 3.0,
                    unique: 2,
                    details: ColumnDetails::Numeric(NumericDetails {
                        stats: Some(NumericStats {
                            mean: Some(f64::INFINITY),
                            median: Some(-0.0),
                            std: Some(f64::NAN),
                            min: Some(1.0),
                            max: Some(2.0),
                            q25: None,
                            q75: Some(1.75),
                        }),
                        histogram: Some(Histogram {
                            counts: vec![1, 1],
                            bins: vec![-0.0, 1.0, 2.0],
                        }),
                        min_samples: smallvec!["1".to_string()],
                        max_samples: smallvec!["2".to_string()],
                    }),
                },
                ColumnProfile {
                    name: "c".into(),
                    missing: 0,
                    missing_fraction: 0.0,
                    missing_percent: 0.0,
                    unique: 2,
                    details: ColumnDetails::Categorical(CategoricalDetails {
                        top_values: vec![
                            TopValue { value: Cell::Real(f64::NEG_INFINITY), count: 2 },
                            TopValue { value: Cell::Text("a".into()), count: 1 },
                        ],
                    }),
                },
            ],
            correlation_matrix: Some(CorrelationMatrix {
                columns: vec!["a".into(), "b".into()],
                data: vec![vec![Some(1.0), Some(f64::NAN)], vec![Some(-0.0), Some(1.0)]],
            }),
            correlations: vec![CorrelationEntry {
                col1: "a".into(),
                col2: "b".into(),
                correlation: Some(f64::NAN),
            }],
            strong_correlations: vec![],
            interactions: vec![InteractionSample {
                col1: "a".into(),
                col2: "b".into(),
                correlation: 0.75,
                data: vec![Point { x: -0.0, y: 3.5 }],
            }],
        }
    }

    #[test]
    fn rewrites_unsafe_numbers() {
        let out = summary().normalize();
        let stats = out.columns[0].numeric().unwrap().stats.clone().unwrap();
        assert_eq!(stats.mean, None);
        assert_eq!(stats.std, None);
        assert!(stats.median.unwrap().is_sign_positive());
        assert_eq!(stats.q75, Some(1.75));

        let top = &out.columns[1].categorical().unwrap().top_values;
        assert_eq!(top[0].value, Cell::Null);
        assert_eq!(top[1].value, Cell::Text("a".into()));

        assert_eq!(out.correlations[0].correlation, None);
        let matrix = out.correlation_matrix.as_ref().unwrap();
        assert_eq!(matrix.data[0][1], None);
        assert!(matrix.data[1][0].unwrap().is_sign_positive());
        assert!(out.interactions[0].data[0].x.is_sign_positive());
        assert!(out.overview.memory_usage.is_sign_positive());
    }

    #[test]
    fn is_idempotent() {
        let once = summary().normalize();
        let twice = once.clone().normalize();
        assert_eq!(once, twice);
        assert_eq!(
            serde_json::to_value(&once).unwrap(),
            serde_json::to_value(&twice).unwrap()
        );
    }

    #[test]
    fn leaves_strings_and_structure_alone() {
        let before = summary();
        let after = before.clone().normalize();
        assert_eq!(before.columns.len(), after.columns.len());
        assert_eq!(before.columns[1].name, after.columns[1].name);
        assert_eq!(
            before.columns[0].numeric().unwrap().min_samples,
            after.columns[0].numeric().unwrap().min_samples
        );
        assert_eq!(before.correlation_matrix.unwrap().columns, ["a", "b"]);
    }
}
