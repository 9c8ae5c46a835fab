use serde::Serialize;
use smallvec::SmallVec;

use crate::models::{Cell, ColumnKind};

pub const HISTOGRAM_BUCKETS: usize = 20;
pub const EXTREME_SAMPLES: usize = 5;
pub const TOP_VALUES: usize = 10;
pub const STRONG_CORRELATION: f64 = 0.5;
pub const INTERACTION_PAIRS: usize = 3;
pub const INTERACTION_POINTS: usize = 500;

/// Everything computed for one query. Built fresh per request and never cached.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub overview: DatasetOverview,
    pub columns: Vec<ColumnProfile>,
    pub correlation_matrix: Option<CorrelationMatrix>,
    pub correlations: Vec<CorrelationEntry>,
    pub strong_correlations: Vec<CorrelationEntry>,
    pub interactions: Vec<InteractionSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetOverview {
    pub row_count: usize,
    pub column_count: usize,
    /// Approximate in-memory size of the result set, in megabytes.
    pub memory_usage: f64,
    pub duplicate_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub missing: usize,
    pub missing_fraction: f64,
    pub missing_percent: f64,
    pub unique: usize,
    #[serde(flatten)]
    pub details: ColumnDetails,
}

impl ColumnProfile {
    pub fn kind(&self) -> ColumnKind {
        match self.details {
            ColumnDetails::Numeric(_) => ColumnKind::Numeric,
            ColumnDetails::Categorical(_) => ColumnKind::Categorical,
            ColumnDetails::Temporal(_) => ColumnKind::Temporal,
        }
    }

    pub fn numeric(&self) -> Option<&NumericDetails> {
        match &self.details {
            ColumnDetails::Numeric(details) => Some(details),
            _ => None,
        }
    }

    pub fn categorical(&self) -> Option<&CategoricalDetails> {
        match &self.details {
            ColumnDetails::Categorical(details) => Some(details),
            _ => None,
        }
    }

    pub fn temporal(&self) -> Option<&TemporalDetails> {
        match &self.details {
            ColumnDetails::Temporal(details) => Some(details),
            _ => None,
        }
    }
}

/// Kind-specific payload, serialized inline with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnDetails {
    Numeric(NumericDetails),
    Categorical(CategoricalDetails),
    Temporal(TemporalDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<NumericStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histogram: Option<Histogram>,
    pub min_samples: SmallVec<[String; EXTREME_SAMPLES]>,
    pub max_samples: SmallVec<[String; EXTREME_SAMPLES]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub mean: Option<f64>,
    pub median: Option<f64>,
    /// Sample standard deviation; absent with fewer than two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub q25: Option<f64>,
    pub q75: Option<f64>,
}

/// Equal-width histogram. `bins` holds bucket edges, one more than `counts`
/// except for the degenerate single-value case where both edges coincide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub counts: Vec<usize>,
    pub bins: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalDetails {
    pub top_values: Vec<TopValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopValue {
    pub value: Cell,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemporalDetails {
    pub min: Option<String>,
    pub max: Option<String>,
}

/// Square correlation table over numeric columns, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.data[i][j]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationEntry {
    pub col1: String,
    pub col2: String,
    /// `None` when the pair has no defined Pearson coefficient.
    pub correlation: Option<f64>,
}

impl CorrelationEntry {
    pub fn is_strong(&self) -> bool {
        self.correlation
            .map_or(false, |r| r.abs() > STRONG_CORRELATION)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionSample {
    pub col1: String,
    pub col2: String,
    pub correlation: f64,
    pub data: Vec<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}
