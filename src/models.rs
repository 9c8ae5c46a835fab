use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use crate::error::ProfileError;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single value in a query result.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
    Temporal(NaiveDateTime),
}

impl Cell {
    /// Nulls and NaN reals are missing.
    pub fn is_missing(&self) -> bool {
        match self {
            Cell::Null => true,
            Cell::Real(v) => v.is_nan(),
            _ => false,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Null => "null",
            Cell::Integer(_) => "integer",
            Cell::Real(_) => "real",
            Cell::Boolean(_) => "boolean",
            Cell::Text(_) => "text",
            Cell::Temporal(_) => "temporal",
        }
    }

    /// Canonical comparison key. Integral reals key like integers so that
    /// `1.0` and `1` count as the same value.
    pub fn key(&self) -> String {
        match self {
            Cell::Null => "\u{0}NULL".to_string(),
            Cell::Real(v) if v.is_nan() => "\u{0}NULL".to_string(),
            Cell::Real(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => format!("{}", *v as i64),
            other => other.to_string(),
        }
    }

    /// Rough heap + inline footprint, used for the memory estimate.
    pub fn footprint(&self) -> usize {
        let heap = match self {
            Cell::Text(s) => s.capacity(),
            _ => 0,
        };
        std::mem::size_of::<Cell>() + heap
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => write!(f, "NULL"),
            Cell::Integer(i) => write!(f, "{}", i),
            Cell::Real(v) => write!(f, "{}", v),
            Cell::Boolean(b) => write!(f, "{}", b),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Temporal(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Null => serializer.serialize_none(),
            Cell::Integer(i) => serializer.serialize_i64(*i),
            Cell::Real(v) if v.is_finite() => serializer.serialize_f64(*v),
            Cell::Real(_) => serializer.serialize_none(),
            Cell::Boolean(b) => serializer.serialize_bool(*b),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Temporal(t) => serializer.collect_str(&t.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Declared type of a result column, as reported by the data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Integer,
    Real,
    Boolean,
    Text,
    Blob,
    Temporal,
}

impl TypeTag {
    pub fn kind(self) -> ColumnKind {
        match self {
            TypeTag::Integer | TypeTag::Real => ColumnKind::Numeric,
            TypeTag::Boolean | TypeTag::Text | TypeTag::Blob => ColumnKind::Categorical,
            TypeTag::Temporal => ColumnKind::Temporal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Temporal,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
            ColumnKind::Temporal => "temporal",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub tag: TypeTag,
    pub values: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, tag: TypeTag, values: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            tag,
            values,
        }
    }

    pub fn kind(&self) -> ColumnKind {
        self.tag.kind()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Column-major query result. All columns share one length and names are unique.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularResult {
    columns: Vec<Column>,
}

impl TabularResult {
    pub fn new(columns: Vec<Column>) -> Result<Self, ProfileError> {
        let mut names = HashSet::new();
        let expected = columns.first().map_or(0, Column::len);

        for column in &columns {
            if !names.insert(column.name.as_str()) {
                return Err(ProfileError::DuplicateColumn {
                    name: column.name.clone(),
                });
            }
            if column.len() != expected {
                return Err(ProfileError::RaggedColumns {
                    column: column.name.clone(),
                    expected,
                    actual: column.len(),
                });
            }
        }

        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}
