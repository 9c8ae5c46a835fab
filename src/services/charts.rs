use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::AppError;
use crate::models::{Cell, TabularResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

impl FromStr for ChartKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "line" => Ok(ChartKind::Line),
            "bar" => Ok(ChartKind::Bar),
            other => Err(AppError::ChartError(format!(
                "Unsupported chart type: {}. Only 'line' and 'bar' charts are supported.",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartRequest {
    #[serde(rename = "type")]
    pub chart_type: String,
    pub x: String,
    pub y: String,
    #[serde(default)]
    pub title: String,
}

/// Column names resolved once per result: exact match first, then
/// case-insensitive.
#[derive(Debug)]
pub struct ColumnLookup {
    exact: HashMap<String, usize>,
    folded: HashMap<String, usize>,
}

impl ColumnLookup {
    pub fn new(names: &[String]) -> Self {
        let mut exact = HashMap::with_capacity(names.len());
        let mut folded = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            exact.entry(name.clone()).or_insert(i);
            folded.entry(name.to_lowercase()).or_insert(i);
        }
        Self { exact, folded }
    }

    pub fn resolve(&self, key: &str) -> Option<usize> {
        self.exact
            .get(key)
            .or_else(|| self.folded.get(&key.to_lowercase()))
            .copied()
    }
}

/// Column indices for the two axes. A `*_fallback` flag is set when the
/// requested name was not found and the positional default was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisBinding {
    pub x: usize,
    pub y: usize,
    pub x_fallback: bool,
    pub y_fallback: bool,
}

/// Binds `x` and `y` to result columns. Unknown names fall back to the first
/// and second column; `None` if the result is too narrow for that.
pub fn bind_axes(names: &[String], x: &str, y: &str) -> Option<AxisBinding> {
    let lookup = ColumnLookup::new(names);

    let (x, x_fallback) = match lookup.resolve(x) {
        Some(i) => (i, false),
        None if !names.is_empty() => (0, true),
        None => return None,
    };
    let (y, y_fallback) = match lookup.resolve(y) {
        Some(i) => (i, false),
        None if names.len() > 1 => (1, true),
        None => return None,
    };

    Some(AxisBinding {
        x,
        y,
        x_fallback,
        y_fallback,
    })
}

/// Plotly-ready trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotSeries {
    pub x: Vec<Cell>,
    pub y: Vec<f64>,
    #[serde(rename = "type")]
    pub trace_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    pub name: String,
}

/// Builds a trace from the bound columns. Rows missing either value are
/// skipped; y values that are not numbers plot as zero. `None` when no row
/// survives.
pub fn plot_series(
    result: &TabularResult,
    kind: ChartKind,
    binding: AxisBinding,
    title: &str,
) -> Option<PlotSeries> {
    let columns = result.columns();
    let xs = &columns.get(binding.x)?.values;
    let ys = &columns.get(binding.y)?.values;

    let (x, y): (Vec<Cell>, Vec<f64>) = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| !x.is_missing() && !y.is_missing())
        .map(|(x, y)| (x.clone(), coerce_y(y)))
        .unzip();

    if x.is_empty() {
        return None;
    }

    let (trace_type, mode) = match kind {
        ChartKind::Line => ("scatter", Some("lines")),
        ChartKind::Bar => ("bar", None),
    };

    Some(PlotSeries {
        x,
        y,
        trace_type,
        mode,
        name: title.to_string(),
    })
}

fn coerce_y(cell: &Cell) -> f64 {
    match cell {
        Cell::Integer(i) => *i as f64,
        Cell::Real(v) if v.is_finite() => *v,
        Cell::Boolean(b) => f64::from(u8::from(*b)),
        Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    }
}
