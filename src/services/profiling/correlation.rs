use polars::prelude::ChunkAgg;

use super::scaled::ScaledSeries;
use super::types::{CorrelationEntry, CorrelationMatrix};
use crate::error::ProfileError;
use crate::models::{Cell, Column};

/// A numeric column reduced to its finite values; `None` marks a missing row.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl NumericSeries {
    pub fn from_column(column: &Column) -> Self {
        let values = column
            .values
            .iter()
            .map(|cell| match cell {
                Cell::Integer(i) => Some(*i as f64),
                Cell::Real(v) if v.is_finite() => Some(*v),
                _ => None,
            })
            .collect();

        Self {
            name: column.name.clone(),
            values,
        }
    }
}

/// Output of [`correlate`]: the square matrix and the upper-triangle pair list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Correlations {
    pub matrix: Option<CorrelationMatrix>,
    pub pairs: Vec<CorrelationEntry>,
}

/// Pairwise-complete Pearson correlation over every pair of numeric series.
///
/// Pairs are listed once each, `col1` declared before `col2`. With fewer
/// than two series both outputs are empty.
pub fn correlate(series: &[NumericSeries]) -> Result<Correlations, ProfileError> {
    if series.len() < 2 {
        return Ok(Correlations::default());
    }

    let expected = series[0].values.len();
    if let Some(bad) = series.iter().find(|s| s.values.len() != expected) {
        return Err(ProfileError::RaggedColumns {
            column: bad.name.clone(),
            expected,
            actual: bad.values.len(),
        });
    }

    let n = series.len();
    let mut data = vec![vec![None; n]; n];
    let mut pairs = Vec::with_capacity(n * (n - 1) / 2);

    for i in 0..n {
        data[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let r = pearson(&series[i].values, &series[j].values);
            data[i][j] = r;
            data[j][i] = r;
            pairs.push(CorrelationEntry {
                col1: series[i].name.clone(),
                col2: series[j].name.clone(),
                correlation: r,
            });
        }
    }

    Ok(Correlations {
        matrix: Some(CorrelationMatrix {
            columns: series.iter().map(|s| s.name.clone()).collect(),
            data,
        }),
        pairs,
    })
}

/// Pearson coefficient over rows where both sides are present. Undefined
/// (`None`) with fewer than two such rows or when either side is constant.
pub fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> Option<f64> {
    let (px, py): (Vec<f64>, Vec<f64>) = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();

    if px.len() < 2 {
        return None;
    }

    let (x, y) = (ScaledSeries::new("x", &px), ScaledSeries::new("y", &py));
    if x.is_constant() || y.is_constant() {
        return None;
    }

    // Scaled magnitudes stay below 2, so the sums cannot overflow.
    let (dx, dy) = (x.centered()?, y.centered()?);
    let sxy = (&dx * &dy).sum()?;
    let sxx = (&dx * &dx).sum()?;
    let syy = (&dy * &dy).sum()?;

    if sxx == 0.0 || syy == 0.0 {
        return None;
    }

    let r = sxy / (sxx * syy).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// The `limit` pairs with the largest |r|, ties kept in pair-list order.
/// Pairs without a coefficient are never ranked.
pub fn strongest(pairs: &[CorrelationEntry], limit: usize) -> Vec<&CorrelationEntry> {
    let mut ranked: Vec<&CorrelationEntry> =
        pairs.iter().filter(|p| p.correlation.is_some()).collect();
    ranked.sort_by(|a, b| {
        let a = a.correlation.unwrap_or_default().abs();
        let b = b.correlation.unwrap_or_default().abs();
        b.total_cmp(&a)
    });
    ranked.truncate(limit);
    ranked
}
