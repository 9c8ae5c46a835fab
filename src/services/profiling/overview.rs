use std::collections::HashSet;

use super::types::DatasetOverview;
use crate::models::{Cell, TabularResult};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub fn compute_overview(result: &TabularResult) -> DatasetOverview {
    DatasetOverview {
        row_count: result.row_count(),
        column_count: result.column_count(),
        memory_usage: memory_usage(result),
        duplicate_rows: count_duplicate_rows(result),
    }
}

/// Approximate size of the materialized result, in megabytes.
fn memory_usage(result: &TabularResult) -> f64 {
    let bytes: usize = result
        .columns()
        .iter()
        .map(|c| c.name.capacity() + c.values.iter().map(Cell::footprint).sum::<usize>())
        .sum();
    bytes as f64 / BYTES_PER_MB
}

/// Rows equal to an earlier row in every column. Two missing values compare
/// equal. The first occurrence is not counted.
fn count_duplicate_rows(result: &TabularResult) -> usize {
    let rows = result.row_count();
    if rows <= 1 {
        return 0;
    }

    let mut seen = HashSet::with_capacity(rows);
    (0..rows)
        .filter(|&row| !seen.insert(row_key(result, row)))
        .count()
}

fn row_key(result: &TabularResult, row: usize) -> String {
    result
        .columns()
        .iter()
        .map(|c| c.values[row].key())
        .collect::<Vec<_>>()
        .join("\u{1F}")
}
