use rand::seq::index;
use rand::Rng;

use super::types::{InteractionSample, Point, INTERACTION_POINTS};

/// Draws up to [`INTERACTION_POINTS`] `(x, y)` points, uniformly and without
/// replacement, from the rows where both values are present. Points keep
/// their row order.
pub fn sample_pair<R: Rng + ?Sized>(
    col1: &str,
    col2: &str,
    correlation: f64,
    xs: &[Option<f64>],
    ys: &[Option<f64>],
    rng: &mut R,
) -> InteractionSample {
    let available: Vec<Point> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(Point { x: (*x)?, y: (*y)? }))
        .collect();

    let amount = available.len().min(INTERACTION_POINTS);
    let data = if amount == available.len() {
        available
    } else {
        let mut picked = index::sample(rng, available.len(), amount).into_vec();
        picked.sort_unstable();
        picked.into_iter().map(|i| available[i]).collect()
    };

    InteractionSample {
        col1: col1.to_string(),
        col2: col2.to_string(),
        correlation,
        data,
    }
}
