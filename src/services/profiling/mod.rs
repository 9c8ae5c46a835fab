//! Statistical profiling of a query result.
//!
//! [`Profiler::profile`] runs the query through a [`DataSource`], then
//! builds the overview, one profile per column, the numeric correlation
//! matrix and scatter samples for the most correlated pairs. Column
//! profiling failures abort the request; the correlation and sampling
//! stages only ever degrade to empty output.

pub mod column;
pub mod correlation;
pub mod normalize;
pub mod overview;
pub mod sampling;
mod scaled;
pub mod types;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::{instrument, warn};

use crate::error::{InsightError, ProfileError};
use crate::models::{ColumnKind, TabularResult};
use crate::services::data_source::DataSource;
use correlation::{Correlations, NumericSeries};
use normalize::Normalize;
pub use types::*;

pub struct Profiler<S> {
    source: S,
    seed: Option<u64>,
}

impl<S: DataSource> Profiler<S> {
    pub fn new(source: S) -> Self {
        Self { source, seed: None }
    }

    /// Fixes the interaction sampling seed. `None` draws from the OS.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    #[instrument(skip(self))]
    pub fn profile(&self, query: &str) -> Result<ProfileSummary, InsightError> {
        let result = self.source.execute(query)?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(profile_result(&result, &mut rng)?)
    }
}

/// Profiles an already materialized result.
pub fn profile_result<R: Rng + ?Sized>(
    result: &TabularResult,
    rng: &mut R,
) -> Result<ProfileSummary, ProfileError> {
    if result.column_count() == 0 {
        return Err(ProfileError::NoColumns);
    }

    let overview = overview::compute_overview(result);

    let columns = result
        .columns()
        .iter()
        .map(column::profile_column)
        .collect::<Result<Vec<_>, _>>()?;

    let series: Vec<NumericSeries> = result
        .columns()
        .iter()
        .filter(|c| c.kind() == ColumnKind::Numeric)
        .map(NumericSeries::from_column)
        .collect();

    let Correlations { matrix, pairs } = if series.len() >= 2 {
        correlation::correlate(&series).unwrap_or_else(|e| {
            warn!("correlation stage skipped: {}", e);
            Correlations::default()
        })
    } else {
        Correlations::default()
    };

    let strong_correlations = pairs.iter().filter(|p| p.is_strong()).cloned().collect();

    let interactions = if series.len() >= 2 && !pairs.is_empty() {
        sample_interactions(&series, &pairs, rng)
    } else {
        Vec::new()
    };

    let summary = ProfileSummary {
        overview,
        columns,
        correlation_matrix: matrix,
        correlations: pairs,
        strong_correlations,
        interactions,
    };

    Ok(summary.normalize())
}

fn sample_interactions<R: Rng + ?Sized>(
    series: &[NumericSeries],
    pairs: &[CorrelationEntry],
    rng: &mut R,
) -> Vec<InteractionSample> {
    let by_name: HashMap<&str, &NumericSeries> =
        series.iter().map(|s| (s.name.as_str(), s)).collect();

    correlation::strongest(pairs, INTERACTION_PAIRS)
        .into_iter()
        .filter_map(|pair| {
            let (Some(x), Some(y), Some(r)) = (
                by_name.get(pair.col1.as_str()),
                by_name.get(pair.col2.as_str()),
                pair.correlation,
            ) else {
                warn!("no series for pair {} / {}, skipping sample", pair.col1, pair.col2);
                return None;
            };
            Some(sampling::sample_pair(&pair.col1, &pair.col2, r, &x.values, &y.values, rng))
        })
        .collect()
}
