//! Signed extremum of the statistic itself

use super::price::bucket_window;
use crate::context::Context;
use crate::derivative_cache::DerivativeRun;
use crate::error::ClusterResult;
use crate::histogram::TradeHistogramBar;
use crate::statistics::{TradeStatisticsKind, TradeStatisticsSource, TradeStatisticsWithKind};
use common::constants::{PERCENT_MAX, PERCENT_MIN};
use serde::{Deserialize, Serialize};

/// Value of `kind` farthest from zero over `bars`; positive values win
/// ties on magnitude
#[must_use]
pub fn extremum_value(bars: &[TradeHistogramBar], kind: TradeStatisticsKind) -> Option<f64> {
    let mut values = bars.iter().map(|bar| kind.value(bar));
    let first = values.next()?;
    let (mut max, mut min) = (first, first);
    for value in values {
        if max < value {
            max = value;
        } else if min > value {
            min = value;
        }
    }
    Some(if max.abs() >= min.abs() { max } else { min })
}

/// Per-bar extremum of the statistic over the accumulated buckets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStatisticsExtremumValueHandler {
    /// Host variable id
    pub variable_id: String,
    /// Buckets below this share of the list are skipped
    pub min_bar_pct: f64,
    /// Buckets at or above this share of the list are skipped
    pub max_bar_pct: f64,
}

impl TradeStatisticsExtremumValueHandler {
    /// Handler over the `[min_bar_pct, max_bar_pct)` bucket window
    #[must_use]
    pub fn new(variable_id: impl Into<String>, min_bar_pct: f64, max_bar_pct: f64) -> Self {
        Self {
            variable_id: variable_id.into(),
            min_bar_pct,
            max_bar_pct,
        }
    }

    fn is_trimmed(&self) -> bool {
        self.min_bar_pct > PERCENT_MIN || self.max_bar_pct < PERCENT_MAX
    }

    /// One value per bar of the statistics' cache
    ///
    /// # Errors
    /// Histogram cache failures.
    pub fn execute(&self, ctx: &Context, input: &TradeStatisticsWithKind) -> ClusterResult<Vec<f64>> {
        let statistics = input.statistics();
        let bars_count = statistics.bars_count();
        let Some(range) = statistics.histograms_bar_indexes() else {
            return Ok(vec![f64::NAN; bars_count]);
        };
        if statistics.all_histograms_empty()? {
            return Ok(vec![f64::NAN; bars_count]);
        }

        let state_id = format!("{}.{}.{}", statistics.state_id(), self.min_bar_pct, self.max_bar_pct);
        let run = DerivativeRun::begin(Some(ctx), statistics.as_ref(), &self.variable_id, state_id);
        let kind = input.kind();
        let trimmed = self.is_trimmed();
        let mut provider = statistics.aggregated_bars_provider();

        run.fill(Some(range), |index, last| {
            let buckets = provider.aggregated_bars(index)?;
            let window = if trimmed {
                let (min, max) = bucket_window(buckets.len(), self.min_bar_pct, self.max_bar_pct);
                buckets.get(min..max).unwrap_or_default()
            } else {
                &buckets[..]
            };
            Ok(extremum_value(window, kind).unwrap_or(last))
        })
    }
}
