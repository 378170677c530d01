//! Extremum price handlers

use super::price::{ExtremumParams, find_extremum};
use super::trim::ExtremumTrims;
use crate::context::Context;
use crate::derivative_cache::DerivativeRun;
use crate::error::ClusterResult;
use crate::statistics::{TradeStatisticsSource, TradeStatisticsWithKind};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Per-bar price of the bucket with the largest absolute statistic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStatisticsExtremumPriceHandler {
    /// Host variable id
    pub variable_id: String,
    /// Search direction and window
    #[serde(flatten)]
    pub params: ExtremumParams,
}

impl TradeStatisticsExtremumPriceHandler {
    /// Handler without trims
    #[must_use]
    pub fn new(variable_id: impl Into<String>, params: ExtremumParams) -> Self {
        Self {
            variable_id: variable_id.into(),
            params,
        }
    }

    /// One extremum price per bar of the statistics' cache
    ///
    /// # Errors
    /// Histogram cache failures.
    pub fn execute(&self, ctx: &Context, input: &TradeStatisticsWithKind) -> ClusterResult<Vec<f64>> {
        execute_extremum_prices(
            ctx,
            &self.variable_id,
            input,
            &self.params,
            &ExtremumTrims::default(),
            self.params.state_id(),
        )
    }
}

/// Extremum price handler that only moves when the selected bucket passes
/// its trims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeStatisticsExtendedExtremumPriceHandler {
    /// Host variable id
    pub variable_id: String,
    /// Search direction and window
    #[serde(flatten)]
    pub params: ExtremumParams,
    /// Filters on the selected bucket
    #[serde(default)]
    pub trims: ExtremumTrims,
}

impl TradeStatisticsExtendedExtremumPriceHandler {
    /// Handler with trims on the selected bucket
    #[must_use]
    pub fn new(variable_id: impl Into<String>, params: ExtremumParams, trims: ExtremumTrims) -> Self {
        Self {
            variable_id: variable_id.into(),
            params,
            trims,
        }
    }

    /// `{params}.{trims}` fingerprint
    #[must_use]
    pub fn parameters_state_id(&self) -> String {
        format!("{}.{}", self.params.state_id(), self.trims.state_id())
    }

    /// One extremum price per bar of the statistics' cache; NaN throughout
    /// when an active trim has a NaN threshold
    ///
    /// # Errors
    /// Histogram cache failures.
    pub fn execute(&self, ctx: &Context, input: &TradeStatisticsWithKind) -> ClusterResult<Vec<f64>> {
        execute_extremum_prices(
            ctx,
            &self.variable_id,
            input,
            &self.params,
            &self.trims,
            self.parameters_state_id(),
        )
    }
}

fn execute_extremum_prices(
    ctx: &Context,
    variable_id: &str,
    input: &TradeStatisticsWithKind,
    params: &ExtremumParams,
    trims: &ExtremumTrims,
    parameters_state_id: String,
) -> ClusterResult<Vec<f64>> {
    let statistics = input.statistics();
    let bars_count = statistics.bars_count();

    if trims.is_invalid() {
        warn!(variable_id, "Trim threshold is NaN, extremum price is undefined");
        return Ok(vec![f64::NAN; bars_count]);
    }
    let Some(range) = statistics.histograms_bar_indexes() else {
        return Ok(vec![f64::NAN; bars_count]);
    };
    if statistics.all_histograms_empty()? {
        return Ok(vec![f64::NAN; bars_count]);
    }

    let state_id = format!("{parameters_state_id}.{}", statistics.state_id());
    let run = DerivativeRun::begin(Some(ctx), statistics.as_ref(), variable_id, state_id);
    let kind = input.kind();
    let mut last_price = run.last_value();
    let mut provider = statistics.aggregated_bars_provider();

    run.fill(Some(range), |index, last| {
        let buckets = provider.aggregated_bars(index)?;
        let (extremum, price) = find_extremum(&buckets, kind, params, last_price);
        last_price = price;
        Ok(match extremum {
            Some(extremum) if trims.accepts(&extremum.bar) => last_price,
            _ => last,
        })
    })
}
