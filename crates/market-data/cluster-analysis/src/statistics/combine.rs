//! Sliding stacks of histograms

use super::histogram::TradeHistogram;
use super::trade_statistics::{TradeStatisticsSource, TradeStatisticsWithKind};
use crate::context::Context;
use crate::error::{ClusterError, ClusterResult};
use crate::histogram::TradeHistogramsCache;
use crate::keys::handler_id;
use common::TimeFrameUnit;
use rayon::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Statistic whose histogram `i` stacks input histograms
/// `[max(0, i - period + 1), i]`
#[derive(Debug)]
pub struct TradeStatisticsCombine {
    id: String,
    state_id: String,
    period: usize,
    input: Arc<dyn TradeStatisticsSource>,
    histograms: Vec<Arc<TradeHistogram>>,
}

impl TradeStatisticsCombine {
    /// Stack `input` histograms `period` at a time
    ///
    /// # Errors
    /// [`ClusterError::InvalidArgument`] for a zero period; histogram cache
    /// failures while merging.
    pub fn new(
        id: impl Into<String>,
        state_id: impl Into<String>,
        period: usize,
        input: Arc<dyn TradeStatisticsSource>,
    ) -> ClusterResult<Self> {
        if period == 0 {
            return Err(ClusterError::invalid_argument("period", period));
        }

        let histograms = stack(input.histograms(), period);

        let pending: Vec<_> = histograms.iter().filter(|h| !h.is_calculated()).collect();
        debug!(period, pending = pending.len(), "Recalculating combined histograms");
        pending.par_iter().try_for_each(|histogram| histogram.recalculate())?;

        Ok(Self {
            id: id.into(),
            state_id: state_id.into(),
            period,
            input,
            histograms,
        })
    }

    /// Stack depth
    #[must_use]
    pub const fn period(&self) -> usize {
        self.period
    }
}

fn stack(input: &[Arc<TradeHistogram>], period: usize) -> Vec<Arc<TradeHistogram>> {
    let mut window: VecDeque<&Arc<TradeHistogram>> = VecDeque::with_capacity(period);
    let mut histograms = Vec::with_capacity(input.len());
    for histogram in input {
        if window.len() >= period {
            window.pop_front();
        }
        window.push_back(histogram);
        if let (Some(front), Some(back)) = (window.front(), window.back()) {
            histograms.push(Arc::new(TradeHistogram::combined(front, back)));
        }
    }
    histograms
}

impl TradeStatisticsSource for TradeStatisticsCombine {
    fn id(&self) -> &str {
        &self.id
    }

    fn state_id(&self) -> &str {
        &self.state_id
    }

    fn histograms(&self) -> &[Arc<TradeHistogram>] {
        &self.histograms
    }

    fn has_static_timeline(&self) -> bool {
        self.input.has_static_timeline()
    }

    fn cache(&self) -> &Arc<TradeHistogramsCache> {
        self.input.cache()
    }

    fn time_frame_unit(&self) -> TimeFrameUnit {
        self.input.time_frame_unit()
    }
}

/// Handler producing a [`TradeStatisticsCombine`] per pass
#[derive(Debug, Clone)]
pub struct TradeStatisticsCombineHandler {
    /// Host variable id
    pub variable_id: String,
    /// Stack depth
    pub period: usize,
}

impl TradeStatisticsCombineHandler {
    /// Handler stacking `period` histograms
    pub fn new(variable_id: impl Into<String>, period: usize) -> Self {
        Self {
            variable_id: variable_id.into(),
            period,
        }
    }

    /// Combined statistics for `input`, memoized per pass by state id
    ///
    /// # Errors
    /// See [`TradeStatisticsCombine::new`].
    pub fn execute(&self, ctx: &Context, input: &TradeStatisticsWithKind) -> ClusterResult<TradeStatisticsWithKind> {
        let id = handler_id(ctx.runtime(), &self.variable_id);
        let state_id = format!("{}.{}", input.statistics().state_id(), self.period);
        let source = input.statistics().clone();
        let statistics = ctx.get_trade_statistics(&state_id, || {
            let combined = TradeStatisticsCombine::new(id, state_id.clone(), self.period, source)?;
            Ok(Arc::new(combined) as Arc<dyn TradeStatisticsSource>)
        })?;
        Ok(TradeStatisticsWithKind::new(statistics, input.kind()))
    }
}
