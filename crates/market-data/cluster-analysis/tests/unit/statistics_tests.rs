//! Time-frame layout, combined windows and accumulated buckets

use chrono::Duration;
use cluster_analysis::{
    AggregatedHistogramBarsProvider, AlignedSecurity, ClusterError, Context, Security, TradeStatisticsCombineHandler,
    TradeStatisticsHandler, TradeStatisticsSource, TradeStatisticsWithKind,
};
use common::{TimeFrameKind, TimeFrameUnit};
use rstest::*;
use std::sync::Arc;
use test_utils::{SecurityFactory, buy, factory, lab_context, sell, session_start};

fn minute_handler(time_frame: u32, kind: TimeFrameKind) -> TradeStatisticsHandler {
    let mut handler = TradeStatisticsHandler::default();
    handler.variable_id = "stats".to_string();
    handler.time_frame = time_frame;
    handler.time_frame_unit = TimeFrameUnit::Minute;
    handler.time_frame_kind = kind;
    handler
}

fn layout(statistics: &TradeStatisticsWithKind) -> Vec<(usize, usize, usize)> {
    statistics
        .statistics()
        .histograms()
        .iter()
        .map(|h| (h.real_first_bar_index(), h.first_bar_index(), h.last_bar_index()))
        .collect()
}

fn summary(provider: &mut AggregatedHistogramBarsProvider<'_>, index: usize) -> Vec<(i64, f64)> {
    provider
        .aggregated_bars(index)
        .unwrap()
        .iter()
        .map(|bar| (bar.price_key, bar.quantity))
        .collect()
}

#[rstest]
fn test_hourly_histograms_from_midnight(lab_context: Context, factory: SecurityFactory) {
    let security = SecurityFactory::shared(factory.build_flat(90, 100.0));
    let mut handler = TradeStatisticsHandler::default();
    handler.variable_id = "stats".to_string();

    let statistics = handler.execute(&lab_context, &security).unwrap();
    assert_eq!(layout(&statistics), vec![(0, 0, 59), (60, 60, 89)]);

    let histograms = statistics.statistics().histograms();
    assert_eq!(histograms[1].low_date(), session_start() + Duration::hours(1));
    assert_eq!(histograms[1].high_date(), session_start() + Duration::hours(2));
    assert_eq!(statistics.statistics().histograms_bar_indexes(), Some((0, 89)));
}

#[rstest]
fn test_gaps_split_midnight_histograms(lab_context: Context, factory: SecurityFactory) {
    let security = SecurityFactory::shared(factory.build_at(&[0, 1, 7, 8, 9, 21], 100.0));
    let statistics = minute_handler(5, TimeFrameKind::FromMidnightToNow)
        .execute(&lab_context, &security)
        .unwrap();

    // 10:00-10:05, 10:05-10:10, 10:20-10:25
    assert_eq!(layout(&statistics), vec![(0, 0, 1), (2, 2, 4), (5, 5, 5)]);
}

#[rstest]
fn test_trailing_windows(lab_context: Context, factory: SecurityFactory) {
    let security = SecurityFactory::shared(factory.build_flat(6, 100.0));
    let statistics = minute_handler(3, TimeFrameKind::FromNowToPast)
        .execute(&lab_context, &security)
        .unwrap();

    assert_eq!(
        layout(&statistics),
        vec![(0, 0, 0), (0, 1, 1), (0, 2, 2), (1, 3, 3), (2, 4, 4), (3, 5, 5)]
    );
    assert_eq!(statistics.statistics().time_frame_unit(), TimeFrameUnit::Minute);
}

#[rstest]
fn test_top_time_frame_limits_bars(lab_context: Context, factory: SecurityFactory) {
    let security = SecurityFactory::shared(factory.build_flat(90, 100.0));
    let mut handler = minute_handler(1, TimeFrameKind::FromMidnightToNow);
    handler.use_top_time_frame = true;
    handler.top_time_frame = 1;
    handler.top_time_frame_unit = TimeFrameUnit::Hour;

    let statistics = handler.execute(&lab_context, &security).unwrap();
    let histograms = statistics.statistics().histograms();
    assert_eq!(histograms.len(), 30);
    assert_eq!(statistics.statistics().histograms_bar_indexes(), Some((60, 89)));
    assert!(!statistics.statistics().has_static_timeline());
}

#[rstest]
fn test_start_time_skips_earlier_bars(lab_context: Context, factory: SecurityFactory) {
    let security = SecurityFactory::shared(factory.build_flat(90, 100.0));
    let mut handler = minute_handler(30, TimeFrameKind::FromMidnightToNow);
    handler.start_time = Some(session_start() + Duration::minutes(30));

    let statistics = handler.execute(&lab_context, &security).unwrap();
    assert_eq!(layout(&statistics), vec![(30, 30, 59), (60, 60, 89)]);
}

#[rstest]
#[case(5, 3, 5)]
#[case(1, 0, 1)]
#[case(0, 0, 0)]
#[case(2, 0, 2)]
fn test_combine_window_start(
    lab_context: Context,
    factory: SecurityFactory,
    #[case] index: usize,
    #[case] real_first: usize,
    #[case] first: usize,
) {
    let security = SecurityFactory::shared(factory.build_flat(8, 100.0));
    let input = minute_handler(1, TimeFrameKind::FromMidnightToNow)
        .execute(&lab_context, &security)
        .unwrap();
    let combined = TradeStatisticsCombineHandler::new("combine", 3)
        .execute(&lab_context, &input)
        .unwrap();

    let histogram = &combined.statistics().histograms()[index];
    assert_eq!(histogram.real_first_bar_index(), real_first);
    assert_eq!(histogram.first_bar_index(), first);
    assert_eq!(histogram.last_bar_index(), index);
}

#[rstest]
fn test_combine_is_memoized_and_keyed(lab_context: Context, factory: SecurityFactory) {
    let security = SecurityFactory::shared(factory.build_flat(4, 100.0));
    let input = minute_handler(1, TimeFrameKind::FromMidnightToNow)
        .execute(&lab_context, &security)
        .unwrap();

    let first = TradeStatisticsCombineHandler::new("combine", 2).execute(&lab_context, &input).unwrap();
    let again = TradeStatisticsCombineHandler::new("other", 2).execute(&lab_context, &input).unwrap();
    let deeper = TradeStatisticsCombineHandler::new("combine", 3).execute(&lab_context, &input).unwrap();

    assert!(Arc::ptr_eq(first.statistics(), again.statistics()));
    assert!(!Arc::ptr_eq(first.statistics(), deeper.statistics()));
    assert_eq!(first.statistics().state_id(), format!("{}.2", input.statistics().state_id()));
    assert_eq!(first.kind(), input.kind());
    assert!(Arc::ptr_eq(first.statistics().cache(), input.statistics().cache()));
}

#[rstest]
fn test_combine_rejects_zero_period(lab_context: Context, factory: SecurityFactory) {
    let security = SecurityFactory::shared(factory.build_flat(2, 100.0));
    let input = minute_handler(1, TimeFrameKind::FromMidnightToNow)
        .execute(&lab_context, &security)
        .unwrap();

    let result = TradeStatisticsCombineHandler::new("combine", 0).execute(&lab_context, &input);
    assert!(matches!(result, Err(ClusterError::InvalidArgument { .. })));
}

#[rstest]
fn test_provider_accumulates_inside_histogram(lab_context: Context, factory: SecurityFactory) {
    let security = SecurityFactory::shared(factory.build_with_trades(vec![
        vec![buy(100.0, 1.0)],
        vec![buy(100.0, 2.0), sell(101.0, 1.0)],
        vec![sell(101.0, 5.0)],
        vec![buy(102.0, 1.0)],
    ]));
    let statistics = minute_handler(3, TimeFrameKind::FromMidnightToNow)
        .execute(&lab_context, &security)
        .unwrap();
    assert_eq!(layout(&statistics), vec![(0, 0, 2), (3, 3, 3)]);

    let source = statistics.statistics();
    let mut provider = source.aggregated_bars_provider();

    assert_eq!(summary(&mut provider, 0), vec![(100, 1.0)]);
    assert_eq!(summary(&mut provider, 1), vec![(100, 3.0), (101, 1.0)]);
    assert_eq!(summary(&mut provider, 2), vec![(100, 3.0), (101, 6.0)]);
    // Next histogram starts over
    assert_eq!(summary(&mut provider, 3), vec![(102, 1.0)]);
    // Going back restarts the accumulation
    assert_eq!(summary(&mut provider, 1), vec![(100, 3.0), (101, 1.0)]);
}

#[rstest]
fn test_provider_over_combined_window(lab_context: Context, factory: SecurityFactory) {
    let security = SecurityFactory::shared(factory.build_with_trades(vec![
        vec![buy(100.0, 1.0)],
        vec![buy(100.0, 2.0)],
        vec![buy(100.0, 4.0)],
    ]));
    let input = minute_handler(1, TimeFrameKind::FromMidnightToNow)
        .execute(&lab_context, &security)
        .unwrap();
    let combined = TradeStatisticsCombineHandler::new("combine", 2)
        .execute(&lab_context, &input)
        .unwrap();

    let source = combined.statistics();
    let mut provider = source.aggregated_bars_provider();
    let totals: Vec<f64> = (0..3)
        .map(|index| provider.aggregated_bars(index).unwrap().iter().map(|bar| bar.quantity).sum())
        .collect();
    assert_eq!(totals, vec![1.0, 3.0, 6.0]);
}

#[rstest]
#[case(60, TimeFrameUnit::Minute, 1, TimeFrameUnit::Hour, true)]
#[case(90, TimeFrameUnit::Minute, 1, TimeFrameUnit::Hour, false)]
#[case(1, TimeFrameUnit::Month, 1, TimeFrameUnit::Week, true)]
#[case(2, TimeFrameUnit::Week, 1, TimeFrameUnit::Week, true)]
#[case(1, TimeFrameUnit::Day, 7, TimeFrameUnit::Hour, false)]
fn test_top_time_frame_validation(
    #[case] top: u32,
    #[case] top_unit: TimeFrameUnit,
    #[case] time_frame: u32,
    #[case] unit: TimeFrameUnit,
    #[case] accepted: bool,
) {
    let mut handler = TradeStatisticsHandler::default();
    handler.time_frame = time_frame;
    handler.time_frame_unit = unit;
    handler.use_top_time_frame = true;
    handler.top_time_frame = top;
    handler.top_time_frame_unit = top_unit;

    match handler.top_time_frame() {
        Ok(value) => {
            assert!(accepted);
            assert_eq!(value, (top, top_unit));
        }
        Err(err) => {
            assert!(!accepted);
            assert!(matches!(err, ClusterError::InvalidTimeFrame { .. }));
        }
    }
}

#[rstest]
fn test_state_id_tracks_alignment(factory: SecurityFactory) {
    let security = SecurityFactory::shared(factory.build_flat(3, 100.0));
    let aligned: Arc<dyn Security> =
        Arc::new(AlignedSecurity::new(security.clone(), Duration::hours(1)).unwrap());
    let handler = TradeStatisticsHandler::default();

    let plain = handler.state_id(security.as_ref()).unwrap();
    let padded = handler.state_id(aligned.as_ref()).unwrap();
    assert!(plain.starts_with("TEST-memory.1.False.1."));
    assert!(padded.starts_with("TEST-memory.Aligned.1.True.1."));
}
