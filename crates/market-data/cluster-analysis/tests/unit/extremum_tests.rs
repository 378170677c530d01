//! Extremum search and trim behavior over generated bucket lists

use cluster_analysis::extremum::{bucket_window, extremum_value, find_extremum};
use cluster_analysis::{
    ComparisonMode, Context, ExtremumParams, ExtremumPriceMode, ExtremumTrims, TradeHistogramBar,
    TradeStatisticsExtremumValueHandler, TradeStatisticsHandler, TradeStatisticsKind, TradeStatisticsSource,
    TradeStatisticsWithKind, TrimContext,
};
use common::TimeFrameUnit;
use proptest::prelude::*;
use rstest::*;
use test_utils::{SecurityFactory, assert_all_nan, buy, factory, lab_context, sell};

fn buckets(quantities: &[f64]) -> Vec<TradeHistogramBar> {
    quantities
        .iter()
        .enumerate()
        .map(|(i, quantity)| TradeHistogramBar {
            price_key: 100 + i as i64,
            trades_count: 1,
            quantity: *quantity,
            ask_quantity: *quantity,
            turnover: (100 + i) as f64 * quantity,
            price_sum: (100 + i) as f64,
            ..TradeHistogramBar::default()
        })
        .collect()
}

fn quantities() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1u32..100, 1..40).prop_map(|values| values.into_iter().map(f64::from).collect())
}

proptest! {
    #[test]
    fn prop_unwindowed_search_finds_largest_quantity(values in quantities(), mode in prop_oneof![
        Just(ExtremumPriceMode::Minimum),
        Just(ExtremumPriceMode::Maximum),
    ]) {
        let bars = buckets(&values);
        let params = ExtremumParams::new(mode, 0.0, 100.0);
        let (extremum, price) = find_extremum(&bars, TradeStatisticsKind::Quantity, &params, f64::NAN);

        let extremum = extremum.unwrap();
        let largest = values.iter().copied().fold(f64::MIN, f64::max);
        prop_assert_eq!(extremum.value, largest);
        prop_assert_eq!(price, extremum.price);
    }

    #[test]
    fn prop_tie_prefers_scan_start(values in quantities()) {
        let bars = buckets(&values);
        let largest = values.iter().copied().fold(f64::MIN, f64::max);
        let first = values.iter().position(|v| *v == largest).unwrap();
        let last = values.iter().rposition(|v| *v == largest).unwrap();

        let lowest = ExtremumParams::new(ExtremumPriceMode::Minimum, 0.0, 100.0);
        let (extremum, _) = find_extremum(&bars, TradeStatisticsKind::Quantity, &lowest, f64::NAN);
        prop_assert_eq!(extremum.unwrap().bar.price_key, bars[first].price_key);

        let highest = ExtremumParams::new(ExtremumPriceMode::Maximum, 0.0, 100.0);
        let (extremum, _) = find_extremum(&bars, TradeStatisticsKind::Quantity, &highest, f64::NAN);
        prop_assert_eq!(extremum.unwrap().bar.price_key, bars[last].price_key);
    }

    #[test]
    fn prop_window_stays_inside_list(len in 0usize..500, min in 0.0f64..100.0, span in 0.0f64..100.0) {
        let (first, last) = bucket_window(len, min, (min + span).min(100.0));
        prop_assert!(first <= len);
        prop_assert!(last <= len);
    }

    #[test]
    fn prop_narrower_window_stays_inside_wider(
        len in 0usize..500,
        cuts in prop::collection::vec(0.0f64..=100.0, 4),
    ) {
        let mut cuts = cuts;
        cuts.sort_by(f64::total_cmp);
        let (outer_first, outer_last) = bucket_window(len, cuts[0], cuts[3]);
        let (inner_first, inner_last) = bucket_window(len, cuts[1], cuts[2]);

        prop_assert!(outer_first <= inner_first);
        prop_assert!(inner_last <= outer_last);
        prop_assert!(inner_last.saturating_sub(inner_first) <= outer_last.saturating_sub(outer_first));
    }

    #[test]
    fn prop_closed_window_carries_last_price(
        values in prop::collection::vec(1u32..100, 2..40),
        mode in prop_oneof![Just(ExtremumPriceMode::Minimum), Just(ExtremumPriceMode::Maximum)],
        min in 0.0f64..=100.0,
    ) {
        let values: Vec<f64> = values.into_iter().map(f64::from).collect();
        let bars = buckets(&values);

        for params in [ExtremumParams::new(mode, 100.0, 100.0), ExtremumParams::new(mode, min, min)] {
            let (extremum, price) = find_extremum(&bars, TradeStatisticsKind::Quantity, &params, 42.0);
            prop_assert!(extremum.is_none());
            prop_assert_eq!(price, 42.0);
        }
    }

    #[test]
    fn prop_raising_greater_threshold_never_accepts_more(
        value in 0u32..1000,
        low in 0u32..1000,
        raise in 0u32..1000,
    ) {
        let bar = TradeHistogramBar {
            quantity: f64::from(value),
            ..TradeHistogramBar::default()
        };
        let trims = |threshold: u32| ExtremumTrims {
            quantity: TrimContext::new(f64::from(threshold), ComparisonMode::Greater),
            ..ExtremumTrims::default()
        };
        if trims(low + raise).accepts(&bar) {
            prop_assert!(trims(low).accepts(&bar));
        }
    }
}

#[rstest]
#[case(&[1.0, 5.0, 2.0], -3.0, 5.0)]
#[case(&[1.0, -6.0, 2.0], 5.0, -6.0)]
#[case(&[-2.0, 2.0], -2.0, 2.0)]
fn test_extremum_value_sign(#[case] deltas: &[f64], #[case] extra: f64, #[case] expected: f64) {
    let mut values = deltas.to_vec();
    values.push(extra);
    let bars: Vec<_> = values
        .iter()
        .map(|delta| TradeHistogramBar {
            ask_quantity: delta.max(0.0),
            bid_quantity: (-delta).max(0.0),
            ..TradeHistogramBar::default()
        })
        .collect();
    assert_eq!(
        extremum_value(&bars, TradeStatisticsKind::DeltaAskBidQuantity),
        Some(expected)
    );
}

fn daily_statistics(ctx: &Context, factory: &SecurityFactory, kind: TradeStatisticsKind) -> TradeStatisticsWithKind {
    let security = SecurityFactory::shared(factory.build_with_trades(vec![
        vec![buy(100.0, 4.0), sell(101.0, 1.0)],
        vec![sell(102.0, 9.0)],
        vec![buy(101.0, 3.0)],
    ]));
    let mut handler = TradeStatisticsHandler::default();
    handler.variable_id = "stats".to_string();
    handler.time_frame_unit = TimeFrameUnit::Day;
    handler.kind = kind;
    handler.execute(ctx, &security).unwrap()
}

#[rstest]
fn test_value_handler_follows_delta(lab_context: Context, factory: SecurityFactory) {
    let input = daily_statistics(&lab_context, &factory, TradeStatisticsKind::DeltaAskBidQuantity);
    let handler = TradeStatisticsExtremumValueHandler::new("value", 0.0, 100.0);

    let values = handler.execute(&lab_context, &input).unwrap();
    // Bucket 100 gains +4, bucket 101 nets -1 then +2, bucket 102 drops to -9
    assert_eq!(values, vec![4.0, -9.0, -9.0]);
}

#[rstest]
fn test_value_handler_carries_over_empty_window(lab_context: Context, factory: SecurityFactory) {
    let input = daily_statistics(&lab_context, &factory, TradeStatisticsKind::Quantity);
    let handler = TradeStatisticsExtremumValueHandler::new("value", 60.0, 70.0);

    let values = handler.execute(&lab_context, &input).unwrap();
    // Two buckets give the empty window [1, 1), three give [1, 2)
    assert!(values[0].is_nan());
    assert_eq!(values[1], 1.0);
    assert_eq!(values[2], 4.0);
}

#[rstest]
fn test_value_handler_without_trades(lab_context: Context, factory: SecurityFactory) {
    let security = SecurityFactory::shared(factory.build_flat(4, 100.0));
    let mut handler = TradeStatisticsHandler::default();
    handler.time_frame_unit = TimeFrameUnit::Day;
    let input = handler.execute(&lab_context, &security).unwrap();
    assert!(input.statistics().all_histograms_empty().unwrap());

    let values = TradeStatisticsExtremumValueHandler::new("value", 0.0, 100.0)
        .execute(&lab_context, &input)
        .unwrap();
    assert_eq!(values.len(), 4);
    assert_all_nan(&values);
}
