//! Alignment properties over random sparse minute series

use chrono::Duration;
use cluster_analysis::{AlignedSecurity, ClusterError, Security, VecSecurity, align_bars};
use common::{DataBar, DataIntervals, Interval};
use proptest::prelude::*;
use rstest::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use test_utils::{SecurityFactory, factory};

const PERIOD_MINUTES: i64 = 20;

fn sparse_series(offsets: &BTreeSet<i64>) -> Vec<Arc<DataBar>> {
    let factory = SecurityFactory::new();
    offsets
        .iter()
        .map(|offset| {
            Arc::new(DataBar::new(
                factory.date_at(*offset),
                *offset as f64,
                *offset as f64,
                *offset as f64,
                *offset as f64,
                1.0,
            ))
        })
        .collect()
}

proptest! {
    #[test]
    fn prop_every_source_bar_appears_once_in_order(offsets in prop::collection::btree_set(0i64..600, 2..60)) {
        let source = sparse_series(&offsets);
        let slots = align_bars(&source, Duration::minutes(1), Duration::minutes(PERIOD_MINUTES)).unwrap();

        let originals: Vec<usize> = slots.iter().filter_map(|slot| slot.original_index).collect();
        prop_assert_eq!(originals, (0..source.len()).collect::<Vec<_>>());
        for slot in slots.iter().filter(|slot| !slot.is_synthetic()) {
            let index = slot.original_index.unwrap();
            prop_assert!(Arc::ptr_eq(&slot.bar, &source[index]));
        }
    }

    #[test]
    fn prop_each_touched_period_is_fully_padded(offsets in prop::collection::btree_set(0i64..600, 2..60)) {
        let source = sparse_series(&offsets);
        let slots = align_bars(&source, Duration::minutes(1), Duration::minutes(PERIOD_MINUTES)).unwrap();

        let periods: BTreeSet<i64> = offsets.iter().map(|offset| offset / PERIOD_MINUTES).collect();
        prop_assert_eq!(slots.len() as i64, periods.len() as i64 * PERIOD_MINUTES);
        for pair in slots.windows(2) {
            prop_assert!(pair[0].bar.date < pair[1].bar.date);
        }
    }

    #[test]
    fn prop_synthetic_bars_carry_last_close(offsets in prop::collection::btree_set(1i64..600, 2..60)) {
        let source = sparse_series(&offsets);
        let slots = align_bars(&source, Duration::minutes(1), Duration::minutes(PERIOD_MINUTES)).unwrap();

        let mut last_close = f64::NAN;
        for slot in &slots {
            if slot.is_synthetic() {
                prop_assert!(slot.bar.close.is_nan() == last_close.is_nan());
                if !last_close.is_nan() {
                    prop_assert_eq!(slot.bar.close, last_close);
                }
                prop_assert_eq!(slot.bar.volume, 0.0);
            } else {
                last_close = slot.bar.close;
            }
        }
    }
}

#[rstest]
fn test_five_minute_gap_example(factory: SecurityFactory) {
    let factory = factory.with_interval(Interval::new(5, DataIntervals::Minute));
    let source = SecurityFactory::shared(factory.build_at(&[0, 1, 3], 100.0));
    let aligned = AlignedSecurity::new(source, Duration::minutes(20)).unwrap();

    let bars = aligned.aligned_bars().unwrap();
    let originals: Vec<_> = bars.slots().iter().map(|slot| slot.original_index).collect();
    assert_eq!(originals, vec![Some(0), Some(1), None, Some(2)]);
}

#[rstest]
fn test_single_bar_is_not_padded(factory: SecurityFactory) {
    let source = SecurityFactory::shared(factory.build_flat(1, 100.0));
    let aligned = AlignedSecurity::new(source, Duration::days(1)).unwrap();
    assert_eq!(aligned.bars().unwrap().len(), 1);
}

#[test]
fn test_duplicate_handle_is_fatal() {
    let factory = SecurityFactory::new();
    let other = Arc::new(DataBar::flat(factory.date_at(0), 100.0));
    let bar = Arc::new(DataBar::flat(factory.date_at(2), 100.0));
    let source: Arc<dyn Security> = Arc::new(VecSecurity::from_parts(
        "DUP",
        Interval::new(1, DataIntervals::Minute),
        vec![other, bar.clone(), bar],
        Vec::new(),
    ));

    let aligned = AlignedSecurity::new(source, Duration::minutes(20)).unwrap();
    let err = aligned.bars().unwrap_err();
    assert!(matches!(err, ClusterError::InvariantViolation { ref message } if message.contains("1 and 2")));
    assert!(!aligned.is_bars_loaded());
}

#[rstest]
fn test_aligned_trades_follow_original_bars(factory: SecurityFactory) {
    let trades = vec![
        vec![test_utils::buy(100.0, 1.0)],
        vec![test_utils::sell(101.0, 2.0), test_utils::buy(101.0, 1.0)],
    ];
    let source = factory.build_with_trades(trades);
    source.push_bar(DataBar::flat(factory.date_at(4), 101.0), Vec::new());
    let aligned = AlignedSecurity::new(SecurityFactory::shared(source), Duration::minutes(10)).unwrap();

    assert_eq!(aligned.trades(1).unwrap().len(), 2);
    assert!(aligned.trades(2).unwrap().is_empty());
    assert_eq!(aligned.trades_count(0, 9).unwrap(), 3);

    let per_bar = aligned.trades_per_bar(0, 4).unwrap();
    let counts: Vec<_> = per_bar.iter().map(|trades| trades.len()).collect();
    assert_eq!(counts, vec![1, 2, 0, 0, 0]);
}
