//! Integration tests for shared caches under concurrent readers

use anyhow::Result;
use chrono::Duration;
use cluster_analysis::{
    AlignedSecurity, CacheService, Context, RuntimeInfo, Security, TradeHistogramsCache, TradeStatisticsHandler,
    TradeStatisticsSource,
};
use common::TimeFrameUnit;
use rayon::prelude::*;
use rstest::*;
use std::sync::Arc;
use std::thread;
use test_utils::{SecurityFactory, factory, init_test_logging};

const READERS: usize = 8;

#[rstest]
fn test_concurrent_aligned_readers_share_one_view(factory: SecurityFactory) -> Result<()> {
    init_test_logging();
    let offsets: Vec<i64> = (0..200).filter(|offset| offset % 3 != 1).collect();
    let source = SecurityFactory::shared(factory.build_at(&offsets, 100.0));
    let aligned = AlignedSecurity::new(source, Duration::hours(1))?;

    let views = thread::scope(|scope| {
        let handles: Vec<_> = (0..READERS).map(|_| scope.spawn(|| aligned.aligned_bars())).collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("reader panicked"))
            .collect::<Result<Vec<_>, _>>()
    })?;

    assert!(aligned.is_bars_loaded());
    assert!(views.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    // 10:00 to 13:19 spans four whole hours
    assert_eq!(views[0].len(), 240);
    Ok(())
}

#[rstest]
fn test_parallel_histograms_match_sequential(factory: SecurityFactory) -> Result<()> {
    let security = SecurityFactory::shared(factory.build_random(300, 12, 100.0));
    let parallel = TradeHistogramsCache::new(security.clone(), 2)?;
    let sequential = TradeHistogramsCache::new(security, 2)?;

    let from_threads: Vec<_> = (0..300usize)
        .into_par_iter()
        .map(|index| parallel.histogram(index).map(|h| h.buckets().to_vec()))
        .collect::<Result<_, _>>()?;

    for (index, buckets) in from_threads.iter().enumerate() {
        assert_eq!(buckets, sequential.histogram(index)?.buckets());
    }
    Ok(())
}

#[rstest]
fn test_registry_hands_out_one_cache_per_key(factory: SecurityFactory) -> Result<()> {
    let services = CacheService::new();
    let security = SecurityFactory::shared(factory.build_flat(50, 100.0));

    let caches = thread::scope(|scope| {
        let handles: Vec<_> = (0..READERS)
            .map(|_| scope.spawn(|| services.histogram_caches().get(&security, 1)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("registry reader panicked"))
            .collect::<Result<Vec<_>, _>>()
    })?;

    assert_eq!(services.histogram_caches().len(), 1);
    assert!(caches.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    Ok(())
}

#[rstest]
fn test_statistics_memo_under_contention(factory: SecurityFactory) -> Result<()> {
    let security: Arc<dyn Security> = SecurityFactory::shared(factory.build_random(120, 4, 100.0));
    let ctx = Context::new(Arc::new(CacheService::new())).with_runtime(RuntimeInfo::new("Lab"));
    let mut handler = TradeStatisticsHandler::default();
    handler.variable_id = "stats".to_string();
    handler.time_frame = 15;
    handler.time_frame_unit = TimeFrameUnit::Minute;

    let results = thread::scope(|scope| {
        let handles: Vec<_> = (0..READERS)
            .map(|_| scope.spawn(|| handler.execute(&ctx, &security)))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("handler panicked"))
            .collect::<Result<Vec<_>, _>>()
    })?;

    let first = results[0].statistics();
    assert!(results.iter().all(|result| Arc::ptr_eq(result.statistics(), first)));
    assert_eq!(first.histograms().len(), 8);
    Ok(())
}
