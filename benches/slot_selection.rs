//! 槽位选择性能基准测试

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use reaccess::cache::{AggregateCache, MokaAggregateCache, NullAggregateCache};
use reaccess::services::{ReciprocityAggregator, SlotSelector};
use reaccess::storage::{
    ContentType, CounterMetric, CounterStore, MemoryStorage, OrderMode, Site, SiteStatus,
    SlotConfig, SlotSet,
};

async fn populate(store: &MemoryStorage, sites: i64) {
    let today = Utc::now().date_naive();
    for id in 1..=sites {
        store
            .insert_site(Site {
                id,
                name: format!("site-{}", id),
                display_url: format!("https://site{}.example", id),
                rss_url: None,
                description: String::new(),
                link_slots: SlotSet::parse_csv("1"),
                rss_slots: SlotSet::new(),
                status: SiteStatus::Approved,
                created_at: Utc::now(),
            })
            .await;
        for _ in 0..(id % 7) {
            store
                .increment_daily(id, today, CounterMetric::In)
                .await
                .unwrap();
        }
    }
}

fn selector(store: Arc<MemoryStorage>, cache: Arc<dyn AggregateCache>) -> SlotSelector {
    let aggregator = Arc::new(
        ReciprocityAggregator::new(store.clone(), store.clone(), cache)
            .with_ttls(Duration::from_secs(1200), Duration::from_secs(600)),
    );
    SlotSelector::with_config_ttl(store.clone(), store, aggregator, Duration::from_secs(60))
}

// ============== 排序方式 ==============

fn bench_order_modes(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(MemoryStorage::new());
    rt.block_on(populate(&store, 200));
    let selector = Arc::new(selector(store, Arc::new(NullAggregateCache)));

    let mut group = c.benchmark_group("select_sites");
    for mode in [
        OrderMode::Alphabetical,
        OrderMode::Newest,
        OrderMode::Random,
        OrderMode::PriorityWeighted,
    ] {
        let config = SlotConfig::new(5, mode);
        group.bench_with_input(BenchmarkId::from_parameter(mode), &config, |b, config| {
            b.to_async(&rt).iter(|| {
                let s = Arc::clone(&selector);
                let config = config.clone();
                async move {
                    let sites = s.select_sites(1, ContentType::Link, &config).await;
                    assert_eq!(sites.len(), 5);
                }
            });
        });
    }
    group.finish();
}

// ============== 聚合缓存命中 ==============

fn bench_priority_cache_hit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = Arc::new(MemoryStorage::new());
    rt.block_on(populate(&store, 200));
    let selector = Arc::new(selector(
        store,
        Arc::new(MokaAggregateCache::with_capacity(1000)),
    ));
    let config = SlotConfig::new(5, OrderMode::PriorityWeighted);

    // 预热缓存
    rt.block_on(selector.select_sites(1, ContentType::Link, &config));

    c.bench_function("select_sites/priority_weighted_cached", |b| {
        b.to_async(&rt).iter(|| {
            let s = Arc::clone(&selector);
            let config = config.clone();
            async move {
                s.select_sites(1, ContentType::Link, &config).await;
            }
        });
    });
}

criterion_group!(benches, bench_order_modes, bench_priority_cache_hit);
criterion_main!(benches);
