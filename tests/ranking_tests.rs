//! RankingService tests

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reaccess::cache::NullAggregateCache;
use reaccess::services::{RankingService, ReciprocityAggregator, SHUFFLE_POOL_SIZE};
use reaccess::storage::{
    ContentType, CounterMetric, CounterStore, MemoryStorage, Site, SiteId, SiteStatus, SlotSet,
};

fn site(id: SiteId, feed: bool) -> Site {
    Site {
        id,
        name: format!("site-{}", id),
        display_url: format!("https://site{}.example", id),
        rss_url: feed.then(|| format!("https://site{}.example/feed", id)),
        description: String::new(),
        link_slots: SlotSet::new(),
        rss_slots: SlotSet::new(),
        status: SiteStatus::Approved,
        created_at: Utc::now(),
    }
}

async fn hits(store: &MemoryStorage, id: SiteId, ins: u32, outs: u32) {
    let today = Utc::now().date_naive();
    for _ in 0..ins {
        store.increment_daily(id, today, CounterMetric::In).await.unwrap();
    }
    for _ in 0..outs {
        store.increment_daily(id, today, CounterMetric::Out).await.unwrap();
    }
}

fn service(store: Arc<MemoryStorage>) -> RankingService {
    let aggregator = Arc::new(
        ReciprocityAggregator::new(store.clone(), store.clone(), Arc::new(NullAggregateCache))
            .with_ttls(Duration::from_secs(1200), Duration::from_secs(600)),
    );
    RankingService::new(store, aggregator).with_period(7)
}

#[tokio::test]
async fn test_ranking_orders_by_inbound() {
    let store = Arc::new(MemoryStorage::new());
    for id in 1..=4 {
        store.insert_site(site(id, false)).await;
    }
    let mut hidden = site(5, false);
    hidden.status = SiteStatus::Rejected;
    store.insert_site(hidden).await;

    hits(&store, 1, 2, 9).await;
    hits(&store, 2, 7, 0).await;
    hits(&store, 3, 2, 0).await;
    hits(&store, 5, 50, 0).await;

    let entries = service(store).ranking(7, 10).await.unwrap();
    let order: Vec<(SiteId, u64, u64)> = entries
        .iter()
        .map(|e| (e.site.id, e.total_in, e.total_out))
        .collect();

    // 同为 2 次 IN 时按 id 升序
    assert_eq!(order, vec![(2, 7, 0), (1, 2, 9), (3, 2, 0), (4, 0, 0)]);
}

#[tokio::test]
async fn test_ranking_limit_is_clamped() {
    let store = Arc::new(MemoryStorage::new());
    for id in 1..=3 {
        store.insert_site(site(id, false)).await;
    }
    let ranking = service(store);

    assert_eq!(ranking.ranking(7, 0).await.unwrap().len(), 1);
    assert_eq!(ranking.ranking(7, 2).await.unwrap().len(), 2);
    assert_eq!(ranking.ranking(7, 1000).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_ranking_empty_registry() {
    let ranking = service(Arc::new(MemoryStorage::new()));
    assert!(ranking.ranking(7, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_prioritized_sites_draw_from_top_pool() {
    let store = Arc::new(MemoryStorage::new());
    for id in 1..=15 {
        store.insert_site(site(id, false)).await;
        hits(&store, id, id as u32, 0).await;
    }
    let ranking = service(store);

    // 回访需求最高的 10 个：6..=15
    let pool: HashSet<SiteId> = (6..=15).collect();
    let mut seen = HashSet::new();
    for _ in 0..100 {
        let picked = ranking.prioritized_sites(ContentType::Link, 4).await.unwrap();
        assert_eq!(picked.len(), 4);
        for s in picked {
            assert!(pool.contains(&s.id), "site {} outside the pool", s.id);
            seen.insert(s.id);
        }
    }
    assert!(seen.len() > 4);
}

#[tokio::test]
async fn test_prioritized_sites_tops_up_past_pool() {
    let store = Arc::new(MemoryStorage::new());
    let total = SHUFFLE_POOL_SIZE + 3;
    for id in 1..=total as SiteId {
        store.insert_site(site(id, false)).await;
        hits(&store, id, id as u32, 0).await;
    }

    let picked = service(store)
        .prioritized_sites(ContentType::Link, SHUFFLE_POOL_SIZE + 2)
        .await
        .unwrap();

    let ids: Vec<SiteId> = picked.iter().map(|s| s.id).collect();
    // 池外按优先级顺序补足
    assert_eq!(ids[SHUFFLE_POOL_SIZE..], [3, 2]);
}

#[tokio::test]
async fn test_prioritized_rss_requires_feed() {
    let store = Arc::new(MemoryStorage::new());
    store.insert_site(site(1, true)).await;
    store.insert_site(site(2, false)).await;

    let picked = service(store)
        .prioritized_sites(ContentType::Rss, 5)
        .await
        .unwrap();
    assert_eq!(picked.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1]);
}
