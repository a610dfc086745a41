//! SlotSelector tests
//!
//! Candidate filtering, the five order modes, overrides, slot config
//! lookup and RSS feed merging, all over `MemoryStorage`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use reaccess::cache::NullAggregateCache;
use reaccess::errors::{ReaccessError, Result};
use reaccess::services::{FeedSource, ReciprocityAggregator, SlotSelector};
use reaccess::storage::{
    ContentType, CounterMetric, CounterStore, FeedItem, MemoryStorage, NewSite, OrderMode, Site,
    SiteId, SiteRegistry, SiteStatus, SlotConfig, SlotConfigStore, SlotRelease, SlotRequest,
    SlotSet,
};

// =============================================================================
// Test Setup
// =============================================================================

fn site(id: SiteId, name: &str, link: &str, rss: &str, feed: Option<&str>) -> Site {
    Site {
        id,
        name: name.to_string(),
        display_url: format!("https://{}.example", name.to_lowercase()),
        rss_url: feed.map(str::to_string),
        description: String::new(),
        link_slots: SlotSet::parse_csv(link),
        rss_slots: SlotSet::parse_csv(rss),
        status: SiteStatus::Approved,
        created_at: Utc::now(),
    }
}

/// 记录 list_approved_by_slot 调用次数的注册表
struct CountingRegistry {
    inner: Arc<MemoryStorage>,
    slot_queries: AtomicUsize,
}

impl CountingRegistry {
    fn new(inner: Arc<MemoryStorage>) -> Self {
        Self {
            inner,
            slot_queries: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SiteRegistry for CountingRegistry {
    async fn list_approved_by_slot(
        &self,
        slot: u8,
        content_type: ContentType,
    ) -> Result<Vec<Site>> {
        self.slot_queries.fetch_add(1, Ordering::SeqCst);
        self.inner.list_approved_by_slot(slot, content_type).await
    }

    async fn list_approved(&self) -> Result<Vec<Site>> {
        self.inner.list_approved().await
    }

    async fn get_by_id(&self, id: SiteId) -> Result<Option<Site>> {
        self.inner.get_by_id(id).await
    }

    async fn list_slot_holders(
        &self,
        slot: u8,
        content_type: ContentType,
        excluding: SiteId,
    ) -> Result<Vec<Site>> {
        self.inner
            .list_slot_holders(slot, content_type, excluding)
            .await
    }

    async fn update_memberships(
        &self,
        id: SiteId,
        link_slots: &SlotSet,
        rss_slots: &SlotSet,
    ) -> Result<()> {
        self.inner.update_memberships(id, link_slots, rss_slots).await
    }

    async fn update_memberships_exclusive(
        &self,
        id: SiteId,
        link_slots: &SlotSet,
        rss_slots: &SlotSet,
    ) -> Result<Vec<SlotRelease>> {
        self.inner
            .update_memberships_exclusive(id, link_slots, rss_slots)
            .await
    }

    async fn create(&self, site: NewSite) -> Result<Site> {
        self.inner.create(site).await
    }

    async fn set_status(&self, id: SiteId, status: SiteStatus) -> Result<()> {
        self.inner.set_status(id, status).await
    }

    async fn delete(&self, id: SiteId) -> Result<bool> {
        self.inner.delete(id).await
    }
}

/// 总是失败的槽位配置存储
struct BrokenConfigStore;

#[async_trait]
impl SlotConfigStore for BrokenConfigStore {
    async fn load(&self, _slot: u8, _content_type: ContentType) -> Result<Option<SlotConfig>> {
        Err(ReaccessError::database_operation("disk I/O error"))
    }

    async fn save(
        &self,
        _slot: u8,
        _content_type: ContentType,
        _config: &SlotConfig,
    ) -> Result<()> {
        Err(ReaccessError::database_operation("disk I/O error"))
    }
}

struct Fixture {
    store: Arc<MemoryStorage>,
    registry: Arc<CountingRegistry>,
    selector: SlotSelector,
}

fn fixture_with(store: Arc<MemoryStorage>, configs: Arc<dyn SlotConfigStore>) -> Fixture {
    let registry = Arc::new(CountingRegistry::new(store.clone()));
    let aggregator = Arc::new(
        ReciprocityAggregator::new(store.clone(), registry.clone(), Arc::new(NullAggregateCache))
            .with_ttls(Duration::from_secs(1200), Duration::from_secs(600)),
    );
    let selector = SlotSelector::with_config_ttl(
        registry.clone(),
        configs,
        aggregator,
        Duration::from_secs(60),
    );
    Fixture {
        store,
        registry,
        selector,
    }
}

fn fixture() -> Fixture {
    let store = Arc::new(MemoryStorage::new());
    fixture_with(store.clone(), store)
}

async fn give_priority(store: &MemoryStorage, site_id: SiteId, need: u32) {
    let today = Utc::now().date_naive();
    for _ in 0..need {
        store
            .increment_daily(site_id, today, CounterMetric::In)
            .await
            .unwrap();
    }
}

fn ids(sites: &[Site]) -> Vec<SiteId> {
    sites.iter().map(|s| s.id).collect()
}

// =============================================================================
// Candidates
// =============================================================================

#[tokio::test]
async fn test_disabled_slot_does_not_query_registry() {
    let fx = fixture();
    fx.store.insert_site(site(1, "A", "1", "", None)).await;

    let config = SlotConfig::new(0, OrderMode::Newest);
    let sites = fx.selector.select_sites(1, ContentType::Link, &config).await;

    assert!(sites.is_empty());
    assert_eq!(fx.registry.slot_queries.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_only_approved_members_are_candidates() {
    let fx = fixture();
    fx.store.insert_site(site(1, "Member", "2", "", None)).await;
    fx.store.insert_site(site(2, "Elsewhere", "3", "", None)).await;
    let mut pending = site(3, "Pending", "2", "", None);
    pending.status = SiteStatus::Pending;
    fx.store.insert_site(pending).await;

    let config = SlotConfig::new(10, OrderMode::Newest);
    let sites = fx.selector.select_sites(2, ContentType::Link, &config).await;

    assert_eq!(ids(&sites), vec![1]);
}

#[tokio::test]
async fn test_rss_slot_requires_feed_url() {
    let fx = fixture();
    fx.store
        .insert_site(site(1, "Feed", "", "4", Some("https://feed.example/rss")))
        .await;
    fx.store.insert_site(site(2, "NoFeed", "", "4", None)).await;
    fx.store.insert_site(site(3, "Blank", "", "4", Some("  "))).await;

    let config = SlotConfig::new(10, OrderMode::Oldest);
    let sites = fx.selector.select_sites(4, ContentType::Rss, &config).await;

    assert_eq!(ids(&sites), vec![1]);
}

#[tokio::test]
async fn test_slot_number_is_clamped() {
    let fx = fixture();
    fx.store.insert_site(site(1, "Top", "10", "", None)).await;
    fx.store.insert_site(site(2, "Bottom", "1", "", None)).await;

    let config = SlotConfig::new(5, OrderMode::Newest);
    assert_eq!(
        ids(&fx.selector.select_sites(42, ContentType::Link, &config).await),
        vec![1]
    );
    assert_eq!(
        ids(&fx.selector.select_sites(-3, ContentType::Link, &config).await),
        vec![2]
    );
}

#[tokio::test]
async fn test_no_candidates_is_empty() {
    let fx = fixture();
    let config = SlotConfig::new(3, OrderMode::PriorityWeighted);
    assert!(fx.selector.select_sites(5, ContentType::Link, &config).await.is_empty());
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test]
async fn test_deterministic_orders() {
    let fx = fixture();
    fx.store.insert_site(site(1, "beta", "1", "", None)).await;
    fx.store.insert_site(site(2, "Alpha", "1", "", None)).await;
    fx.store.insert_site(site(3, "alpha", "1", "", None)).await;
    fx.store.insert_site(site(4, "Gamma", "1", "", None)).await;

    let select = |mode| {
        let config = SlotConfig::new(10, mode);
        let selector = &fx.selector;
        async move { ids(&selector.select_sites(1, ContentType::Link, &config).await) }
    };

    assert_eq!(select(OrderMode::Alphabetical).await, vec![2, 3, 1, 4]);
    assert_eq!(select(OrderMode::Newest).await, vec![4, 3, 2, 1]);
    assert_eq!(select(OrderMode::Oldest).await, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_limit_truncates_after_ordering() {
    let fx = fixture();
    for id in 1..=5 {
        fx.store.insert_site(site(id, &format!("S{}", id), "6", "", None)).await;
    }

    let config = SlotConfig::new(2, OrderMode::Oldest);
    let sites = fx.selector.select_sites(6, ContentType::Link, &config).await;
    assert_eq!(ids(&sites), vec![1, 2]);
}

#[tokio::test]
async fn test_random_order_returns_a_permutation() {
    let fx = fixture();
    for id in 1..=6 {
        fx.store.insert_site(site(id, &format!("S{}", id), "1", "", None)).await;
    }

    let config = SlotConfig::new(10, OrderMode::Random);
    let mut orders = HashSet::new();
    for _ in 0..50 {
        let mut picked = ids(&fx.selector.select_sites(1, ContentType::Link, &config).await);
        orders.insert(picked.clone());
        picked.sort();
        assert_eq!(picked, vec![1, 2, 3, 4, 5, 6]);
    }
    assert!(orders.len() > 1);
}

#[tokio::test]
async fn test_priority_weighted_ties_rotate() {
    let fx = fixture();
    fx.store.insert_site(site(1, "A", "3", "", None)).await;
    fx.store.insert_site(site(2, "B", "3", "", None)).await;
    fx.store.insert_site(site(3, "C", "3", "", None)).await;
    give_priority(&fx.store, 1, 10).await;
    give_priority(&fx.store, 2, 10).await;
    give_priority(&fx.store, 3, 5).await;

    let config = SlotConfig::new(2, OrderMode::PriorityWeighted);
    let trials = 1000;
    let mut pairs: HashMap<Vec<SiteId>, usize> = HashMap::new();
    for _ in 0..trials {
        let picked = ids(&fx.selector.select_sites(3, ContentType::Link, &config).await);
        assert!(!picked.contains(&3), "lower priority site must not appear");
        *pairs.entry(picked).or_insert(0) += 1;
    }

    assert_eq!(pairs.len(), 2, "unexpected orders: {:?}", pairs);
    for (order, count) in &pairs {
        let share = *count as f64 / trials as f64;
        assert!(share <= 0.7, "{:?} led {:.1}% of the time", order, share * 100.0);
    }
}

#[tokio::test]
async fn test_priority_weighted_keeps_highest_scores() {
    let fx = fixture();
    fx.store.insert_site(site(1, "Eight", "1", "", None)).await;
    fx.store.insert_site(site(2, "Three", "1", "", None)).await;
    fx.store.insert_site(site(3, "Zero", "1", "", None)).await;
    give_priority(&fx.store, 1, 8).await;
    give_priority(&fx.store, 2, 3).await;

    let config = SlotConfig::new(2, OrderMode::PriorityWeighted);
    for _ in 0..50 {
        let picked = ids(&fx.selector.select_sites(1, ContentType::Link, &config).await);
        assert_eq!(picked, vec![1, 2]);
    }
}

// =============================================================================
// Override and config lookup
// =============================================================================

#[tokio::test]
async fn test_override_returns_exactly_that_site() {
    let fx = fixture();
    fx.store.insert_site(site(7, "Pinned", "", "", None)).await;
    let mut pending = site(8, "Pending", "1", "", None);
    pending.status = SiteStatus::Pending;
    fx.store.insert_site(pending).await;

    assert_eq!(ids(&fx.selector.select_override(7).await), vec![7]);
    assert!(fx.selector.select_override(8).await.is_empty());
    assert!(fx.selector.select_override(99).await.is_empty());
    assert!(fx.selector.select_override(0).await.is_empty());
    assert!(fx.selector.select_override(-1).await.is_empty());
}

#[tokio::test]
async fn test_select_for_slot_uses_stored_config() {
    let fx = fixture();
    for id in 1..=4 {
        fx.store.insert_site(site(id, &format!("S{}", id), "2", "", None)).await;
    }
    fx.store
        .save(2, ContentType::Link, &SlotConfig::new(2, OrderMode::Oldest))
        .await
        .unwrap();

    let sites = fx
        .selector
        .select_for_slot(SlotRequest::new(2, ContentType::Link))
        .await;
    assert_eq!(ids(&sites), vec![1, 2]);
}

#[tokio::test]
async fn test_select_for_slot_override_wins() {
    let fx = fixture();
    fx.store.insert_site(site(1, "Member", "2", "", None)).await;
    fx.store.insert_site(site(2, "Pinned", "", "", None)).await;

    let sites = fx
        .selector
        .select_for_slot(SlotRequest::new(2, ContentType::Link).with_site(2))
        .await;
    assert_eq!(ids(&sites), vec![2]);
}

#[tokio::test]
async fn test_slot_config_defaults_when_missing() {
    let fx = fixture();
    assert_eq!(
        fx.selector.slot_config(1, ContentType::Rss).await,
        SlotConfig::default()
    );
}

#[tokio::test]
async fn test_slot_config_falls_back_on_store_error() {
    let store = Arc::new(MemoryStorage::new());
    for id in 1..=5 {
        store.insert_site(site(id, &format!("S{}", id), "1", "", None)).await;
    }
    let fx = fixture_with(store, Arc::new(BrokenConfigStore));

    let sites = fx
        .selector
        .select_for_slot(SlotRequest::new(1, ContentType::Link))
        .await;

    // 默认配置：newest，最多 3 个
    assert_eq!(ids(&sites), vec![5, 4, 3]);
}

#[tokio::test]
async fn test_slot_config_cache_and_invalidation() {
    let fx = fixture();
    fx.store
        .save(1, ContentType::Link, &SlotConfig::new(1, OrderMode::Oldest))
        .await
        .unwrap();
    assert_eq!(fx.selector.slot_config(1, ContentType::Link).await.display_limit, 1);

    fx.store
        .save(1, ContentType::Link, &SlotConfig::new(4, OrderMode::Oldest))
        .await
        .unwrap();
    assert_eq!(fx.selector.slot_config(1, ContentType::Link).await.display_limit, 1);

    fx.selector.invalidate_slot_config(1, ContentType::Link).await;
    assert_eq!(fx.selector.slot_config(1, ContentType::Link).await.display_limit, 4);
}

// =============================================================================
// RSS feed merge
// =============================================================================

/// 每个站点返回固定条目，`broken` 中的站点抓取失败
struct StaticFeeds {
    items: HashMap<SiteId, Vec<FeedItem>>,
    broken: HashSet<SiteId>,
    fetched: std::sync::Mutex<Vec<SiteId>>,
}

#[async_trait]
impl FeedSource for StaticFeeds {
    async fn fetch_items(&self, site: &Site, limit: usize) -> Result<Vec<FeedItem>> {
        self.fetched.lock().unwrap().push(site.id);
        if self.broken.contains(&site.id) {
            return Err(ReaccessError::feed_source("timed out"));
        }
        Ok(self
            .items
            .get(&site.id)
            .map(|items| items.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

fn feed_item(site_id: SiteId, url: &str, day: u32) -> FeedItem {
    FeedItem {
        site_id,
        title: url.to_string(),
        url: url.to_string(),
        published_at: Utc.with_ymd_and_hms(2026, 10, day, 12, 0, 0).unwrap(),
        image: None,
    }
}

#[tokio::test]
async fn test_feed_items_merge_across_sites() {
    let fx = fixture();
    for id in 1..=5 {
        fx.store
            .insert_site(site(
                id,
                &format!("F{}", id),
                "",
                "2",
                Some("https://feed.example/rss"),
            ))
            .await;
    }

    let feeds = StaticFeeds {
        items: HashMap::from([
            (5, vec![feed_item(5, "https://shared.example/post/", 3)]),
            (
                4,
                vec![
                    feed_item(4, "https://Shared.example/post#comments", 9),
                    feed_item(4, "https://four.example/a", 5),
                ],
            ),
            (2, vec![feed_item(2, "https://two.example/z", 10)]),
        ]),
        broken: HashSet::from([3]),
        fetched: std::sync::Mutex::new(Vec::new()),
    };

    let config = SlotConfig::new(10, OrderMode::Newest).with_item_limit(5);
    let items = fx.selector.select_feed_items(2, &config, &feeds).await;

    // newest 顺序取前 3 个站点：5, 4, 3（3 失败），站点 2 不参与
    assert_eq!(*feeds.fetched.lock().unwrap(), vec![5, 4, 3]);
    let urls: Vec<&str> = items.iter().map(|i| i.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://Shared.example/post#comments", "https://four.example/a"]
    );
}

#[tokio::test]
async fn test_feed_items_respect_item_limit() {
    let fx = fixture();
    fx.store
        .insert_site(site(1, "F", "", "1", Some("https://f.example/rss")))
        .await;
    let feeds = StaticFeeds {
        items: HashMap::from([(
            1,
            (1..=6)
                .map(|d| feed_item(1, &format!("https://f.example/{}", d), d))
                .collect(),
        )]),
        broken: HashSet::new(),
        fetched: std::sync::Mutex::new(Vec::new()),
    };

    let config = SlotConfig::new(3, OrderMode::Newest).with_item_limit(2);
    let items = fx.selector.select_feed_items(1, &config, &feeds).await;

    let days: Vec<NaiveDate> = items.iter().map(|i| i.published_at.date_naive()).collect();
    assert_eq!(
        days,
        vec![
            NaiveDate::from_ymd_opt(2026, 10, 2).unwrap(),
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        ]
    );
}
