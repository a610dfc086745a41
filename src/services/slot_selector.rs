//! Slot selection
//!
//! 给定槽位和内容类型，决定渲染哪些站点、按什么顺序。
//! 所有失败都在这里降级为空列表，渲染层只需要处理 `Vec`。

use std::cmp::Reverse;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use rand::seq::SliceRandom;
use tracing::{debug, error, warn};

use super::reciprocity::ReciprocityAggregator;
use crate::errors::Result;
use crate::storage::models::MAX_SLOT;
use crate::storage::{
    ContentType, FeedItem, OrderMode, Site, SiteId, SiteRegistry, SlotConfig, SlotConfigStore,
    SlotRequest,
};
use crate::utils::url_normalizer::permalink_key;

/// RSS 槽位最多合并几个站点的条目
pub const MAX_FEED_SITES_PER_SLOT: usize = 3;

/// 外部 RSS 抓取
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_items(&self, site: &Site, limit: usize) -> Result<Vec<FeedItem>>;
}

pub struct SlotSelector {
    registry: Arc<dyn SiteRegistry>,
    configs: Arc<dyn SlotConfigStore>,
    aggregator: Arc<ReciprocityAggregator>,
    config_cache: Cache<(u8, ContentType), SlotConfig>,
}

impl SlotSelector {
    /// 槽位配置缓存时长取自 `cache.slot_config_ttl_secs`
    pub fn new(
        registry: Arc<dyn SiteRegistry>,
        configs: Arc<dyn SlotConfigStore>,
        aggregator: Arc<ReciprocityAggregator>,
    ) -> Self {
        let ttl = Duration::from_secs(crate::config::get_config().cache.slot_config_ttl_secs);
        Self::with_config_ttl(registry, configs, aggregator, ttl)
    }

    pub fn with_config_ttl(
        registry: Arc<dyn SiteRegistry>,
        configs: Arc<dyn SlotConfigStore>,
        aggregator: Arc<ReciprocityAggregator>,
        config_ttl: Duration,
    ) -> Self {
        let config_cache = Cache::builder()
            .max_capacity(u64::from(MAX_SLOT) * 2)
            .time_to_live(config_ttl)
            .build();
        Self {
            registry,
            configs,
            aggregator,
            config_cache,
        }
    }

    /// 按槽位配置选出站点
    ///
    /// `slot` 会被钳制到 1..=10；`display_limit` 为 0 时不访问任何存储。
    pub async fn select_sites(
        &self,
        slot: i64,
        content_type: ContentType,
        config: &SlotConfig,
    ) -> Vec<Site> {
        let config = config.sanitized();
        if config.is_disabled() {
            return Vec::new();
        }
        let slot = SlotRequest::new(slot, content_type).clamped_slot();

        let mut candidates = match self
            .registry
            .list_approved_by_slot(slot, content_type)
            .await
        {
            Ok(sites) => sites,
            Err(e) => {
                error!(
                    "Failed to load candidates for {} slot {}: {}",
                    content_type, slot, e
                );
                return Vec::new();
            }
        };
        candidates.retain(|s| s.eligible_for(slot, content_type));
        if candidates.is_empty() {
            return candidates;
        }

        self.order(&mut candidates, &config).await;
        candidates.truncate(usize::from(config.display_limit));

        debug!(
            "Selected {} site(s) for {} slot {} ({})",
            candidates.len(),
            content_type,
            slot,
            config.order_mode
        );
        candidates
    }

    async fn order(&self, sites: &mut [Site], config: &SlotConfig) {
        match config.order_mode {
            OrderMode::Alphabetical => sites.sort_by(|a, b| {
                a.name
                    .to_lowercase()
                    .cmp(&b.name.to_lowercase())
                    .then(a.id.cmp(&b.id))
            }),
            OrderMode::Newest => sites.sort_by_key(|s| Reverse(s.id)),
            OrderMode::Oldest => sites.sort_by_key(|s| s.id),
            OrderMode::Random => sites.shuffle(&mut rand::rng()),
            OrderMode::PriorityWeighted => {
                let ids: Vec<SiteId> = sites.iter().map(|s| s.id).collect();
                let priorities = self
                    .aggregator
                    .compute_priorities(&ids, config.period_days)
                    .await;
                // 先打乱再稳定排序：同分站点每次调用顺序不同
                sites.shuffle(&mut rand::rng());
                sites.sort_by_key(|s| Reverse(priorities.get(&s.id).copied().unwrap_or(0)));
            }
        }
    }

    /// 显式指定站点，跳过归属和排序
    pub async fn select_override(&self, site_id: SiteId) -> Vec<Site> {
        if site_id <= 0 {
            return Vec::new();
        }
        match self.registry.get_by_id(site_id).await {
            Ok(Some(site)) if site.is_approved() => vec![site],
            Ok(_) => Vec::new(),
            Err(e) => {
                error!("Failed to load site {}: {}", site_id, e);
                Vec::new()
            }
        }
    }

    /// 渲染入口：带站点 id 走覆盖路径，否则读取槽位配置后选择
    pub async fn select_for_slot(&self, request: SlotRequest) -> Vec<Site> {
        if let Some(site_id) = request.site_id.filter(|id| *id > 0) {
            return self.select_override(site_id).await;
        }
        let slot = request.clamped_slot();
        let config = self.slot_config(slot, request.content_type).await;
        self.select_sites(i64::from(slot), request.content_type, &config)
            .await
    }

    /// 读取槽位配置，缺失或出错时使用默认值（出错时不缓存）
    pub async fn slot_config(&self, slot: u8, content_type: ContentType) -> SlotConfig {
        let key = (slot, content_type);
        if let Some(config) = self.config_cache.get(&key).await {
            return config;
        }

        match self.configs.load(slot, content_type).await {
            Ok(stored) => {
                let config = stored.unwrap_or_default().sanitized();
                self.config_cache.insert(key, config.clone()).await;
                config
            }
            Err(e) => {
                warn!(
                    "Failed to load config for {} slot {}, using defaults: {}",
                    content_type, slot, e
                );
                SlotConfig::default()
            }
        }
    }

    /// 配置变更后丢弃缓存的槽位配置
    pub async fn invalidate_slot_config(&self, slot: u8, content_type: ContentType) {
        self.config_cache.invalidate(&(slot, content_type)).await;
    }

    /// RSS 槽位：选站点后合并各自的 feed 条目
    ///
    /// 最多取 `MAX_FEED_SITES_PER_SLOT` 个站点；同一链接只保留最新的一条，
    /// 按发布时间倒序截取 `item_limit` 条。单个源失败只影响它自己。
    pub async fn select_feed_items(
        &self,
        slot: i64,
        config: &SlotConfig,
        source: &dyn FeedSource,
    ) -> Vec<FeedItem> {
        let config = config.sanitized();
        let item_limit = usize::from(config.item_limit);
        if item_limit == 0 {
            return Vec::new();
        }

        let mut sites = self.select_sites(slot, ContentType::Rss, &config).await;
        sites.truncate(MAX_FEED_SITES_PER_SLOT);

        let mut collected = Vec::new();
        for site in &sites {
            match source.fetch_items(site, item_limit).await {
                Ok(items) => collected.extend(items),
                Err(e) => warn!("Feed for site {} ({}) failed: {}", site.id, site.name, e),
            }
        }

        merge_feed_items(collected, item_limit)
    }
}

/// 按文章链接去重（保留最新），时间倒序，截断
pub fn merge_feed_items(items: Vec<FeedItem>, limit: usize) -> Vec<FeedItem> {
    let mut latest: HashMap<String, FeedItem> = HashMap::with_capacity(items.len());
    for item in items {
        let key = permalink_key(&item.url).unwrap_or_else(|| item.url.trim().to_string());
        match latest.entry(key) {
            Entry::Occupied(mut slot) => {
                if item.published_at > slot.get().published_at {
                    slot.insert(item);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
        }
    }

    let mut merged: Vec<FeedItem> = latest.into_values().collect();
    merged.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| a.url.cmp(&b.url))
    });
    merged.truncate(limit);
    merged
}
