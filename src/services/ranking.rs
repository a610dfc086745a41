//! Network ranking
//!
//! 排行榜（按 IN 排序）以及不绑定槽位的「优先站点」抽取。

use std::cmp::Reverse;
use std::sync::Arc;

use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::debug;

use super::reciprocity::ReciprocityAggregator;
use crate::errors::Result;
use crate::storage::{ContentType, Site, SiteId, SiteRegistry};

/// 优先站点抽取时先在前 N 名中随机
pub const SHUFFLE_POOL_SIZE: usize = 10;

/// 排行榜条数上限
pub const MAX_RANKING_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
    pub site: Site,
    pub total_in: u64,
    pub total_out: u64,
}

pub struct RankingService {
    registry: Arc<dyn SiteRegistry>,
    aggregator: Arc<ReciprocityAggregator>,
    period_days: u32,
}

impl RankingService {
    /// 抽取优先站点的周期取自 `ranking.period_days`
    pub fn new(registry: Arc<dyn SiteRegistry>, aggregator: Arc<ReciprocityAggregator>) -> Self {
        let period_days = crate::config::get_config().ranking.period_days;
        Self {
            registry,
            aggregator,
            period_days,
        }
    }

    pub fn with_period(mut self, period_days: u32) -> Self {
        self.period_days = period_days.max(1);
        self
    }

    /// 已审核站点按窗口内 IN 降序（同分按 id 升序），最多 `limit` 条（1..=100）
    pub async fn ranking(&self, period_days: u32, limit: usize) -> Result<Vec<RankingEntry>> {
        let limit = limit.clamp(1, MAX_RANKING_LIMIT);
        let sites = self.registry.list_approved().await?;
        if sites.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<SiteId> = sites.iter().map(|s| s.id).collect();
        let totals = self.aggregator.site_totals(&ids, period_days).await?;

        let mut entries: Vec<RankingEntry> = sites
            .into_iter()
            .map(|site| {
                let t = totals.get(&site.id).copied().unwrap_or_default();
                RankingEntry {
                    site,
                    total_in: t.total_in,
                    total_out: t.total_out,
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            b.total_in
                .cmp(&a.total_in)
                .then(a.site.id.cmp(&b.site.id))
        });
        entries.truncate(limit);
        Ok(entries)
    }

    /// 全网优先站点
    ///
    /// 按回访需求降序（同分 id 降序）排好后，前 `SHUFFLE_POOL_SIZE` 名打乱，
    /// 从中取 `limit` 个；不够时按顺序从剩余站点补足。
    pub async fn prioritized_sites(
        &self,
        content_type: ContentType,
        limit: usize,
    ) -> Result<Vec<Site>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut sites: Vec<Site> = self
            .registry
            .list_approved()
            .await?
            .into_iter()
            .filter(|s| content_type == ContentType::Link || s.has_feed())
            .collect();
        if sites.is_empty() {
            return Ok(sites);
        }

        let priorities = self
            .aggregator
            .compute_registry_priorities(self.period_days)
            .await;
        sites.sort_by_key(|s| {
            (
                Reverse(priorities.get(&s.id).copied().unwrap_or(0)),
                Reverse(s.id),
            )
        });

        let pool_size = sites.len().min(SHUFFLE_POOL_SIZE);
        sites[..pool_size].shuffle(&mut rand::rng());
        sites.truncate(limit);

        debug!(
            "Prioritized {} {} site(s) from a pool of {}",
            sites.len(),
            content_type,
            pool_size
        );
        Ok(sites)
    }
}
