//! Reciprocity aggregation
//!
//! 回访需求 = max(0, 窗口内 IN - 窗口内 OUT)。窗口为以今天结尾、
//! 包含今天在内的 `period_days` 天。结果按 (种类, 周期, 站点集合) 缓存，
//! 计数写入时不主动失效，依赖 TTL 过期。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate, Utc};
use tracing::{debug, error, warn};

use crate::cache::{AggregateCache, AggregateKey, AggregateKind, AggregateSnapshot, canonical_ids};
use crate::errors::Result;
use crate::storage::{CounterStore, SiteId, SiteRegistry, SiteTotals};

/// 以 `today` 结尾的 `period_days` 天窗口（含两端）
pub fn trailing_window(today: NaiveDate, period_days: u32) -> (NaiveDate, NaiveDate) {
    let back = u64::from(period_days.max(1) - 1);
    let start = today.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);
    (start, today)
}

pub struct ReciprocityAggregator {
    counters: Arc<dyn CounterStore>,
    registry: Arc<dyn SiteRegistry>,
    cache: Arc<dyn AggregateCache>,
    subset_ttl: Duration,
    registry_ttl: Duration,
}

impl ReciprocityAggregator {
    /// TTL 取自全局配置的 `cache.subset_ttl_secs` / `cache.registry_ttl_secs`
    pub fn new(
        counters: Arc<dyn CounterStore>,
        registry: Arc<dyn SiteRegistry>,
        cache: Arc<dyn AggregateCache>,
    ) -> Self {
        let config = crate::config::get_config();
        Self {
            counters,
            registry,
            cache,
            subset_ttl: Duration::from_secs(config.cache.subset_ttl_secs),
            registry_ttl: Duration::from_secs(config.cache.registry_ttl_secs),
        }
    }

    pub fn with_ttls(mut self, subset_ttl: Duration, registry_ttl: Duration) -> Self {
        self.subset_ttl = subset_ttl;
        self.registry_ttl = registry_ttl;
        self
    }

    /// 计算一组站点的回访需求
    ///
    /// 结果包含每个去重后的输入 id，没有计数的站点为 0。
    /// 存储出错时记录错误并返回全 0，且不写入缓存。
    pub async fn compute_priorities(
        &self,
        site_ids: &[SiteId],
        period_days: u32,
    ) -> HashMap<SiteId, u64> {
        self.compute_priorities_at(site_ids, period_days, Utc::now().date_naive())
            .await
    }

    pub async fn compute_priorities_at(
        &self,
        site_ids: &[SiteId],
        period_days: u32,
        today: NaiveDate,
    ) -> HashMap<SiteId, u64> {
        self.priorities_with(
            AggregateKind::ReturnNeed,
            site_ids,
            period_days,
            self.subset_ttl,
            today,
        )
        .await
    }

    /// 全部已审核站点的回访需求
    pub async fn compute_registry_priorities(&self, period_days: u32) -> HashMap<SiteId, u64> {
        let sites = match self.registry.list_approved().await {
            Ok(sites) => sites,
            Err(e) => {
                error!("Failed to list approved sites for registry priorities: {}", e);
                return HashMap::new();
            }
        };
        let ids: Vec<SiteId> = sites.iter().map(|s| s.id).collect();

        self.priorities_with(
            AggregateKind::RegistryReturnNeed,
            &ids,
            period_days,
            self.registry_ttl,
            Utc::now().date_naive(),
        )
        .await
    }

    /// 窗口内 IN/OUT 合计（排行榜使用），存储错误向上返回
    pub async fn site_totals(
        &self,
        site_ids: &[SiteId],
        period_days: u32,
    ) -> Result<HashMap<SiteId, SiteTotals>> {
        if site_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.cached_totals(
            AggregateKind::Traffic,
            site_ids,
            period_days.max(1),
            self.registry_ttl,
            Utc::now().date_naive(),
        )
        .await
    }

    async fn priorities_with(
        &self,
        kind: AggregateKind,
        site_ids: &[SiteId],
        period_days: u32,
        ttl: Duration,
        today: NaiveDate,
    ) -> HashMap<SiteId, u64> {
        if site_ids.is_empty() {
            return HashMap::new();
        }
        let period_days = period_days.max(1);

        match self
            .cached_totals(kind, site_ids, period_days, ttl, today)
            .await
        {
            Ok(totals) => totals
                .into_iter()
                .map(|(id, t)| (id, t.return_need()))
                .collect(),
            Err(e) => {
                error!(
                    "Counter store unavailable, using zero priorities for {} sites: {}",
                    site_ids.len(),
                    e
                );
                canonical_ids(site_ids).into_iter().map(|id| (id, 0)).collect()
            }
        }
    }

    async fn cached_totals(
        &self,
        kind: AggregateKind,
        site_ids: &[SiteId],
        period_days: u32,
        ttl: Duration,
        today: NaiveDate,
    ) -> Result<HashMap<SiteId, SiteTotals>> {
        let ids = canonical_ids(site_ids);
        let key = AggregateKey::new(kind, period_days, &ids);

        if let Some(snapshot) = self.cache.get(&key).await {
            debug!("Aggregate cache hit: {}", key);
            return Ok(complete(snapshot.totals, &ids));
        }
        debug!("Aggregate cache miss: {}", key);

        let (start, end) = trailing_window(today, period_days);
        let summed = self.counters.sum_range(&ids, start, end).await?;
        if summed.keys().any(|id| ids.binary_search(id).is_err()) {
            warn!("Counter store returned totals for unrequested sites, ignoring them");
        }
        let totals = complete(summed, &ids);

        self.cache
            .set(&key, AggregateSnapshot::new(totals.clone()), ttl)
            .await;
        Ok(totals)
    }
}

/// 只保留请求的 id，并为缺失的 id 补 0
fn complete(
    mut totals: HashMap<SiteId, SiteTotals>,
    ids: &[SiteId],
) -> HashMap<SiteId, SiteTotals> {
    totals.retain(|id, _| ids.binary_search(id).is_ok());
    for id in ids {
        totals.entry(*id).or_default();
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trailing_window_includes_today() {
        assert_eq!(
            trailing_window(day(2026, 10, 16), 7),
            (day(2026, 10, 10), day(2026, 10, 16))
        );
        assert_eq!(
            trailing_window(day(2026, 3, 2), 3),
            (day(2026, 2, 28), day(2026, 3, 2))
        );
    }

    #[test]
    fn test_trailing_window_period_at_least_one() {
        let today = day(2026, 10, 16);
        assert_eq!(trailing_window(today, 0), (today, today));
        assert_eq!(trailing_window(today, 1), (today, today));
    }

    #[test]
    fn test_complete_fills_and_filters() {
        let totals = HashMap::from([(1, SiteTotals::new(4, 1)), (9, SiteTotals::new(1, 0))]);
        let done = complete(totals, &[1, 2]);
        assert_eq!(done.len(), 2);
        assert_eq!(done[&1], SiteTotals::new(4, 1));
        assert_eq!(done[&2], SiteTotals::default());
    }
}
