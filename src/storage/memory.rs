//! 进程内存储
//!
//! 同时实现三个存储 trait，用于单元/集成测试和不需要持久化的场景。

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::RwLock;

use super::models::{
    ContentType, CounterMetric, DailyCounter, NewSite, Site, SiteId, SiteStatus, SiteTotals,
    SlotConfig, SlotRelease, SlotSet,
};
use super::{CounterStore, SiteRegistry, SlotConfigStore};
use crate::errors::{ReaccessError, Result};
use crate::utils::url_normalizer::normalize_display_url;

#[derive(Default)]
pub struct MemoryStorage {
    sites: RwLock<BTreeMap<SiteId, Site>>,
    counters: RwLock<HashMap<(SiteId, NaiveDate), DailyCounter>>,
    slot_configs: RwLock<HashMap<(u8, ContentType), SlotConfig>>,
    next_id: AtomicI64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接放入一个完整站点（保留其 id 和状态）
    pub async fn insert_site(&self, site: Site) {
        self.next_id.fetch_max(site.id, Ordering::SeqCst);
        self.sites.write().await.insert(site.id, site);
    }

    pub async fn daily_counter(&self, site_id: SiteId, day: NaiveDate) -> Option<DailyCounter> {
        self.counters.read().await.get(&(site_id, day)).cloned()
    }
}

#[async_trait]
impl CounterStore for MemoryStorage {
    async fn increment_daily(
        &self,
        site_id: SiteId,
        day: NaiveDate,
        metric: CounterMetric,
    ) -> Result<()> {
        let mut counters = self.counters.write().await;
        let row = counters
            .entry((site_id, day))
            .or_insert_with(|| DailyCounter {
                site_id,
                day,
                in_count: 0,
                out_count: 0,
            });
        match metric {
            CounterMetric::In => row.in_count += 1,
            CounterMetric::Out => row.out_count += 1,
        }
        Ok(())
    }

    async fn sum_range(
        &self,
        site_ids: &[SiteId],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<SiteId, SiteTotals>> {
        let counters = self.counters.read().await;
        let mut totals = HashMap::new();
        for row in counters.values() {
            if row.day < start || row.day > end || !site_ids.contains(&row.site_id) {
                continue;
            }
            let entry: &mut SiteTotals = totals.entry(row.site_id).or_default();
            entry.total_in += row.in_count;
            entry.total_out += row.out_count;
        }
        Ok(totals)
    }
}

/// 从 `id` 以外的站点收回指定槽位，调用方需持有写锁
fn release_held_slots(
    sites: &mut BTreeMap<SiteId, Site>,
    id: SiteId,
    link_slots: &SlotSet,
    rss_slots: &SlotSet,
) -> Vec<SlotRelease> {
    let mut releases = Vec::new();
    for (content_type, wanted) in [(ContentType::Link, link_slots), (ContentType::Rss, rss_slots)] {
        for slot in wanted.iter() {
            for other in sites.values_mut().filter(|s| s.id != id) {
                if other.slots_mut(content_type).remove(slot) {
                    releases.push(SlotRelease {
                        site_id: other.id,
                        slot,
                        content_type,
                    });
                }
            }
        }
    }
    releases
}

#[async_trait]
impl SiteRegistry for MemoryStorage {
    async fn list_approved_by_slot(
        &self,
        slot: u8,
        content_type: ContentType,
    ) -> Result<Vec<Site>> {
        let sites = self.sites.read().await;
        Ok(sites
            .values()
            .rev()
            .filter(|s| s.is_approved() && s.slots(content_type).contains(slot))
            .cloned()
            .collect())
    }

    async fn list_approved(&self) -> Result<Vec<Site>> {
        let sites = self.sites.read().await;
        Ok(sites
            .values()
            .rev()
            .filter(|s| s.is_approved())
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: SiteId) -> Result<Option<Site>> {
        Ok(self.sites.read().await.get(&id).cloned())
    }

    async fn list_slot_holders(
        &self,
        slot: u8,
        content_type: ContentType,
        excluding: SiteId,
    ) -> Result<Vec<Site>> {
        let sites = self.sites.read().await;
        Ok(sites
            .values()
            .filter(|s| s.id != excluding && s.slots(content_type).contains(slot))
            .cloned()
            .collect())
    }

    async fn update_memberships(
        &self,
        id: SiteId,
        link_slots: &SlotSet,
        rss_slots: &SlotSet,
    ) -> Result<()> {
        let mut sites = self.sites.write().await;
        let site = sites
            .get_mut(&id)
            .ok_or_else(|| ReaccessError::not_found(format!("站点不存在: {}", id)))?;
        site.link_slots = link_slots.clone();
        site.rss_slots = rss_slots.clone();
        Ok(())
    }

    /// 整个过程持有写锁，外部观察不到中间状态
    async fn update_memberships_exclusive(
        &self,
        id: SiteId,
        link_slots: &SlotSet,
        rss_slots: &SlotSet,
    ) -> Result<Vec<SlotRelease>> {
        let mut sites = self.sites.write().await;
        let target = sites
            .get_mut(&id)
            .ok_or_else(|| ReaccessError::not_found(format!("站点不存在: {}", id)))?;
        target.link_slots = link_slots.clone();
        target.rss_slots = rss_slots.clone();

        Ok(release_held_slots(&mut sites, id, link_slots, rss_slots))
    }

    async fn create(&self, new_site: NewSite) -> Result<Site> {
        if new_site.name.trim().is_empty() {
            return Err(ReaccessError::validation("站点名称不能为空"));
        }
        let display_url = normalize_display_url(&new_site.url)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        let site = Site {
            id,
            name: new_site.name.trim().to_string(),
            display_url,
            rss_url: new_site
                .rss_url
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            description: new_site.description,
            link_slots: new_site.link_slots,
            rss_slots: new_site.rss_slots,
            status: SiteStatus::Pending,
            created_at: Utc::now(),
        };
        // 插入和收回冲突槽位在同一把写锁下完成
        let mut sites = self.sites.write().await;
        sites.insert(id, site.clone());
        release_held_slots(&mut sites, id, &site.link_slots, &site.rss_slots);
        Ok(site)
    }

    async fn set_status(&self, id: SiteId, status: SiteStatus) -> Result<()> {
        let mut sites = self.sites.write().await;
        let site = sites
            .get_mut(&id)
            .ok_or_else(|| ReaccessError::not_found(format!("站点不存在: {}", id)))?;
        site.status = status;
        Ok(())
    }

    async fn delete(&self, id: SiteId) -> Result<bool> {
        let removed = self.sites.write().await.remove(&id).is_some();
        if removed {
            self.counters.write().await.retain(|(site_id, _), _| *site_id != id);
        }
        Ok(removed)
    }
}

#[async_trait]
impl SlotConfigStore for MemoryStorage {
    async fn load(&self, slot: u8, content_type: ContentType) -> Result<Option<SlotConfig>> {
        Ok(self
            .slot_configs
            .read()
            .await
            .get(&(slot, content_type))
            .cloned())
    }

    async fn save(&self, slot: u8, content_type: ContentType, config: &SlotConfig) -> Result<()> {
        self.slot_configs
            .write()
            .await
            .insert((slot, content_type), config.sanitized());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[tokio::test]
    async fn test_counters_accumulate_per_day() {
        let store = MemoryStorage::new();
        store.increment_daily(1, day(1), CounterMetric::In).await.unwrap();
        store.increment_daily(1, day(1), CounterMetric::In).await.unwrap();
        store.increment_daily(1, day(2), CounterMetric::Out).await.unwrap();
        store.increment_daily(1, day(9), CounterMetric::In).await.unwrap();

        let row = store.daily_counter(1, day(1)).await.unwrap();
        assert_eq!((row.in_count, row.out_count), (2, 0));

        let totals = store.sum_range(&[1, 2], day(1), day(7)).await.unwrap();
        assert_eq!(totals.get(&1), Some(&SiteTotals::new(2, 1)));
        assert!(!totals.contains_key(&2));
    }

    #[tokio::test]
    async fn test_create_starts_pending() {
        let store = MemoryStorage::new();
        let site = store
            .create(NewSite {
                name: "Alpha".to_string(),
                url: "https://alpha.example/".to_string(),
                ..NewSite::default()
            })
            .await
            .unwrap();

        assert_eq!(site.id, 1);
        assert_eq!(site.status, SiteStatus::Pending);
        assert_eq!(site.display_url, "https://alpha.example");
        assert!(store.list_approved().await.unwrap().is_empty());

        store.set_status(site.id, SiteStatus::Approved).await.unwrap();
        assert_eq!(store.list_approved().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exclusive_update_releases_other_holders() {
        let store = MemoryStorage::new();
        for (id, link) in [(1, "3"), (2, "4,5")] {
            store
                .insert_site(Site {
                    id,
                    name: format!("site-{}", id),
                    display_url: format!("https://s{}.example", id),
                    rss_url: None,
                    description: String::new(),
                    link_slots: SlotSet::parse_csv(link),
                    rss_slots: SlotSet::new(),
                    status: SiteStatus::Approved,
                    created_at: Utc::now(),
                })
                .await;
        }

        let releases = store
            .update_memberships_exclusive(1, &SlotSet::parse_csv("3,4"), &SlotSet::new())
            .await
            .unwrap();

        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].site_id, 2);
        assert_eq!(releases[0].slot, 4);
        let other = store.get_by_id(2).await.unwrap().unwrap();
        assert_eq!(other.link_slots.to_csv(), "5");
    }

    #[tokio::test]
    async fn test_create_takes_slots_from_existing_holders() {
        let store = MemoryStorage::new();
        let first = store
            .create(NewSite {
                name: "First".to_string(),
                url: "https://first.example".to_string(),
                link_slots: SlotSet::parse_csv("3,4"),
                ..NewSite::default()
            })
            .await
            .unwrap();
        let second = store
            .create(NewSite {
                name: "Second".to_string(),
                url: "https://second.example".to_string(),
                link_slots: SlotSet::parse_csv("3"),
                ..NewSite::default()
            })
            .await
            .unwrap();

        let first = store.get_by_id(first.id).await.unwrap().unwrap();
        assert_eq!(first.link_slots.to_csv(), "4");
        assert_eq!(second.link_slots.to_csv(), "3");
    }

    #[tokio::test]
    async fn test_update_unknown_site_is_not_found() {
        let store = MemoryStorage::new();
        let err = store
            .update_memberships(42, &SlotSet::new(), &SlotSet::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ReaccessError::NotFound(_)));
    }
}
