//! Slot exclusivity
//!
//! 每个 (槽位, 内容类型) 最多归属一个站点：站点拿到某个槽位时，
//! 其他持有同一槽位的站点失去它。

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::errors::Result;
use crate::storage::{ContentType, Site, SiteId, SiteRegistry, SlotRelease, SlotSet};

/// 从 `site_id` 以外的站点收回 `link_slots` / `rss_slots` 中的槽位
///
/// 每个受影响站点只写一次；本来就没有这些槽位的站点不会被改写。
pub async fn release_conflicts<R>(
    registry: &R,
    site_id: SiteId,
    link_slots: &SlotSet,
    rss_slots: &SlotSet,
) -> Result<Vec<SlotRelease>>
where
    R: SiteRegistry + ?Sized,
{
    let mut touched: BTreeMap<SiteId, Site> = BTreeMap::new();
    let mut releases = Vec::new();

    for (content_type, wanted) in [(ContentType::Link, link_slots), (ContentType::Rss, rss_slots)] {
        for slot in wanted.iter() {
            for holder in registry
                .list_slot_holders(slot, content_type, site_id)
                .await?
            {
                let site = touched.entry(holder.id).or_insert(holder);
                if site.slots_mut(content_type).remove(slot) {
                    releases.push(SlotRelease {
                        site_id: site.id,
                        slot,
                        content_type,
                    });
                }
            }
        }
    }

    for site in touched.values() {
        registry
            .update_memberships(site.id, &site.link_slots, &site.rss_slots)
            .await?;
        info!(
            "Site {} lost slot(s) to site {}: link=[{}] rss=[{}]",
            site.id, site_id, site.link_slots, site.rss_slots
        );
    }

    Ok(releases)
}

pub struct SlotExclusivityEnforcer {
    registry: Arc<dyn SiteRegistry>,
}

impl SlotExclusivityEnforcer {
    pub fn new(registry: Arc<dyn SiteRegistry>) -> Self {
        Self { registry }
    }

    /// 只收回其他站点的冲突槽位，不修改 `site_id` 自身
    pub async fn enforce_exclusivity(
        &self,
        site_id: SiteId,
        new_link_slots: &SlotSet,
        new_rss_slots: &SlotSet,
    ) -> Result<Vec<SlotRelease>> {
        release_conflicts(self.registry.as_ref(), site_id, new_link_slots, new_rss_slots).await
    }

    /// 管理端编辑：写入新归属并保证排他
    pub async fn update_memberships(
        &self,
        site_id: SiteId,
        link_slots: &SlotSet,
        rss_slots: &SlotSet,
    ) -> Result<Vec<SlotRelease>> {
        self.registry
            .update_memberships_exclusive(site_id, link_slots, rss_slots)
            .await
    }
}
