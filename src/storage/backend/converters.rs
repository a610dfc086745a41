use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use tracing::warn;

use crate::storage::models::{NewSite, Site, SiteStatus, SlotSet};
use migration::entities::site;

/// 将 Sea-ORM Model 转换为 Site
///
/// 数据库中未知的状态字符串按 pending 处理，这样的站点不会进入任何槽位。
pub fn model_to_site(model: site::Model) -> Site {
    let status = model.status.parse().unwrap_or_else(|_| {
        warn!(
            "Site {} has unknown status '{}', treating as pending",
            model.id, model.status
        );
        SiteStatus::Pending
    });

    Site {
        id: model.id,
        name: model.site_name,
        display_url: model.site_url,
        rss_url: model.rss_url.filter(|u| !u.trim().is_empty()),
        description: model.description,
        link_slots: SlotSet::parse_csv(&model.link_slots),
        rss_slots: SlotSet::parse_csv(&model.rss_slots),
        status,
        created_at: model.created_at,
    }
}

/// 新注册站点的 ActiveModel，状态固定为 pending
pub fn new_site_to_active_model(site: &NewSite, display_url: String) -> site::ActiveModel {
    let now = Utc::now();
    site::ActiveModel {
        id: NotSet,
        site_name: Set(site.name.trim().to_string()),
        site_url: Set(display_url),
        rss_url: Set(site
            .rss_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)),
        description: Set(site.description.clone()),
        link_slots: Set(site.link_slots.to_csv()),
        rss_slots: Set(site.rss_slots.to_csv()),
        status: Set(SiteStatus::Pending.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
}
