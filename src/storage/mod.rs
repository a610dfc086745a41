//! Storage layer
//!
//! The ranking core only talks to storage through the three traits below.
//! `SeaOrmStorage` backs them with SQLite/MySQL/PostgreSQL, `MemoryStorage`
//! keeps everything in-process.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::Result;

pub mod backend;
pub mod memory;
pub mod models;

pub use backend::SeaOrmStorage;
pub use memory::MemoryStorage;
pub use models::{
    ContentType, CounterMetric, DailyCounter, FeedItem, NewSite, OrderMode, Site, SiteId,
    SiteStatus, SiteTotals, SlotConfig, SlotRelease, SlotRequest, SlotSet,
};

/// 天级 IN/OUT 计数存储
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 原子地为 (site_id, day) 的指定指标 +1，行不存在时创建
    async fn increment_daily(&self, site_id: SiteId, day: NaiveDate, metric: CounterMetric)
    -> Result<()>;

    /// 汇总 [start, end]（含两端）内每个站点的 IN/OUT
    ///
    /// 没有计数行的站点可以不出现在结果中。
    async fn sum_range(
        &self,
        site_ids: &[SiteId],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<HashMap<SiteId, SiteTotals>>;
}

/// 站点注册表
#[async_trait]
pub trait SiteRegistry: Send + Sync {
    /// 已审核且归属指定槽位的站点（按 id 降序）
    async fn list_approved_by_slot(&self, slot: u8, content_type: ContentType)
    -> Result<Vec<Site>>;

    /// 全部已审核站点（按 id 降序）
    async fn list_approved(&self) -> Result<Vec<Site>>;

    async fn get_by_id(&self, id: SiteId) -> Result<Option<Site>>;

    /// 当前持有 (slot, content_type) 的站点，排除 `excluding`，不区分审核状态
    async fn list_slot_holders(
        &self,
        slot: u8,
        content_type: ContentType,
        excluding: SiteId,
    ) -> Result<Vec<Site>>;

    /// 覆盖写入站点的两组槽位归属（不做排他处理）
    async fn update_memberships(
        &self,
        id: SiteId,
        link_slots: &SlotSet,
        rss_slots: &SlotSet,
    ) -> Result<()>;

    /// 写入新的槽位归属，并从其他站点收回冲突的槽位
    ///
    /// 默认实现按顺序调用 `update_memberships` 和排他处理；
    /// 数据库后端会把整个过程放进一个事务。
    async fn update_memberships_exclusive(
        &self,
        id: SiteId,
        link_slots: &SlotSet,
        rss_slots: &SlotSet,
    ) -> Result<Vec<SlotRelease>> {
        self.update_memberships(id, link_slots, rss_slots).await?;
        crate::services::exclusivity::release_conflicts(self, id, link_slots, rss_slots).await
    }

    /// 注册新站点（pending），其请求的槽位会从现有持有者处收回
    async fn create(&self, site: NewSite) -> Result<Site>;

    async fn set_status(&self, id: SiteId, status: SiteStatus) -> Result<()>;

    async fn delete(&self, id: SiteId) -> Result<bool>;
}

/// 槽位配置存储
#[async_trait]
pub trait SlotConfigStore: Send + Sync {
    async fn load(&self, slot: u8, content_type: ContentType) -> Result<Option<SlotConfig>>;

    async fn save(&self, slot: u8, content_type: ContentType, config: &SlotConfig) -> Result<()>;
}

pub struct StorageFactory;

impl StorageFactory {
    /// 根据全局配置创建 SeaORM 存储
    pub async fn create() -> Result<Arc<SeaOrmStorage>> {
        let config = crate::config::get_config();
        let database_url = &config.database.database_url;

        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(database_url)?;

        let storage = SeaOrmStorage::new(database_url, &backend_type).await?;
        Ok(Arc::new(storage))
    }
}
