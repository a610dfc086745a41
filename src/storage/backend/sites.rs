//! 站点注册表
//!
//! `SiteRepo` 对任意 `ConnectionTrait` 泛型，既可以直接跑在连接池上，
//! 也可以跑在事务里（排他更新就是这样做的）。

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    TransactionTrait, sea_query::Expr,
};
use tracing::{debug, info};

use super::SeaOrmStorage;
use super::converters::{model_to_site, new_site_to_active_model};
use super::retry::{self, RetryConfig};
use crate::errors::{ReaccessError, Result};
use crate::services::exclusivity::release_conflicts;
use crate::storage::SiteRegistry;
use crate::storage::models::{
    ContentType, NewSite, Site, SiteId, SiteStatus, SlotRelease, SlotSet,
};
use crate::utils::url_normalizer::normalize_display_url;
use migration::entities::{site, site_daily};

pub struct SiteRepo<'a, C: ConnectionTrait> {
    db: &'a C,
    retry_config: RetryConfig,
}

impl<'a, C: ConnectionTrait> SiteRepo<'a, C> {
    pub fn new(db: &'a C, retry_config: RetryConfig) -> Self {
        Self { db, retry_config }
    }

    async fn load_all(&self, approved_only: bool) -> Result<Vec<Site>> {
        let models = retry::with_retry("list_sites", self.retry_config, || async {
            let mut query = site::Entity::find();
            if approved_only {
                query = query.filter(site::Column::Status.eq(SiteStatus::Approved.as_ref()));
            }
            query.order_by_desc(site::Column::Id).all(self.db).await
        })
        .await?;

        Ok(models.into_iter().map(model_to_site).collect())
    }

    fn not_found(id: SiteId) -> ReaccessError {
        ReaccessError::not_found(format!("站点不存在: {}", id))
    }
}

// 槽位归属以 CSV 保存，各数据库没有可移植的集合查询，过滤放在内存里做
#[async_trait]
impl<'a, C> SiteRegistry for SiteRepo<'a, C>
where
    C: ConnectionTrait + Send + Sync,
{
    async fn list_approved_by_slot(
        &self,
        slot: u8,
        content_type: ContentType,
    ) -> Result<Vec<Site>> {
        let mut sites = self.load_all(true).await?;
        sites.retain(|s| s.slots(content_type).contains(slot));
        Ok(sites)
    }

    async fn list_approved(&self) -> Result<Vec<Site>> {
        self.load_all(true).await
    }

    async fn get_by_id(&self, id: SiteId) -> Result<Option<Site>> {
        let model = retry::with_retry("get_site", self.retry_config, || async {
            site::Entity::find_by_id(id).one(self.db).await
        })
        .await?;
        Ok(model.map(model_to_site))
    }

    async fn list_slot_holders(
        &self,
        slot: u8,
        content_type: ContentType,
        excluding: SiteId,
    ) -> Result<Vec<Site>> {
        let mut sites = self.load_all(false).await?;
        sites.retain(|s| s.id != excluding && s.slots(content_type).contains(slot));
        Ok(sites)
    }

    async fn update_memberships(
        &self,
        id: SiteId,
        link_slots: &SlotSet,
        rss_slots: &SlotSet,
    ) -> Result<()> {
        let link_csv = link_slots.to_csv();
        let rss_csv = rss_slots.to_csv();

        let result = retry::with_retry("update_memberships", self.retry_config, || async {
            site::Entity::update_many()
                .col_expr(site::Column::LinkSlots, Expr::value(link_csv.clone()))
                .col_expr(site::Column::RssSlots, Expr::value(rss_csv.clone()))
                .col_expr(site::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(site::Column::Id.eq(id))
                .exec(self.db)
                .await
        })
        .await?;

        if result.rows_affected == 0 {
            return Err(Self::not_found(id));
        }
        debug!(
            "Site {} memberships set: link=[{}] rss=[{}]",
            id, link_csv, rss_csv
        );
        Ok(())
    }

    async fn create(&self, new_site: NewSite) -> Result<Site> {
        if new_site.name.trim().is_empty() {
            return Err(ReaccessError::validation("站点名称不能为空"));
        }
        let display_url = normalize_display_url(&new_site.url)?;

        // 插入不是幂等的，不走重试
        let model = new_site_to_active_model(&new_site, display_url)
            .insert(self.db)
            .await?;

        info!("Site registered: {} ({})", model.site_name, model.id);
        let site = model_to_site(model);

        let releases = release_conflicts(self, site.id, &site.link_slots, &site.rss_slots).await?;
        if !releases.is_empty() {
            info!("Site {} took over {} slot(s) on registration", site.id, releases.len());
        }
        Ok(site)
    }

    async fn set_status(&self, id: SiteId, status: SiteStatus) -> Result<()> {
        let result = retry::with_retry("set_site_status", self.retry_config, || async {
            site::Entity::update_many()
                .col_expr(site::Column::Status, Expr::value(status.as_ref()))
                .col_expr(site::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(site::Column::Id.eq(id))
                .exec(self.db)
                .await
        })
        .await?;

        if result.rows_affected == 0 {
            return Err(Self::not_found(id));
        }
        info!("Site {} status -> {}", id, status);
        Ok(())
    }

    async fn delete(&self, id: SiteId) -> Result<bool> {
        let deleted = site::Entity::delete_by_id(id).exec(self.db).await?;
        if deleted.rows_affected == 0 {
            return Ok(false);
        }

        // 计数行随站点一起删除
        let counters = site_daily::Entity::delete_many()
            .filter(site_daily::Column::SiteId.eq(id))
            .exec(self.db)
            .await?;

        info!(
            "Site {} deleted ({} counter rows removed)",
            id, counters.rows_affected
        );
        Ok(true)
    }
}

#[async_trait]
impl SiteRegistry for SeaOrmStorage {
    async fn list_approved_by_slot(
        &self,
        slot: u8,
        content_type: ContentType,
    ) -> Result<Vec<Site>> {
        self.sites().list_approved_by_slot(slot, content_type).await
    }

    async fn list_approved(&self) -> Result<Vec<Site>> {
        self.sites().list_approved().await
    }

    async fn get_by_id(&self, id: SiteId) -> Result<Option<Site>> {
        self.sites().get_by_id(id).await
    }

    async fn list_slot_holders(
        &self,
        slot: u8,
        content_type: ContentType,
        excluding: SiteId,
    ) -> Result<Vec<Site>> {
        self.sites()
            .list_slot_holders(slot, content_type, excluding)
            .await
    }

    async fn update_memberships(
        &self,
        id: SiteId,
        link_slots: &SlotSet,
        rss_slots: &SlotSet,
    ) -> Result<()> {
        self.sites()
            .update_memberships(id, link_slots, rss_slots)
            .await
    }

    /// 在单个事务中写入归属并收回冲突槽位
    async fn update_memberships_exclusive(
        &self,
        id: SiteId,
        link_slots: &SlotSet,
        rss_slots: &SlotSet,
    ) -> Result<Vec<SlotRelease>> {
        let txn = self.db.begin().await.map_err(|e| {
            ReaccessError::database_operation(format!("Failed to begin transaction: {}", e))
        })?;

        // 事务内不重试，失败时整体回滚
        let repo = SiteRepo::new(
            &txn,
            RetryConfig {
                max_retries: 0,
                ..self.retry_config
            },
        );
        let releases = repo
            .update_memberships_exclusive(id, link_slots, rss_slots)
            .await?;

        txn.commit().await.map_err(|e| {
            ReaccessError::database_operation(format!("Failed to commit transaction: {}", e))
        })?;

        if !releases.is_empty() {
            info!("Site {} took over {} slot(s)", id, releases.len());
        }
        Ok(releases)
    }

    /// 插入新站点并收回其他站点的同名槽位，两步在同一事务中
    async fn create(&self, site: NewSite) -> Result<Site> {
        let txn = self.db.begin().await.map_err(|e| {
            ReaccessError::database_operation(format!("Failed to begin transaction: {}", e))
        })?;

        let repo = SiteRepo::new(
            &txn,
            RetryConfig {
                max_retries: 0,
                ..self.retry_config
            },
        );
        let created = repo.create(site).await?;

        txn.commit().await.map_err(|e| {
            ReaccessError::database_operation(format!("Failed to commit transaction: {}", e))
        })?;
        Ok(created)
    }

    async fn set_status(&self, id: SiteId, status: SiteStatus) -> Result<()> {
        self.sites().set_status(id, status).await
    }

    async fn delete(&self, id: SiteId) -> Result<bool> {
        let txn = self.db.begin().await?;
        let deleted = SiteRepo::new(&txn, self.retry_config).delete(id).await?;
        txn.commit().await?;
        Ok(deleted)
    }
}
