//! 站点注册实体

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "sites")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub site_name: String,
    pub site_url: String,
    pub rss_url: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// 逗号分隔的链接槽位编号，例如 "1,3"
    pub link_slots: String,
    /// 逗号分隔的 RSS 槽位编号
    pub rss_slots: String,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
