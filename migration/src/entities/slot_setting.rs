//! 槽位配置实体
//!
//! 每个 (slot_number, content_type) 一行，配置以 JSON 存储。

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "slot_settings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub slot_number: i32,
    pub content_type: String,
    #[sea_orm(column_type = "Text")]
    pub setting_value: String,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
