//! 站点天级 IN/OUT 计数表
//!
//! (site_id, day) 唯一，写入侧使用 upsert 累加。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SiteDaily::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SiteDaily::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SiteDaily::SiteId).big_integer().not_null())
                    .col(ColumnDef::new(SiteDaily::Day).date().not_null())
                    .col(
                        ColumnDef::new(SiteDaily::InCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SiteDaily::OutCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // 唯一索引：site_id + day（ON CONFLICT 目标）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_site_daily_site_day")
                    .table(SiteDaily::Table)
                    .col(SiteDaily::SiteId)
                    .col(SiteDaily::Day)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // 索引：day（窗口范围查询）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_site_daily_day")
                    .table(SiteDaily::Table)
                    .col(SiteDaily::Day)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .if_exists()
                    .name("idx_site_daily_day")
                    .table(SiteDaily::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .if_exists()
                    .name("idx_site_daily_site_day")
                    .table(SiteDaily::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(SiteDaily::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SiteDaily {
    #[sea_orm(iden = "site_daily")]
    Table,
    Id,
    SiteId,
    Day,
    InCount,
    OutCount,
}
