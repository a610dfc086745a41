//! 站点注册表
//!
//! 槽位归属以逗号分隔字符串保存在站点行上，
//! 排他性由应用层（SlotExclusivityEnforcer）保证。

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Site::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Site::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Site::SiteName).string_len(255).not_null())
                    .col(ColumnDef::new(Site::SiteUrl).string_len(512).not_null())
                    .col(ColumnDef::new(Site::RssUrl).string_len(512).null())
                    .col(
                        ColumnDef::new(Site::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Site::LinkSlots)
                            .string_len(64)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Site::RssSlots)
                            .string_len(64)
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Site::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Site::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Site::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 状态索引：几乎所有读路径都按 approved 过滤
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sites_status")
                    .table(Site::Table)
                    .col(Site::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_sites_created_at")
                    .table(Site::Table)
                    .col(Site::CreatedAt)
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
                    .name("idx_sites_created_at")
                    .table(Site::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .if_exists()
                    .name("idx_sites_status")
                    .table(Site::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(Table::drop().table(Site::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Site {
    #[sea_orm(iden = "sites")]
    Table,
    Id,
    SiteName,
    SiteUrl,
    RssUrl,
    Description,
    LinkSlots,
    RssSlots,
    Status,
    CreatedAt,
    UpdatedAt,
}
