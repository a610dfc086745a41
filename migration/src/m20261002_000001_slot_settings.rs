use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SlotSetting::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SlotSetting::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SlotSetting::SlotNumber).integer().not_null())
                    .col(
                        ColumnDef::new(SlotSetting::ContentType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SlotSetting::SettingValue).text().not_null())
                    .col(
                        ColumnDef::new(SlotSetting::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_slot_settings_slot_type")
                    .table(SlotSetting::Table)
                    .col(SlotSetting::SlotNumber)
                    .col(SlotSetting::ContentType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(SlotSetting::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum SlotSetting {
    #[sea_orm(iden = "slot_settings")]
    Table,
    Id,
    SlotNumber,
    ContentType,
    SettingValue,
    UpdatedAt,
}
