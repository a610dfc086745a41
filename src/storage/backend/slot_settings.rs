use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, EntityTrait, QueryFilter,
    sea_query::OnConflict,
};
use tracing::{debug, warn};

use super::SeaOrmStorage;
use super::retry;
use crate::errors::Result;
use crate::storage::SlotConfigStore;
use crate::storage::models::{ContentType, SlotConfig};
use migration::entities::slot_setting;

#[async_trait]
impl SlotConfigStore for SeaOrmStorage {
    async fn load(&self, slot: u8, content_type: ContentType) -> Result<Option<SlotConfig>> {
        let row = retry::with_retry("load_slot_setting", self.retry_config, || async {
            slot_setting::Entity::find()
                .filter(slot_setting::Column::SlotNumber.eq(slot as i32))
                .filter(slot_setting::Column::ContentType.eq(content_type.as_ref()))
                .one(&self.db)
                .await
        })
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        // 损坏的 JSON 当作没有配置，由调用方使用默认值
        match serde_json::from_str::<SlotConfig>(&row.setting_value) {
            Ok(config) => Ok(Some(config.sanitized())),
            Err(e) => {
                warn!(
                    "槽位配置 {}#{} 解析失败，使用默认值: {}",
                    content_type, slot, e
                );
                Ok(None)
            }
        }
    }

    async fn save(&self, slot: u8, content_type: ContentType, config: &SlotConfig) -> Result<()> {
        let value = serde_json::to_string(&config.sanitized())?;

        retry::with_retry("save_slot_setting", self.retry_config, || async {
            let row = slot_setting::ActiveModel {
                id: NotSet,
                slot_number: Set(slot as i32),
                content_type: Set(content_type.to_string()),
                setting_value: Set(value.clone()),
                updated_at: Set(Utc::now()),
            };
            slot_setting::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([
                        slot_setting::Column::SlotNumber,
                        slot_setting::Column::ContentType,
                    ])
                    .update_columns([
                        slot_setting::Column::SettingValue,
                        slot_setting::Column::UpdatedAt,
                    ])
                    .to_owned(),
                )
                .exec_without_returning(&self.db)
                .await
        })
        .await?;

        debug!("Slot setting saved: {}#{}", content_type, slot);
        Ok(())
    }
}
