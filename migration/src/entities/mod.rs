pub mod site;
pub mod site_daily;
pub mod slot_setting;

pub use site::Entity as SiteEntity;
pub use site_daily::Entity as SiteDailyEntity;
pub use slot_setting::Entity as SlotSettingEntity;
