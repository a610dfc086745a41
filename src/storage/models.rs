use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, EnumIter, EnumString};

/// 站点主键
pub type SiteId = i64;

/// 槽位编号上限（链接和 RSS 槽位都是 1..=10）
pub const MAX_SLOT: u8 = 10;

/// 单个槽位最多展示的站点数
pub const MAX_DISPLAY_LIMIT: u8 = 20;

/// 默认聚合周期（天）
pub const DEFAULT_PERIOD_DAYS: u32 = 7;

/// 槽位内容类型
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumIter,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContentType {
    #[default]
    Link,
    Rss,
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// 站点审核状态
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SiteStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// 槽位归属集合
///
/// 数据库中以逗号分隔字符串保存（例如 `"1,3"`）。解析时丢弃非数字、
/// 超出 1..=MAX_SLOT 的值并去重，迭代顺序始终升序。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotSet(BTreeSet<u8>);

impl SlotSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析 CSV 字符串
    pub fn parse_csv(csv: &str) -> Self {
        csv.split(',')
            .filter_map(|part| part.trim().parse::<u32>().ok())
            .filter_map(|n| u8::try_from(n).ok())
            .collect()
    }

    /// 序列化为升序 CSV，空集合为 `""`
    pub fn to_csv(&self) -> String {
        self.0
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn is_valid_slot(slot: u8) -> bool {
        (1..=MAX_SLOT).contains(&slot)
    }

    /// 插入槽位，超出范围的编号被忽略，返回是否新增
    pub fn insert(&mut self, slot: u8) -> bool {
        Self::is_valid_slot(slot) && self.0.insert(slot)
    }

    pub fn remove(&mut self, slot: u8) -> bool {
        self.0.remove(&slot)
    }

    pub fn contains(&self, slot: u8) -> bool {
        self.0.contains(&slot)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u8> for SlotSet {
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        let mut set = SlotSet::new();
        for slot in iter {
            set.insert(slot);
        }
        set
    }
}

impl fmt::Display for SlotSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_csv())
    }
}

/// 已注册的互惠站点
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    pub display_url: String,
    pub rss_url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link_slots: SlotSet,
    #[serde(default)]
    pub rss_slots: SlotSet,
    pub status: SiteStatus,
    pub created_at: DateTime<Utc>,
}

impl Site {
    pub fn is_approved(&self) -> bool {
        self.status == SiteStatus::Approved
    }

    pub fn has_feed(&self) -> bool {
        self.rss_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    pub fn slots(&self, content_type: ContentType) -> &SlotSet {
        match content_type {
            ContentType::Link => &self.link_slots,
            ContentType::Rss => &self.rss_slots,
        }
    }

    pub fn slots_mut(&mut self, content_type: ContentType) -> &mut SlotSet {
        match content_type {
            ContentType::Link => &mut self.link_slots,
            ContentType::Rss => &mut self.rss_slots,
        }
    }

    /// 是否可以出现在指定槽位（已审核、归属该槽位，RSS 还需要 feed 地址）
    pub fn eligible_for(&self, slot: u8, content_type: ContentType) -> bool {
        self.is_approved()
            && self.slots(content_type).contains(slot)
            && (content_type == ContentType::Link || self.has_feed())
    }
}

/// 新站点注册请求
#[derive(Debug, Clone, Default)]
pub struct NewSite {
    pub name: String,
    pub url: String,
    pub rss_url: Option<String>,
    pub description: String,
    pub link_slots: SlotSet,
    pub rss_slots: SlotSet,
}

/// 计数指标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum CounterMetric {
    In,
    Out,
}

/// 天级计数行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCounter {
    pub site_id: SiteId,
    pub day: NaiveDate,
    pub in_count: u64,
    pub out_count: u64,
}

/// 窗口内的 IN/OUT 合计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteTotals {
    pub total_in: u64,
    pub total_out: u64,
}

impl SiteTotals {
    pub fn new(total_in: u64, total_out: u64) -> Self {
        Self {
            total_in,
            total_out,
        }
    }

    /// 回访需求：max(0, IN - OUT)
    pub fn return_need(&self) -> u64 {
        self.total_in.saturating_sub(self.total_out)
    }
}

/// 槽位排序方式
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    EnumIter,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum OrderMode {
    Alphabetical,
    #[default]
    Newest,
    Oldest,
    Random,
    PriorityWeighted,
}

impl OrderMode {
    /// 宽松解析，未知值回退到默认（newest）
    pub fn parse_lossy(s: &str) -> Self {
        s.trim().parse().unwrap_or_default()
    }
}

impl fmt::Display for OrderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl<'de> Deserialize<'de> for OrderMode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(OrderMode::parse_lossy(&raw))
    }
}

/// 槽位配置
///
/// 模板类字段（HTML/CSS）属于渲染层，这里只保留选择相关的字段。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotConfig {
    /// 0 表示禁用
    pub display_limit: u8,
    pub order_mode: OrderMode,
    pub period_days: u32,
    /// RSS 槽位合并后展示的条目数
    pub item_limit: u8,
    /// RSS 抓取缓存时长（分钟）
    pub cache_minutes: u32,
    pub description: String,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            display_limit: 3,
            order_mode: OrderMode::default(),
            period_days: DEFAULT_PERIOD_DAYS,
            item_limit: 5,
            cache_minutes: 30,
            description: String::new(),
        }
    }
}

impl SlotConfig {
    pub fn new(display_limit: u8, order_mode: OrderMode) -> Self {
        Self {
            display_limit,
            order_mode,
            ..Self::default()
        }
    }

    pub fn with_period(mut self, period_days: u32) -> Self {
        self.period_days = period_days;
        self
    }

    pub fn with_item_limit(mut self, item_limit: u8) -> Self {
        self.item_limit = item_limit;
        self
    }

    /// 将越界的配置值钳制到合法范围
    pub fn sanitized(&self) -> Self {
        Self {
            display_limit: self.display_limit.min(MAX_DISPLAY_LIMIT),
            order_mode: self.order_mode,
            period_days: self.period_days.max(1),
            item_limit: self.item_limit.min(MAX_DISPLAY_LIMIT),
            cache_minutes: self.cache_minutes.clamp(10, 1440),
            description: self.description.clone(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        self.display_limit == 0
    }
}

/// 单条 RSS 条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub site_id: SiteId,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub image: Option<String>,
}

/// 渲染层发起的槽位请求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRequest {
    pub slot: i64,
    pub content_type: ContentType,
    /// 显式指定站点（兼容旧的手动放置方式）
    pub site_id: Option<SiteId>,
}

impl SlotRequest {
    pub fn new(slot: i64, content_type: ContentType) -> Self {
        Self {
            slot,
            content_type,
            site_id: None,
        }
    }

    pub fn with_site(mut self, site_id: SiteId) -> Self {
        self.site_id = Some(site_id);
        self
    }

    /// 将槽位编号钳制到 1..=MAX_SLOT
    pub fn clamped_slot(&self) -> u8 {
        self.slot.clamp(1, MAX_SLOT as i64) as u8
    }
}

/// 排他处理中被收回的槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SlotRelease {
    pub site_id: SiteId,
    pub slot: u8,
    pub content_type: ContentType,
}
