use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::AsRefStr;
use xxhash_rust::xxh64::xxh64;

use crate::storage::{SiteId, SiteTotals};

/// 聚合结果的种类，决定缓存 key 的前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum AggregateKind {
    /// 槽位子集的回访需求
    ReturnNeed,
    /// 全站回访需求
    RegistryReturnNeed,
    /// 排行榜使用的 IN/OUT 合计
    Traffic,
}

/// 聚合缓存 key：(种类, 周期, 站点集合哈希)
///
/// 站点集合先排序去重再拼成 `1,2,3` 计算 xxh64，
/// 所以同一组站点无论传入顺序如何都落在同一个 key 上。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    pub kind: AggregateKind,
    pub period_days: u32,
    pub ids_hash: u64,
}

impl AggregateKey {
    pub fn new(kind: AggregateKind, period_days: u32, site_ids: &[SiteId]) -> Self {
        let canonical = canonical_ids(site_ids)
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Self {
            kind,
            period_days,
            ids_hash: xxh64(canonical.as_bytes(), 0),
        }
    }
}

impl fmt::Display for AggregateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{:016x}",
            self.kind.as_ref(),
            self.period_days,
            self.ids_hash
        )
    }
}

/// 排序去重后的站点 id
pub fn canonical_ids(site_ids: &[SiteId]) -> Vec<SiteId> {
    let mut ids = site_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// 缓存中保存的聚合快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSnapshot {
    pub totals: HashMap<SiteId, SiteTotals>,
}

impl AggregateSnapshot {
    pub fn new(totals: HashMap<SiteId, SiteTotals>) -> Self {
        Self { totals }
    }

    /// 每个站点的 max(0, IN - OUT)
    pub fn priorities(&self) -> HashMap<SiteId, u64> {
        self.totals
            .iter()
            .map(|(id, t)| (*id, t.return_need()))
            .collect()
    }
}

/// 聚合结果缓存
///
/// 尽力而为：实现内部吞掉并记录自己的错误，读失败等同未命中。
#[async_trait]
pub trait AggregateCache: Send + Sync {
    async fn get(&self, key: &AggregateKey) -> Option<AggregateSnapshot>;

    async fn set(&self, key: &AggregateKey, value: AggregateSnapshot, ttl: Duration);

    async fn invalidate_all(&self);
}
