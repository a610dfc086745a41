use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use tracing::{debug, trace};

use crate::cache::traits::{AggregateCache, AggregateKey, AggregateSnapshot};
use crate::declare_aggregate_cache_plugin;
use crate::errors::Result;

declare_aggregate_cache_plugin!("memory", MokaAggregateCache);

/// 带写入时 TTL 的缓存值
#[derive(Clone)]
struct TimedSnapshot {
    snapshot: AggregateSnapshot,
    ttl: Duration,
}

/// 每个条目按写入时给定的 TTL 过期，子集查询和全站查询可以共用一个缓存
struct PerEntryExpiry;

impl Expiry<AggregateKey, TimedSnapshot> for PerEntryExpiry {
    fn expire_after_create(
        &self,
        _key: &AggregateKey,
        value: &TimedSnapshot,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &AggregateKey,
        value: &TimedSnapshot,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

pub struct MokaAggregateCache {
    inner: Cache<AggregateKey, TimedSnapshot>,
}

impl MokaAggregateCache {
    pub fn with_capacity(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryExpiry)
            .build();
        debug!(
            "MokaAggregateCache initialized with max capacity: {}",
            max_capacity
        );
        Self { inner }
    }

    pub async fn from_config() -> Result<Self> {
        let config = crate::config::get_config();
        Ok(Self::with_capacity(config.cache.memory.max_capacity))
    }

    /// 近似值，需要精确计数时先调用 `run_pending_tasks`
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }
}

#[async_trait]
impl AggregateCache for MokaAggregateCache {
    async fn get(&self, key: &AggregateKey) -> Option<AggregateSnapshot> {
        let hit = self.inner.get(key).await.map(|v| v.snapshot);
        trace!("moka aggregate {} -> {}", key, if hit.is_some() { "hit" } else { "miss" });
        hit
    }

    async fn set(&self, key: &AggregateKey, value: AggregateSnapshot, ttl: Duration) {
        self.inner
            .insert(
                *key,
                TimedSnapshot {
                    snapshot: value,
                    ttl,
                },
            )
            .await;
    }

    async fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::traits::AggregateKind;
    use crate::storage::SiteTotals;
    use std::collections::HashMap;

    fn snapshot() -> AggregateSnapshot {
        AggregateSnapshot::new(HashMap::from([(1, SiteTotals::new(5, 1))]))
    }

    #[tokio::test]
    async fn test_get_after_set() {
        let cache = MokaAggregateCache::with_capacity(100);
        let key = AggregateKey::new(AggregateKind::ReturnNeed, 7, &[1]);

        assert!(cache.get(&key).await.is_none());
        cache.set(&key, snapshot(), Duration::from_secs(60)).await;
        assert_eq!(cache.get(&key).await, Some(snapshot()));
    }

    #[tokio::test]
    async fn test_entry_expires_after_its_own_ttl() {
        let cache = MokaAggregateCache::with_capacity(100);
        let short = AggregateKey::new(AggregateKind::ReturnNeed, 7, &[1]);
        let long = AggregateKey::new(AggregateKind::RegistryReturnNeed, 7, &[1]);

        cache.set(&short, snapshot(), Duration::from_millis(50)).await;
        cache.set(&long, snapshot(), Duration::from_secs(60)).await;
        tokio::time::sleep(Duration::from_millis(120)).await;

        assert!(cache.get(&short).await.is_none());
        assert!(cache.get(&long).await.is_some());
    }

    #[tokio::test]
    async fn test_invalidate_all() {
        let cache = MokaAggregateCache::with_capacity(100);
        let key = AggregateKey::new(AggregateKind::Traffic, 7, &[1, 2]);
        cache.set(&key, snapshot(), Duration::from_secs(60)).await;

        cache.invalidate_all().await;
        assert!(cache.get(&key).await.is_none());
    }
}
