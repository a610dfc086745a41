use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;

use crate::cache::traits::{AggregateCache, AggregateKey, AggregateSnapshot};
use crate::declare_aggregate_cache_plugin;
use crate::errors::Result;

declare_aggregate_cache_plugin!("null", NullAggregateCache);

/// 不缓存任何东西，每次都重新聚合
pub struct NullAggregateCache;

impl NullAggregateCache {
    pub async fn from_config() -> Result<Self> {
        trace!("Using NullAggregateCache: aggregates are recomputed on every call");
        Ok(NullAggregateCache)
    }
}

#[async_trait]
impl AggregateCache for NullAggregateCache {
    async fn get(&self, _key: &AggregateKey) -> Option<AggregateSnapshot> {
        None
    }

    async fn set(&self, key: &AggregateKey, _value: AggregateSnapshot, _ttl: Duration) {
        trace!("NullAggregateCache.set ignored for {}", key);
    }

    async fn invalidate_all(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::traits::AggregateKind;

    #[tokio::test]
    async fn test_null_cache_never_hits() {
        let cache = NullAggregateCache::from_config().await.unwrap();
        let key = AggregateKey::new(AggregateKind::ReturnNeed, 7, &[1]);

        cache
            .set(&key, AggregateSnapshot::default(), Duration::from_secs(60))
            .await;
        assert!(cache.get(&key).await.is_none());
    }
}
