//! Aggregate cache
//!
//! Cache backends register themselves by name (`memory`, `redis`, `null`)
//! and `CacheFactory` picks one from `cache.type` in the config.

pub mod macros;
pub mod object_cache;
pub mod register;
pub mod traits;

use std::sync::Arc;

use tracing::info;

use crate::errors::{ReaccessError, Result};

pub use object_cache::{MokaAggregateCache, NullAggregateCache, RedisAggregateCache};
pub use traits::{AggregateCache, AggregateKey, AggregateKind, AggregateSnapshot, canonical_ids};

pub struct CacheFactory;

impl CacheFactory {
    /// 按配置创建聚合缓存
    pub async fn create() -> Result<Arc<dyn AggregateCache>> {
        let cache_type = crate::config::get_config().cache.cache_type.clone();
        Self::create_named(&cache_type).await
    }

    pub async fn create_named(name: &str) -> Result<Arc<dyn AggregateCache>> {
        register::debug_cache_registry();

        let constructor = register::get_aggregate_cache_plugin(name).ok_or_else(|| {
            ReaccessError::cache_plugin_not_found(format!(
                "未知的缓存类型: {}. 可用: {}",
                name,
                register::registered_aggregate_cache_plugins().join(", ")
            ))
        })?;

        let cache = constructor().await?;
        info!("Aggregate cache initialized: {}", name);
        Ok(cache)
    }
}
