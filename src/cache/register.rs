use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::cache::traits::AggregateCache;
use crate::errors::Result;

pub type BoxedAggregateCacheFuture =
    Pin<Box<dyn Future<Output = Result<Arc<dyn AggregateCache>>> + Send>>;
pub type AggregateCacheConstructor = Arc<dyn Fn() -> BoxedAggregateCacheFuture + Send + Sync>;

static AGGREGATE_CACHE_REGISTRY: Lazy<RwLock<HashMap<String, AggregateCacheConstructor>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

pub fn register_aggregate_cache_plugin<S: Into<String>>(
    name: S,
    constructor: AggregateCacheConstructor,
) {
    // 注册发生在 ctor 阶段，锁中毒时直接恢复内部数据
    let mut registry = AGGREGATE_CACHE_REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.insert(name.into(), constructor);
}

pub fn get_aggregate_cache_plugin(name: &str) -> Option<AggregateCacheConstructor> {
    AGGREGATE_CACHE_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(name)
        .cloned()
}

pub fn registered_aggregate_cache_plugins() -> Vec<String> {
    let mut names: Vec<String> = AGGREGATE_CACHE_REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}

pub fn debug_cache_registry() {
    let names = registered_aggregate_cache_plugins();
    if names.is_empty() {
        tracing::debug!("No aggregate cache plugins registered.");
    } else {
        tracing::debug!("Registered aggregate cache plugins: {}", names.join(", "));
    }
}
