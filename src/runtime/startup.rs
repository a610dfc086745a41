use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cache::{AggregateCache, CacheFactory};
use crate::services::{
    RankingService, ReciprocityAggregator, SlotExclusivityEnforcer, SlotSelector, VisitRecorder,
};
use crate::storage::{
    CounterStore, SeaOrmStorage, SiteRegistry, SlotConfigStore, StorageFactory,
};

/// 组装完成的服务集合
pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub cache: Arc<dyn AggregateCache>,
    pub aggregator: Arc<ReciprocityAggregator>,
    pub selector: Arc<SlotSelector>,
    pub enforcer: Arc<SlotExclusivityEnforcer>,
    pub ranking: Arc<RankingService>,
    pub visits: Arc<VisitRecorder>,
}

/// 不绑定具体存储的服务集合
pub struct Services {
    pub aggregator: Arc<ReciprocityAggregator>,
    pub selector: Arc<SlotSelector>,
    pub enforcer: Arc<SlotExclusivityEnforcer>,
    pub ranking: Arc<RankingService>,
    pub visits: Arc<VisitRecorder>,
}

impl Services {
    /// 用已有的存储和缓存组装服务（测试和嵌入场景）
    pub fn assemble(
        counters: Arc<dyn CounterStore>,
        registry: Arc<dyn SiteRegistry>,
        configs: Arc<dyn SlotConfigStore>,
        cache: Arc<dyn AggregateCache>,
    ) -> Self {
        let aggregator = Arc::new(ReciprocityAggregator::new(
            counters.clone(),
            registry.clone(),
            cache,
        ));
        Self {
            selector: Arc::new(SlotSelector::new(
                registry.clone(),
                configs,
                aggregator.clone(),
            )),
            enforcer: Arc::new(SlotExclusivityEnforcer::new(registry.clone())),
            ranking: Arc::new(RankingService::new(registry.clone(), aggregator.clone())),
            visits: Arc::new(VisitRecorder::new(registry, counters)),
            aggregator,
        }
    }
}

/// 按全局配置连接数据库、创建缓存并组装服务
pub async fn prepare_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.get_backend_name());

    let cache = CacheFactory::create()
        .await
        .context("Failed to create aggregate cache")?;

    let services = Services::assemble(
        storage.clone(),
        storage.clone(),
        storage.clone(),
        cache.clone(),
    );

    debug!("Startup completed in {:?}", start_time.elapsed());
    Ok(StartupContext {
        storage,
        cache,
        aggregator: services.aggregator,
        selector: services.selector,
        enforcer: services.enforcer,
        ranking: services.ranking,
        visits: services.visits,
    })
}
