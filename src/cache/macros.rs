/// 在进程启动时把聚合缓存实现注册到插件表
///
/// `$ty` 需要提供 `async fn from_config() -> Result<Self>`。
#[macro_export]
macro_rules! declare_aggregate_cache_plugin {
    ($name:expr, $ty:ty) => {
        #[ctor::ctor]
        fn __register_aggregate_cache_plugin() {
            use std::sync::Arc;
            use $crate::cache::register::register_aggregate_cache_plugin;

            register_aggregate_cache_plugin(
                $name,
                Arc::new(|| {
                    Box::pin(async {
                        let cache = <$ty>::from_config().await?;
                        Ok(Arc::new(cache) as Arc<dyn $crate::cache::traits::AggregateCache>)
                    })
                }),
            );
        }
    };
}
