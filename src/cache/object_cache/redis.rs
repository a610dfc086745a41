use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::sync::RwLock;
use tracing::{debug, error, trace};

use crate::cache::traits::{AggregateCache, AggregateKey, AggregateSnapshot};
use crate::declare_aggregate_cache_plugin;
use crate::errors::{ReaccessError, Result};

declare_aggregate_cache_plugin!("redis", RedisAggregateCache);

/// SCAN 每批返回的 key 数量
const SCAN_BATCH: usize = 200;

/// 以 JSON 保存聚合快照，TTL 交给 `SET EX`
pub struct RedisAggregateCache {
    client: redis::Client,
    /// 持久化连接，出错时清空，下次访问重新建立
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    key_prefix: String,
}

impl RedisAggregateCache {
    pub async fn connect(url: &str, key_prefix: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| ReaccessError::cache_connection(format!("Invalid Redis URL: {}", e)))?;

        let cache = Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            key_prefix: key_prefix.to_string(),
        };

        let mut conn = cache.get_connection().await.map_err(|e| {
            error!("Failed to connect to Redis server at {}: {}", url, e);
            ReaccessError::cache_connection(format!("Redis connection failed: {}", e))
        })?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!(
            "RedisAggregateCache connected ({}), prefix: '{}'",
            pong, cache.key_prefix
        );

        Ok(cache)
    }

    pub async fn from_config() -> Result<Self> {
        let config = crate::config::get_config();
        Self::connect(&config.cache.redis.url, &config.cache.redis.key_prefix).await
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> redis::RedisResult<MultiplexedConnection> {
        if let Some(conn) = self.connection.read().await.as_ref() {
            return Ok(conn.clone());
        }

        let mut guard = self.connection.write().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self.client.get_multiplexed_async_connection().await?;
        *guard = Some(conn.clone());
        debug!("Redis connection established and cached");
        Ok(conn)
    }

    async fn reset_connection(&self) {
        *self.connection.write().await = None;
        debug!("Redis connection reset due to error");
    }

    fn make_key(&self, key: &AggregateKey) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    async fn delete_by_prefix(
        &self,
        conn: &mut MultiplexedConnection,
    ) -> redis::RedisResult<usize> {
        let pattern = format!("{}*", self.key_prefix);
        let mut cursor: u64 = 0;
        let mut removed = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(conn)
                .await?;
            if !keys.is_empty() {
                removed += conn.del::<_, usize>(keys).await?;
            }
            if next == 0 {
                return Ok(removed);
            }
            cursor = next;
        }
    }
}

#[async_trait]
impl AggregateCache for RedisAggregateCache {
    async fn get(&self, key: &AggregateKey) -> Option<AggregateSnapshot> {
        let redis_key = self.make_key(key);
        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return None;
            }
        };

        match conn.get::<_, Option<String>>(&redis_key).await {
            Ok(Some(data)) => match serde_json::from_str(&data) {
                Ok(snapshot) => {
                    trace!("Redis aggregate hit: {}", redis_key);
                    Some(snapshot)
                }
                Err(e) => {
                    error!("Failed to deserialize aggregate '{}': {}", redis_key, e);
                    None
                }
            },
            Ok(None) => {
                trace!("Redis aggregate miss: {}", redis_key);
                None
            }
            Err(e) => {
                error!("Failed to get key '{}': {}", redis_key, e);
                self.reset_connection().await;
                None
            }
        }
    }

    async fn set(&self, key: &AggregateKey, value: AggregateSnapshot, ttl: Duration) {
        let redis_key = self.make_key(key);
        let payload = match serde_json::to_string(&value) {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to serialize aggregate '{}': {}", redis_key, e);
                return;
            }
        };

        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return;
            }
        };

        // SET EX 不接受 0 秒
        let ttl_secs = ttl.as_secs().max(1);
        if let Err(e) = conn
            .set_ex::<_, _, ()>(&redis_key, payload, ttl_secs)
            .await
        {
            error!("Failed to set key '{}': {}", redis_key, e);
            self.reset_connection().await;
        }
    }

    async fn invalidate_all(&self) {
        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to get Redis connection: {}", e);
                self.reset_connection().await;
                return;
            }
        };

        match self.delete_by_prefix(&mut conn).await {
            Ok(n) => debug!("Removed {} aggregate keys with prefix '{}'", n, self.key_prefix),
            Err(e) => {
                error!("Failed to invalidate aggregate cache: {}", e);
                self.reset_connection().await;
            }
        }
    }
}
