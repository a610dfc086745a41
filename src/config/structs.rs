use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 静态配置（启动时从 TOML 和环境变量加载）
///
/// - database: 数据库连接与重试
/// - cache: 聚合缓存后端与 TTL
/// - logging: 日志输出
/// - ranking: 排行榜与槽位默认值
/// - tracking: 访问记录时的 URL 别名
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > 配置文件 > 默认值
    /// ENV 前缀：RA，分隔符：__
    /// 示例：RA__CACHE__TYPE=redis
    pub fn load(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or("config.toml");

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("RA")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("# Error generating sample config: {}", e))
    }

    /// 保存配置到 TOML 文件
    pub fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> crate::errors::Result<()> {
        use crate::errors::ReaccessError;

        let content = toml::to_string_pretty(self)
            .map_err(|e| ReaccessError::serialization(format!("TOML 序列化失败: {}", e)))?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                ReaccessError::configuration(format!("无法创建目录 {}: {}", parent.display(), e))
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| {
            ReaccessError::configuration(format!(
                "无法写入配置文件 {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// memory | redis | null
    #[serde(rename = "type")]
    #[serde(default = "default_cache_type")]
    pub cache_type: String,
    /// 槽位子集聚合的 TTL（秒）
    #[serde(default = "default_subset_ttl_secs")]
    pub subset_ttl_secs: u64,
    /// 全站聚合的 TTL（秒）
    #[serde(default = "default_registry_ttl_secs")]
    pub registry_ttl_secs: u64,
    /// 选择器内槽位配置的缓存时长（秒）
    #[serde(default = "default_slot_config_ttl_secs")]
    pub slot_config_ttl_secs: u64,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_capacity")]
    pub max_capacity: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// text | json
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_period_days")]
    pub period_days: u32,
    #[serde(default = "default_ranking_limit")]
    pub limit: usize,
}

/// 站点换过域名或有镜像时，把旧地址映射到注册地址
///
/// key 是 `normalize_url` 的结果（整条或仅域名），value 也写成同样的
/// `host[/path]` 形式。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackingConfig {
    #[serde(default)]
    pub url_aliases: HashMap<String, String>,
}

// ============================================================
// Default value functions
// ============================================================

fn default_database_url() -> String {
    "reaccess.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_cache_type() -> String {
    "memory".to_string()
}

fn default_subset_ttl_secs() -> u64 {
    20 * 60
}

fn default_registry_ttl_secs() -> u64 {
    10 * 60
}

fn default_slot_config_ttl_secs() -> u64 {
    60
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379/".to_string()
}

fn default_redis_key_prefix() -> String {
    "reaccess:".to_string()
}

fn default_memory_capacity() -> u64 {
    10000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_period_days() -> u32 {
    crate::storage::models::DEFAULT_PERIOD_DAYS
}

fn default_ranking_limit() -> usize {
    10
}

// ============================================================
// Default implementations
// ============================================================

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: default_cache_type(),
            subset_ttl_secs: default_subset_ttl_secs(),
            registry_ttl_secs: default_registry_ttl_secs(),
            slot_config_ttl_secs: default_slot_config_ttl_secs(),
            redis: RedisConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            key_prefix: default_redis_key_prefix(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_capacity: default_memory_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            period_days: default_period_days(),
            limit: default_ranking_limit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StaticConfig::default();
        assert_eq!(config.database.database_url, "reaccess.db");
        assert_eq!(config.cache.cache_type, "memory");
        assert_eq!(config.cache.subset_ttl_secs, 1200);
        assert_eq!(config.cache.registry_ttl_secs, 600);
        assert_eq!(config.ranking.period_days, 7);
        assert_eq!(config.ranking.limit, 10);
    }

    #[test]
    fn test_sample_config_roundtrips() {
        let sample = StaticConfig::generate_sample_config();
        assert!(sample.contains("[cache]"));
        assert!(sample.contains("type = \"memory\""));

        let parsed: StaticConfig = toml::from_str(&sample).unwrap();
        assert_eq!(parsed.cache.subset_ttl_secs, 1200);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: StaticConfig = toml::from_str(
            r#"
            [cache]
            type = "null"

            [ranking]
            limit = 25
            "#,
        )
        .unwrap();
        assert_eq!(parsed.cache.cache_type, "null");
        assert_eq!(parsed.cache.registry_ttl_secs, 600);
        assert_eq!(parsed.ranking.limit, 25);
        assert_eq!(parsed.database.retry_count, 3);
        assert!(parsed.tracking.url_aliases.is_empty());
    }

    #[test]
    fn test_tracking_aliases_from_toml() {
        let parsed: StaticConfig = toml::from_str(
            r#"
            [tracking.url_aliases]
            "old.example" = "new.example"
            "#,
        )
        .unwrap();
        assert_eq!(
            parsed.tracking.url_aliases.get("old.example").map(String::as_str),
            Some("new.example")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reaccess.toml");
        std::fs::write(&path, "[database]\ndatabase_url = \"sqlite://custom.db\"\n").unwrap();

        let config = StaticConfig::load(path.to_str());
        assert_eq!(config.database.database_url, "sqlite://custom.db");
        assert_eq!(config.cache.cache_type, "memory");
    }
}
