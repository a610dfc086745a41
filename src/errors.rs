use std::fmt;

#[derive(Debug, Clone)]
pub enum ReaccessError {
    CacheConnection(String),
    CachePluginNotFound(String),
    Configuration(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    Validation(String),
    NotFound(String),
    Serialization(String),
    DateParse(String),
    FeedSource(String),
}

impl ReaccessError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ReaccessError::CacheConnection(_) => "E001",
            ReaccessError::CachePluginNotFound(_) => "E002",
            ReaccessError::Configuration(_) => "E003",
            ReaccessError::DatabaseConfig(_) => "E004",
            ReaccessError::DatabaseConnection(_) => "E005",
            ReaccessError::DatabaseOperation(_) => "E006",
            ReaccessError::Validation(_) => "E007",
            ReaccessError::NotFound(_) => "E008",
            ReaccessError::Serialization(_) => "E009",
            ReaccessError::DateParse(_) => "E010",
            ReaccessError::FeedSource(_) => "E011",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            ReaccessError::CacheConnection(_) => "Cache Connection Error",
            ReaccessError::CachePluginNotFound(_) => "Cache Plugin Not Found",
            ReaccessError::Configuration(_) => "Configuration Error",
            ReaccessError::DatabaseConfig(_) => "Database Configuration Error",
            ReaccessError::DatabaseConnection(_) => "Database Connection Error",
            ReaccessError::DatabaseOperation(_) => "Database Operation Error",
            ReaccessError::Validation(_) => "Validation Error",
            ReaccessError::NotFound(_) => "Resource Not Found",
            ReaccessError::Serialization(_) => "Serialization Error",
            ReaccessError::DateParse(_) => "Date Parse Error",
            ReaccessError::FeedSource(_) => "Feed Source Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            ReaccessError::CacheConnection(msg)
            | ReaccessError::CachePluginNotFound(msg)
            | ReaccessError::Configuration(msg)
            | ReaccessError::DatabaseConfig(msg)
            | ReaccessError::DatabaseConnection(msg)
            | ReaccessError::DatabaseOperation(msg)
            | ReaccessError::Validation(msg)
            | ReaccessError::NotFound(msg)
            | ReaccessError::Serialization(msg)
            | ReaccessError::DateParse(msg)
            | ReaccessError::FeedSource(msg) => msg,
        }
    }

    /// 存储层不可用（连接或执行失败），调用方应降级而不是中断渲染
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            ReaccessError::DatabaseConnection(_) | ReaccessError::DatabaseOperation(_)
        )
    }

    /// 格式化为简洁输出（用于 CLI）
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for ReaccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for ReaccessError {}

// 便捷的构造函数
impl ReaccessError {
    pub fn cache_connection<T: Into<String>>(msg: T) -> Self {
        ReaccessError::CacheConnection(msg.into())
    }

    pub fn cache_plugin_not_found<T: Into<String>>(msg: T) -> Self {
        ReaccessError::CachePluginNotFound(msg.into())
    }

    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        ReaccessError::Configuration(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        ReaccessError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        ReaccessError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        ReaccessError::DatabaseOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        ReaccessError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        ReaccessError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        ReaccessError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        ReaccessError::DateParse(msg.into())
    }

    pub fn feed_source<T: Into<String>>(msg: T) -> Self {
        ReaccessError::FeedSource(msg.into())
    }
}

impl From<sea_orm::DbErr> for ReaccessError {
    fn from(err: sea_orm::DbErr) -> Self {
        match err {
            sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_) => {
                ReaccessError::DatabaseConnection(err.to_string())
            }
            other => ReaccessError::DatabaseOperation(other.to_string()),
        }
    }
}

impl From<sea_orm::TransactionError<sea_orm::DbErr>> for ReaccessError {
    fn from(err: sea_orm::TransactionError<sea_orm::DbErr>) -> Self {
        match err {
            sea_orm::TransactionError::Connection(e)
            | sea_orm::TransactionError::Transaction(e) => e.into(),
        }
    }
}

impl From<serde_json::Error> for ReaccessError {
    fn from(err: serde_json::Error) -> Self {
        ReaccessError::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for ReaccessError {
    fn from(err: redis::RedisError) -> Self {
        ReaccessError::CacheConnection(err.to_string())
    }
}

impl From<chrono::ParseError> for ReaccessError {
    fn from(err: chrono::ParseError) -> Self {
        ReaccessError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ReaccessError>;
