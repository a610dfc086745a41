pub mod moka;
pub mod null;
pub mod redis;

pub use moka::MokaAggregateCache;
pub use null::NullAggregateCache;
pub use redis::RedisAggregateCache;
