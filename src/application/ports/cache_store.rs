//! Cache Store Port - 键值缓存
//!
//! 字节级、可失败的缓存后端接口；类型化与容错在 `CacheGateway` 中完成

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// 缓存错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Cache Store Port
///
/// - 每个 key 带绝对过期时间
/// - 写入同时登记到 key 注册表，支持按前缀批量删除
#[async_trait]
pub trait CacheStorePort: Send + Sync {
    /// 读取未过期的值
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// 写入值，过期时间 = now + ttl
    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// 删除 key（幂等）
    async fn remove(&self, key: &str) -> Result<(), CacheError>;

    /// 删除扫描开始时注册表中所有以 prefix 开头的 key，返回删除数量
    async fn remove_by_prefix(&self, prefix: &str) -> Result<usize, CacheError>;

    /// 清理已过期条目，返回清理数量
    async fn purge_expired(&self) -> Result<usize, CacheError>;
}
