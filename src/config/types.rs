//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::events::{EventPayload, EventType, ReportCreate};
use crate::infrastructure::blob::BlobStoreConfig;
use crate::infrastructure::broker::BrokerConfig;
use crate::infrastructure::persistence::sled::SledCacheConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 数据库配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 消息队列配置
    #[serde(default)]
    pub broker: BrokerSettings,

    /// 对象存储配置
    #[serde(default)]
    pub blob: BlobConfig,

    /// 启动的消费队列
    #[serde(default)]
    pub queues: QueuesConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 数据库配置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// 数据库文件路径
    #[serde(default = "default_db_path")]
    pub path: String,

    /// 最大连接数
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/folio.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// 获取数据库 URL
    pub fn database_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.path)
    }
}

/// 缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// sled 数据目录
    #[serde(default = "default_cache_path")]
    pub path: String,

    /// 过期条目清理间隔（秒）
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_cache_path() -> String {
    "data/cache.sled".to_string()
}

fn default_sweep_interval() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl CacheConfig {
    pub fn store_config(&self) -> SledCacheConfig {
        SledCacheConfig {
            db_path: self.path.clone(),
        }
    }
}

/// 消息队列配置
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerSettings {
    /// sled 数据目录
    #[serde(default = "default_broker_path")]
    pub path: String,

    /// 持久消息在发布确认前刷盘
    #[serde(default = "default_flush_on_publish")]
    pub flush_on_publish: bool,
}

fn default_broker_path() -> String {
    "data/broker.sled".to_string()
}

fn default_flush_on_publish() -> bool {
    true
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            path: default_broker_path(),
            flush_on_publish: default_flush_on_publish(),
        }
    }
}

impl BrokerSettings {
    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            path: self.path.clone(),
            flush_on_publish: self.flush_on_publish,
        }
    }
}

/// 对象存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobBackend {
    /// 进程内存（重启丢失）
    Memory,
    /// 本地目录
    #[default]
    Local,
}

/// 对象存储配置
#[derive(Debug, Clone, Deserialize)]
pub struct BlobConfig {
    #[serde(default)]
    pub backend: BlobBackend,

    /// local 后端的根目录
    #[serde(default = "default_blob_root")]
    pub root: PathBuf,

    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// 预签名 URL 的公开前缀
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// URL 签名密钥
    #[serde(default = "default_signing_secret")]
    pub signing_secret: String,

    /// 预签名 URL 有效期（分钟）
    #[serde(default = "default_url_ttl_minutes")]
    pub url_ttl_minutes: u32,
}

fn default_blob_root() -> PathBuf {
    PathBuf::from("data/blobs")
}

fn default_bucket() -> String {
    "folio".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_signing_secret() -> String {
    "change-me".to_string()
}

fn default_url_ttl_minutes() -> u32 {
    60
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            backend: BlobBackend::default(),
            root: default_blob_root(),
            bucket: default_bucket(),
            public_base_url: default_public_base_url(),
            signing_secret: default_signing_secret(),
            url_ttl_minutes: default_url_ttl_minutes(),
        }
    }
}

impl BlobConfig {
    pub fn store_config(&self) -> BlobStoreConfig {
        BlobStoreConfig {
            bucket: self.bucket.clone(),
            public_base_url: self.public_base_url.clone(),
            signing_secret: self.signing_secret.clone(),
        }
    }
}

/// 消费队列配置
#[derive(Debug, Clone, Deserialize)]
pub struct QueuesConfig {
    /// 队列名（即事件 kind）
    #[serde(default = "default_queue_names")]
    pub names: Vec<String>,
}

/// 默认消费全部事件 kind
pub fn default_queue_names() -> Vec<String> {
    EventType::ALL
        .iter()
        .map(|t| t.as_str().to_string())
        .chain(std::iter::once(ReportCreate::KIND.to_string()))
        .collect()
}

impl Default for QueuesConfig {
    fn default() -> Self {
        Self {
            names: default_queue_names(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.path, "data/folio.db");
        assert_eq!(config.blob.backend, BlobBackend::Local);
        assert_eq!(config.blob.url_ttl_minutes, 60);
        assert!(config.broker.flush_on_publish);
    }

    #[test]
    fn test_database_url() {
        let config = DatabaseConfig::default();
        assert_eq!(config.database_url(), "sqlite:data/folio.db?mode=rwc");
    }

    #[test]
    fn test_default_queues_cover_every_kind() {
        let names = default_queue_names();
        assert_eq!(names.len(), 7);
        assert!(names.iter().any(|n| n == "book.borrowed"));
        assert!(names.iter().any(|n| n == "report.create"));
    }
}
