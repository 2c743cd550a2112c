//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{default_queue_names, AppConfig, BlobBackend};
use crate::application::cache::keys;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// # 环境变量示例
/// - `FOLIO_DATABASE__PATH=/data/folio.db`
/// - `FOLIO_BROKER__PATH=/data/broker.sled`
/// - `FOLIO_BLOB__BACKEND=memory`
/// - `FOLIO_QUEUES__NAMES=book.created,report.create`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// `config_path` 为 None 时搜索 config.toml / config.local.toml
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    builder = builder
        .set_default("database.path", "data/folio.db")?
        .set_default("database.max_connections", 5)?
        .set_default("cache.path", "data/cache.sled")?
        .set_default("cache.sweep_interval_secs", 300)?
        .set_default("broker.path", "data/broker.sled")?
        .set_default("broker.flush_on_publish", true)?
        .set_default("blob.backend", "local")?
        .set_default("blob.root", "data/blobs")?
        .set_default("blob.bucket", "folio")?
        .set_default("blob.public_base_url", "http://localhost:9000")?
        .set_default("blob.signing_secret", "change-me")?
        .set_default("blob.url_ttl_minutes", 60)?
        .set_default("queues.names", default_queue_names())?
        .set_default("log.level", "info")?;

    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 前缀 FOLIO_，层级分隔符 __，队列名以逗号分隔
    builder = builder.add_source(
        Environment::with_prefix("FOLIO")
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("queues.names")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    let required_paths = [
        ("Database path", config.database.path.as_str()),
        ("Cache path", config.cache.path.as_str()),
        ("Broker path", config.broker.path.as_str()),
    ];
    for (name, value) in required_paths {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!("{} cannot be empty", name)));
        }
    }

    if config.cache.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "Cache sweep interval cannot be 0".to_string(),
        ));
    }

    if config.blob.bucket.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "Blob bucket cannot be empty".to_string(),
        ));
    }

    if config.blob.backend == BlobBackend::Local && config.blob.root.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Blob root cannot be empty for the local backend".to_string(),
        ));
    }

    if config.blob.url_ttl_minutes == 0 {
        return Err(ConfigError::ValidationError(
            "Blob URL TTL cannot be 0".to_string(),
        ));
    }

    // 缓存中的封面 URL 不能先于缓存条目过期
    let longest_cover_ttl = keys::BOOK_LIST_TTL.max(keys::BOOK_DETAILS_TTL);
    if u64::from(config.blob.url_ttl_minutes) * 60 < longest_cover_ttl.as_secs() {
        return Err(ConfigError::ValidationError(format!(
            "Blob URL TTL must be at least {} minutes",
            longest_cover_ttl.as_secs() / 60
        )));
    }

    if config.queues.names.iter().any(|name| name.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "Queue names cannot be blank".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Database: {}", config.database.path);
    tracing::info!("Database Max Connections: {}", config.database.max_connections);
    tracing::info!("Cache: {}", config.cache.path);
    tracing::info!("Cache Sweep Interval: {}s", config.cache.sweep_interval_secs);
    tracing::info!("Broker: {}", config.broker.path);
    tracing::info!("Broker Flush On Publish: {}", config.broker.flush_on_publish);
    tracing::info!("Blob Backend: {:?}", config.blob.backend);
    if config.blob.backend == BlobBackend::Local {
        tracing::info!("Blob Root: {:?}", config.blob.root);
    }
    tracing::info!("Blob Bucket: {}", config.blob.bucket);
    tracing::info!("Blob Public URL: {}", config.blob.public_base_url);
    tracing::info!("Queues: {}", config.queues.names.join(", "));
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
