//! Broker connection

use dashmap::DashMap;
use sled::{Db, Tree};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Notify, OnceCell};
use tokio_util::sync::CancellationToken;

use super::Channel;

/// Broker 错误
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Broker storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Message encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("Invalid queue name: {0:?}")]
    InvalidQueue(String),

    #[error("Channel {0} is closed")]
    ChannelClosed(u64),

    #[error("Unknown consumer tag: {0}")]
    UnknownConsumer(String),

    #[error("Broker connection failed: {0}")]
    Connect(String),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Broker 配置
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// 数据库路径
    pub path: String,
    /// 持久消息在确认前是否刷盘
    pub flush_on_publish: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            path: "data/broker.sled".to_string(),
            flush_on_publish: true,
        }
    }
}

/// Broker 连接
///
/// 可被多个 channel 并发使用
pub struct BrokerConnection {
    db: Db,
    signals: DashMap<String, Arc<Notify>>,
    next_channel_id: AtomicU64,
    flush_on_publish: bool,
}

impl BrokerConnection {
    /// 打开（或创建）broker 数据库
    pub async fn open(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let path = config.path.clone();
        let db = tokio::task::spawn_blocking(move || sled::open(path))
            .await
            .map_err(|e| BrokerError::Connect(e.to_string()))??;

        tracing::info!(path = %config.path, "Broker connection established");
        Ok(Self::with_db(db, config.flush_on_publish))
    }

    /// 临时 broker（进程退出即删除）
    pub fn temporary() -> Result<Self, BrokerError> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self::with_db(db, false))
    }

    fn with_db(db: Db, flush_on_publish: bool) -> Self {
        Self {
            db,
            signals: DashMap::new(),
            next_channel_id: AtomicU64::new(1),
            flush_on_publish,
        }
    }

    /// 打开新 channel
    pub fn create_channel(self: &Arc<Self>) -> Channel {
        let id = self.next_channel_id.fetch_add(1, Ordering::Relaxed);
        Channel::new(id, Arc::clone(self))
    }

    /// 队列当前消息数
    pub fn queue_len(&self, queue: &str) -> Result<usize, BrokerError> {
        Ok(self.queue_tree(queue)?.len())
    }

    pub(super) fn queue_tree(&self, queue: &str) -> Result<Tree, BrokerError> {
        if queue.trim().is_empty() {
            return Err(BrokerError::InvalidQueue(queue.to_string()));
        }
        Ok(self.db.open_tree(format!("queue:{}", queue))?)
    }

    pub(super) fn signal(&self, queue: &str) -> Arc<Notify> {
        self.signals
            .entry(queue.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    pub(super) fn next_message_id(&self) -> Result<u64, BrokerError> {
        Ok(self.db.generate_id()?)
    }

    pub(super) fn flush_on_publish(&self) -> bool {
        self.flush_on_publish
    }
}

/// 进程内共享的惰性连接
///
/// 首次使用时建立，之后 publisher 与所有 dispatcher 共用同一连接
pub struct SharedConnection {
    config: BrokerConfig,
    cell: OnceCell<Arc<BrokerConnection>>,
}

impl SharedConnection {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            config,
            cell: OnceCell::new(),
        }
    }

    /// 使用已建立的连接
    pub fn from_connection(connection: Arc<BrokerConnection>) -> Self {
        Self {
            config: BrokerConfig::default(),
            cell: OnceCell::new_with(Some(connection)),
        }
    }

    /// 获取连接；首次调用时建立，可被取消
    pub async fn get(&self, cancel: &CancellationToken) -> Result<Arc<BrokerConnection>, BrokerError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(BrokerError::Cancelled),
            result = self.cell.get_or_try_init(|| async {
                BrokerConnection::open(&self.config).await.map(Arc::new)
            }) => result.cloned(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.cell.initialized()
    }
}
