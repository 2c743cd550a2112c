//! Sled-based TTL Cache Store Implementation
//!
//! 两棵树:
//! - `entries`: key -> bincode(InternalCacheEntry)
//! - `registry`: key -> 过期时间（毫秒，大端），按 key 有序，供前缀扫描
//!
//! 条目与注册表在同一个事务中写入 / 删除，注册表不会漏记仍可能存在的 key

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sled::transaction::{ConflictableTransactionResult, TransactionError, Transactional};
use sled::{Db, Tree};
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{CacheError, CacheStorePort};

const ENTRIES_TREE: &str = "cache_entries";
const REGISTRY_TREE: &str = "cache_registry";

/// Sled 缓存配置
#[derive(Debug, Clone)]
pub struct SledCacheConfig {
    /// 数据库路径
    pub db_path: String,
}

impl Default for SledCacheConfig {
    fn default() -> Self {
        Self {
            db_path: "data/cache.sled".to_string(),
        }
    }
}

/// 内部缓存条目
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InternalCacheEntry {
    value: Vec<u8>,
    expires_at_ms: i64,
    created_at_ms: i64,
}

impl InternalCacheEntry {
    fn is_expired(&self, now_ms: i64) -> bool {
        self.expires_at_ms <= now_ms
    }
}

/// Sled TTL 缓存
pub struct SledCacheStore {
    entries: Tree,
    registry: Tree,
}

impl SledCacheStore {
    /// 打开（或创建）缓存数据库
    pub async fn open(config: &SledCacheConfig) -> Result<Self, CacheError> {
        let path = config.db_path.clone();
        let db = tokio::task::spawn_blocking(move || sled::open(path))
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;

        let store = Self::from_db(&db)?;
        tracing::info!(
            db_path = %config.db_path,
            entries = store.entries.len(),
            "SledCacheStore initialized"
        );
        Ok(store)
    }

    /// 使用已打开的数据库
    pub fn from_db(db: &Db) -> Result<Self, CacheError> {
        let entries = db
            .open_tree(ENTRIES_TREE)
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
        let registry = db
            .open_tree(REGISTRY_TREE)
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
        Ok(Self { entries, registry })
    }

    /// 临时数据库（进程退出即删除）
    pub fn temporary() -> Result<Self, CacheError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
        Self::from_db(&db)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 刷新数据库
    pub async fn flush(&self) -> Result<(), CacheError> {
        self.entries
            .flush_async()
            .await
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    /// 原子删除条目与注册记录；`only_if_expired` 时仅在条目仍过期时删除
    fn remove_entry(&self, key: &str, only_if_expired: Option<i64>) -> Result<bool, CacheError> {
        let result = (&self.entries, &self.registry).transaction(
            |(entries, registry)| -> ConflictableTransactionResult<bool, ()> {
                if let Some(now_ms) = only_if_expired {
                    let still_expired = match entries.get(key.as_bytes())? {
                        Some(bytes) => bincode::deserialize::<InternalCacheEntry>(&bytes)
                            .map(|entry| entry.is_expired(now_ms))
                            .unwrap_or(true),
                        None => true,
                    };
                    if !still_expired {
                        return Ok(false);
                    }
                }
                let had_entry = entries.remove(key.as_bytes())?.is_some();
                let registered = registry.remove(key.as_bytes())?.is_some();
                Ok(had_entry || registered)
            },
        );
        result.map_err(map_transaction_error)
    }
}

fn map_transaction_error(err: TransactionError<()>) -> CacheError {
    match err {
        TransactionError::Abort(()) => CacheError::DatabaseError("transaction aborted".to_string()),
        TransactionError::Storage(e) => CacheError::DatabaseError(e.to_string()),
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[async_trait]
impl CacheStorePort for SledCacheStore {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let Some(data) = self
            .entries
            .get(key.as_bytes())
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?
        else {
            return Ok(None);
        };

        let entry: InternalCacheEntry = bincode::deserialize(&data)
            .map_err(|e| CacheError::SerializationError(e.to_string()))?;

        let now = now_ms();
        if entry.is_expired(now) {
            // 惰性淘汰
            self.remove_entry(key, Some(now))?;
            tracing::debug!(key, "Expired cache entry evicted on read");
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let now = now_ms();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at_ms = now.saturating_add(ttl_ms);
        let size = value.len();

        let entry = InternalCacheEntry {
            value,
            expires_at_ms,
            created_at_ms: now,
        };
        let entry_bytes =
            bincode::serialize(&entry).map_err(|e| CacheError::SerializationError(e.to_string()))?;
        let expiry_bytes = expires_at_ms.to_be_bytes();

        (&self.entries, &self.registry)
            .transaction(|(entries, registry)| -> ConflictableTransactionResult<(), ()> {
                entries.insert(key.as_bytes(), entry_bytes.as_slice())?;
                registry.insert(key.as_bytes(), &expiry_bytes[..])?;
                Ok(())
            })
            .map_err(map_transaction_error)?;

        tracing::debug!(key, size, ttl_secs = ttl.as_secs(), "Cache entry stored");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        self.remove_entry(key, None)?;
        Ok(())
    }

    async fn remove_by_prefix(&self, prefix: &str) -> Result<usize, CacheError> {
        // 先对注册表做快照，扫描开始后新增的 key 不保证被删除
        let keys: Vec<sled::IVec> = self
            .registry
            .scan_prefix(prefix.as_bytes())
            .keys()
            .collect::<Result<_, _>>()
            .map_err(|e| CacheError::DatabaseError(e.to_string()))?;

        let mut removed = 0;
        for key in keys {
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| CacheError::SerializationError(e.to_string()))?;
            if self.remove_entry(&key, None)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        let now = now_ms();
        let mut purged = 0;

        for item in self.registry.iter() {
            let (key, expiry) = item.map_err(|e| CacheError::DatabaseError(e.to_string()))?;
            let expires_at_ms = <[u8; 8]>::try_from(expiry.as_ref())
                .map(i64::from_be_bytes)
                .unwrap_or(i64::MIN);
            if expires_at_ms > now {
                continue;
            }
            let key = String::from_utf8(key.to_vec())
                .map_err(|e| CacheError::SerializationError(e.to_string()))?;
            if self.remove_entry(&key, Some(now))? {
                purged += 1;
            }
        }

        if purged > 0 {
            tracing::debug!(purged, "Expired cache entries purged");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_set_get_remove() {
        let cache = SledCacheStore::temporary().unwrap();

        cache.set_raw("a", vec![1, 2, 3], Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get_raw("a").await.unwrap(), Some(vec![1, 2, 3]));

        cache.remove("a").await.unwrap();
        assert_eq!(cache.get_raw("a").await.unwrap(), None);
        assert_eq!(cache.registry.len(), 0);

        // 幂等
        cache.remove("a").await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_entry_is_evicted_on_read() {
        let cache = SledCacheStore::temporary().unwrap();

        cache.set_raw("a", vec![1], Duration::ZERO).await.unwrap();
        assert_eq!(cache.get_raw("a").await.unwrap(), None);
        assert!(cache.entries.is_empty());
        assert!(cache.registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove_by_prefix_only_touches_matching_keys() {
        let cache = SledCacheStore::temporary().unwrap();
        let ttl = Duration::from_secs(60);

        cache.set_raw("books:list:x:1:10", vec![1], ttl).await.unwrap();
        cache.set_raw("books:list:x:2:10", vec![2], ttl).await.unwrap();
        cache.set_raw("books:list:y:1:10", vec![3], ttl).await.unwrap();
        cache.set_raw("book:details:1", vec![4], ttl).await.unwrap();

        assert_eq!(cache.remove_by_prefix("books:list:x:").await.unwrap(), 2);
        assert_eq!(cache.get_raw("books:list:x:1:10").await.unwrap(), None);
        assert_eq!(cache.get_raw("books:list:x:2:10").await.unwrap(), None);
        assert_eq!(cache.get_raw("books:list:y:1:10").await.unwrap(), Some(vec![3]));
        assert_eq!(cache.get_raw("book:details:1").await.unwrap(), Some(vec![4]));

        assert_eq!(cache.remove_by_prefix("books:list:x:").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = SledCacheStore::temporary().unwrap();

        cache.set_raw("old", vec![1], Duration::ZERO).await.unwrap();
        cache.set_raw("fresh", vec![2], Duration::from_secs(60)).await.unwrap();

        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert_eq!(cache.registry.len(), 1);
        assert_eq!(cache.get_raw("fresh").await.unwrap(), Some(vec![2]));
    }

    #[tokio::test]
    async fn test_open_on_disk() {
        let dir = tempdir().unwrap();
        let config = SledCacheConfig {
            db_path: dir.path().join("cache.sled").to_string_lossy().to_string(),
        };

        let cache = SledCacheStore::open(&config).await.unwrap();
        cache.set_raw("k", b"v".to_vec(), Duration::from_secs(60)).await.unwrap();
        cache.flush().await.unwrap();
        assert_eq!(cache.get_raw("k").await.unwrap(), Some(b"v".to_vec()));
    }
}
