//! Cache Gateway - 类型化缓存门面
//!
//! 缓存失败从不影响业务：读失败视为未命中，写 / 删失败只记录 warn

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::application::error::ApplicationError;
use crate::application::ports::CacheStorePort;

/// Cache Gateway
#[derive(Clone)]
pub struct CacheGateway {
    store: Arc<dyn CacheStorePort>,
}

impl CacheGateway {
    pub fn new(store: Arc<dyn CacheStorePort>) -> Self {
        Self { store }
    }

    /// 读取并反序列化；缺失、过期、无法解码或后端失败均返回 None
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.store.get_raw(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => {
                tracing::debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Cached value could not be decoded");
                None
            }
        }
    }

    /// 写入，过期时间 = now + ttl
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache value could not be encoded");
                return;
            }
        };

        if let Err(e) = self.store.set_raw(key, bytes, ttl).await {
            tracing::warn!(key, error = %e, "Cache write failed");
        }
    }

    /// 删除（幂等）
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key).await {
            tracing::warn!(key, error = %e, "Cache remove failed");
        }
    }

    /// 按前缀删除，返回删除数量（失败时为 0）
    pub async fn remove_by_prefix(&self, prefix: &str) -> usize {
        match self.store.remove_by_prefix(prefix).await {
            Ok(removed) => {
                tracing::debug!(prefix, removed, "Cache prefix invalidated");
                removed
            }
            Err(e) => {
                tracing::warn!(prefix, error = %e, "Cache prefix remove failed");
                0
            }
        }
    }

    /// Cache-aside：命中直接返回，未命中调用 `load` 并回填
    pub async fn get_or_load<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        load: F,
    ) -> Result<T, ApplicationError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApplicationError>>,
    {
        if let Some(cached) = self.get(key).await {
            return Ok(cached);
        }

        let value = load().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sled::SledCacheStore;
    use crate::test_support::FailingCacheStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u32,
        name: String,
    }

    fn gateway() -> CacheGateway {
        CacheGateway::new(Arc::new(SledCacheStore::temporary().unwrap()))
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let cache = gateway();
        let item = Item {
            id: 1,
            name: "a".to_string(),
        };

        cache.set("item:1", &item, Duration::from_secs(60)).await;
        assert_eq!(cache.get::<Item>("item:1").await, Some(item));

        cache.remove("item:1").await;
        cache.remove("item:1").await;
        assert_eq!(cache.get::<Item>("item:1").await, None);
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_miss() {
        let cache = gateway();
        cache.set("item:1", &"not an item", Duration::from_secs(60)).await;
        assert_eq!(cache.get::<Item>("item:1").await, None);
    }

    #[tokio::test]
    async fn test_prefix_removal() {
        let cache = gateway();
        for page in 1..=3 {
            cache.set(&format!("books:list:abc:{page}:10"), &page, Duration::from_secs(60)).await;
        }
        cache.set("books:list:abd:1:10", &9, Duration::from_secs(60)).await;

        assert_eq!(cache.remove_by_prefix("books:list:abc:").await, 3);
        for page in 1..=3 {
            assert_eq!(cache.get::<i32>(&format!("books:list:abc:{page}:10")).await, None);
        }
        assert_eq!(cache.get::<i32>("books:list:abd:1:10").await, Some(9));
    }

    #[tokio::test]
    async fn test_get_or_load_serves_second_call_from_cache() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let cache = gateway();
        let calls = Arc::new(AtomicU32::new(0));
        let loader = |calls: Arc<AtomicU32>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ApplicationError>(vec![1, 2, 3])
            }
        };

        let first: Vec<i32> = cache
            .get_or_load("k", Duration::from_secs(60), loader(calls.clone()))
            .await
            .unwrap();
        let second: Vec<i32> = cache
            .get_or_load("k", Duration::from_secs(60), loader(calls.clone()))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_not_fatal() {
        let cache = CacheGateway::new(Arc::new(FailingCacheStore));

        cache.set("k", &1, Duration::from_secs(60)).await;
        cache.remove("k").await;
        assert_eq!(cache.remove_by_prefix("k").await, 0);
        assert_eq!(cache.get::<i32>("k").await, None);

        let value: i32 = cache
            .get_or_load("k", Duration::from_secs(60), || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
