//! Sled Persistence - 嵌入式 KV 存储实现

mod cache_store;

pub use cache_store::{SledCacheConfig, SledCacheStore};
