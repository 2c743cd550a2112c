//! Persistence Layer - 数据持久化
//!
//! SQLite 存放业务数据，Sled 存放缓存

pub mod sled;
pub mod sqlite;

pub use self::sled::{SledCacheConfig, SledCacheStore};
