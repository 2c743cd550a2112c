//! Cache - 读穿透缓存
//!
//! - keys: key 格式与 TTL
//! - gateway: 类型化、不抛错的缓存门面
//! - invalidation: 写路径需要失效的 key / 前缀

mod gateway;
pub mod invalidation;
pub mod keys;

pub use gateway::CacheGateway;
pub use invalidation::{BookDimensions, InvalidationPlan};
