//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现

pub mod blob;
pub mod broker;
pub mod events;
pub mod memory;
pub mod persistence;
pub mod worker;

pub use blob::{BlobStoreConfig, ObjectStoreBlobStore};
pub use broker::{BrokerConfig, SharedConnection};
pub use events::BrokerEventPublisher;
pub use persistence::sled::SledCacheStore;
pub use worker::{ConsumerSupervisor, QueueDispatcher};
