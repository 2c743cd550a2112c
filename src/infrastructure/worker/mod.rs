//! Worker Layer - 后台任务
//!
//! - 每个事件 kind 一个 `QueueDispatcher`，由 `ConsumerSupervisor` 统一启停
//! - 缓存过期条目的定期清理

mod dispatcher;
mod supervisor;
mod sweeper;

pub use dispatcher::{DispatchError, Dispatcher, DispatcherState, QueueDispatcher};
pub use supervisor::ConsumerSupervisor;
pub use sweeper::spawn_cache_sweeper;
