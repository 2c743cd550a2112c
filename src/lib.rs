//! Folio - 图书目录、借阅与报表核心
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Book / Reader / Lending / Reporting 上下文
//! - 领域事件（自描述 JSON，kind 即队列名）
//!
//! 应用层 (application/):
//! - Ports: 仓储、缓存、对象存储、事件发布端口
//! - Cache: 类型化缓存网关与失效计划
//! - Commands / Queries: CQRS 处理器
//! - Consumers: 活动日志与报表生成
//!
//! 基础设施层 (infrastructure/):
//! - Persistence: SQLite + Sled 缓存
//! - Broker: sled 持久队列
//! - Events: 事件发布
//! - Worker: 队列调度器、consumer supervisor、缓存清理
//! - Blob: object_store 对象存储
//! - Memory: DashMap 仓储

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
mod test_support;

pub use config::{load_config, AppConfig};
