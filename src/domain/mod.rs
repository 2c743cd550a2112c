//! Domain Layer - 领域层
//!
//! 限界上下文:
//! - Book: 书目
//! - Reader: 读者卡
//! - Lending: 借阅记录
//! - Reporting: 活动日志与报表
//!
//! 以及跨上下文共享的领域事件

pub mod book;
pub mod events;
pub mod lending;
pub mod reader;
pub mod reporting;
