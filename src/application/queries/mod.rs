//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：列表与详情走 cache-aside，活动日志直接查存储

mod book_queries;
mod library_queries;
mod reader_queries;
mod report_queries;

pub mod handlers;

pub use book_queries::*;
pub use library_queries::*;
pub use reader_queries::*;
pub use report_queries::*;
