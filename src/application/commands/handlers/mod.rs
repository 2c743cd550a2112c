//! Command Handlers 实现
//!
//! 写路径统一流程：加载 → 校验 → 失效缓存 → 持久化 → 发布事件；
//! 意外失败在 handler 边界包装为 `ApplicationError::Service`

mod book_handlers;
mod library_handlers;
mod reader_handlers;
mod report_handlers;

pub use book_handlers::*;
pub use library_handlers::*;
pub use reader_handlers::*;
pub use report_handlers::*;
