//! Query Handlers 实现

mod book_handlers;
mod library_handlers;
mod reader_handlers;
mod report_handlers;

pub use book_handlers::*;
pub use library_handlers::*;
pub use reader_handlers::*;
pub use report_handlers::*;
