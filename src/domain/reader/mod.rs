//! Reader Context - 读者限界上下文

mod aggregate;
mod errors;

pub use aggregate::Reader;
pub use errors::ReaderError;
