//! Lending Context - 借阅记录

mod borrow;
mod errors;

pub use borrow::{Borrow, BorrowStatus, LOAN_PERIOD_DAYS};
pub use errors::BorrowError;
