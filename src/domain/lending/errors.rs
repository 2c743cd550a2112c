//! Lending Context - Errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BorrowError {
    #[error("Book has already been returned")]
    AlreadyReturned,
}
