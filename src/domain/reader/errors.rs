//! Reader Context - Errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReaderError {
    #[error("Reader card cannot be extended")]
    CannotExtend,

    #[error("Reader card is already closed")]
    AlreadyClosed,

    #[error("Reader card is inactive or expired")]
    CardInactive,

    #[error("New expiry date cannot be earlier than today")]
    ExpiryInPast,

    #[error("Full name cannot be empty")]
    EmptyName,

    #[error("Phone number cannot be empty")]
    EmptyPhone,
}
