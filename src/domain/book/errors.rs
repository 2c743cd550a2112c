//! Book Context - Errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookError {
    #[error("Book is archived")]
    Archived,

    #[error("Book is already archived")]
    AlreadyArchived,

    #[error("Book cannot be archived while it is borrowed")]
    CannotArchive,

    #[error("Book is not available for borrowing")]
    NotAvailable,

    #[error("Book must have at least one author")]
    NoAuthors,

    #[error("Book title cannot be empty")]
    EmptyTitle,
}
