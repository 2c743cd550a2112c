//! Book Command Handlers

use chrono::{DateTime, Datelike, Utc};
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::cache::{CacheGateway, InvalidationPlan};
use crate::application::commands::{AddBookDetails, ArchiveBook, CreateBook, UpdateBook};
use crate::application::error::ApplicationError;
use crate::application::ports::{BlobStorePort, BookRepositoryPort, EventPublisherPort};
use crate::domain::book::{is_valid_cover_extension, Book, MAX_COVER_SIZE};
use crate::domain::events::{BookArchived, BookCreated};

const SERVICE: &str = "book-service";

async fn load_book(repo: &dyn BookRepositoryPort, book_id: Uuid) -> Result<Book, ApplicationError> {
    repo.find_by_id(book_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("Book", book_id))
}

// ============================================================================
// CreateBook
// ============================================================================

/// CreateBook Handler
pub struct CreateBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    cache: CacheGateway,
    publisher: Arc<dyn EventPublisherPort>,
}

impl CreateBookHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        cache: CacheGateway,
        publisher: Arc<dyn EventPublisherPort>,
    ) -> Self {
        Self {
            book_repo,
            cache,
            publisher,
        }
    }

    pub async fn handle(&self, command: CreateBook) -> Result<Book, ApplicationError> {
        self.execute(command)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to create book"))
    }

    async fn execute(&self, command: CreateBook) -> Result<Book, ApplicationError> {
        let book = Book::new(
            command.title,
            command.kind,
            command.authors,
            command.description,
            command.year,
        )?;

        InvalidationPlan::for_new_book(&book).apply(&self.cache).await;
        self.book_repo.create(&book).await?;

        self.publisher
            .publish(
                BookCreated {
                    book_id: book.id,
                    title: book.title.clone(),
                    category: book.category(),
                    authors: book.authors.clone(),
                    year: book.year,
                }
                .into(),
            )
            .await?;

        tracing::info!(book_id = %book.id, title = %book.title, "Book created");
        Ok(book)
    }
}

// ============================================================================
// UpdateBook
// ============================================================================

/// UpdateBook Handler
pub struct UpdateBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    cache: CacheGateway,
}

impl UpdateBookHandler {
    pub fn new(book_repo: Arc<dyn BookRepositoryPort>, cache: CacheGateway) -> Self {
        Self { book_repo, cache }
    }

    pub async fn handle(&self, command: UpdateBook) -> Result<Book, ApplicationError> {
        self.execute(command)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to update book"))
    }

    async fn execute(&self, command: UpdateBook) -> Result<Book, ApplicationError> {
        let before = load_book(self.book_repo.as_ref(), command.book_id).await?;
        let mut book = before.clone();
        book.update_info(command.title, command.authors, command.description, command.year)?;

        InvalidationPlan::for_book(&before, Some(&book)).apply(&self.cache).await;
        self.book_repo.update(&book).await?;

        tracing::info!(book_id = %book.id, "Book updated");
        Ok(book)
    }
}

// ============================================================================
// ArchiveBook
// ============================================================================

/// 归档响应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveBookResponse {
    pub id: Uuid,
    pub title: String,
    pub archived_at: DateTime<Utc>,
}

/// ArchiveBook Handler
pub struct ArchiveBookHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    cache: CacheGateway,
    publisher: Arc<dyn EventPublisherPort>,
}

impl ArchiveBookHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        cache: CacheGateway,
        publisher: Arc<dyn EventPublisherPort>,
    ) -> Self {
        Self {
            book_repo,
            cache,
            publisher,
        }
    }

    pub async fn handle(&self, command: ArchiveBook) -> Result<ArchiveBookResponse, ApplicationError> {
        self.execute(command)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to archive book"))
    }

    async fn execute(&self, command: ArchiveBook) -> Result<ArchiveBookResponse, ApplicationError> {
        let before = load_book(self.book_repo.as_ref(), command.book_id).await?;
        let mut book = before.clone();
        book.archive()?;

        InvalidationPlan::for_book(&before, Some(&book)).apply(&self.cache).await;
        self.book_repo.update(&book).await?;

        let archived_at = book.updated_at;
        self.publisher
            .publish(
                BookArchived {
                    book_id: book.id,
                    title: book.title.clone(),
                    archived_at,
                }
                .into(),
            )
            .await?;

        tracing::info!(book_id = %book.id, "Book archived");
        Ok(ArchiveBookResponse {
            id: book.id,
            title: book.title,
            archived_at,
        })
    }
}

// ============================================================================
// AddBookDetails
// ============================================================================

/// AddBookDetails Handler - 描述 + 封面
pub struct AddBookDetailsHandler {
    book_repo: Arc<dyn BookRepositoryPort>,
    blob_store: Arc<dyn BlobStorePort>,
    cache: CacheGateway,
}

impl AddBookDetailsHandler {
    pub fn new(
        book_repo: Arc<dyn BookRepositoryPort>,
        blob_store: Arc<dyn BlobStorePort>,
        cache: CacheGateway,
    ) -> Self {
        Self {
            book_repo,
            blob_store,
            cache,
        }
    }

    pub async fn handle(&self, command: AddBookDetails) -> Result<Book, ApplicationError> {
        self.execute(command)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to add book details"))
    }

    async fn execute(&self, command: AddBookDetails) -> Result<Book, ApplicationError> {
        let extension = cover_extension(&command.file_name)?;
        if command.image.is_empty() {
            return Err(ApplicationError::validation("Cover image is empty"));
        }
        if command.image.len() > MAX_COVER_SIZE {
            return Err(ApplicationError::validation(format!(
                "Cover image exceeds {} bytes",
                MAX_COVER_SIZE
            )));
        }

        let before = load_book(self.book_repo.as_ref(), command.book_id).await?;
        let today = Utc::now().date_naive();
        let path = format!("{}/{}/{}{}", today.year(), today.month(), before.id, extension);

        let mut book = before.clone();
        book.update_details(command.description, path.clone())?;

        self.blob_store
            .upload(&path, command.image, cover_content_type(&extension))
            .await?;

        InvalidationPlan::for_book(&before, Some(&book)).apply(&self.cache).await;
        self.book_repo.update(&book).await?;

        tracing::info!(book_id = %book.id, cover = %path, "Book details added");
        Ok(book)
    }
}

/// 取小写扩展名（含点）
fn cover_extension(file_name: &str) -> Result<String, ApplicationError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
        .unwrap_or_default();

    if !is_valid_cover_extension(&extension) {
        return Err(ApplicationError::validation(format!(
            "Unsupported cover image type: {:?}",
            file_name
        )));
    }
    Ok(extension)
}

fn cover_content_type(extension: &str) -> &'static str {
    match extension {
        ".png" => "image/png",
        ".webp" => "image/webp",
        _ => "image/jpeg",
    }
}
