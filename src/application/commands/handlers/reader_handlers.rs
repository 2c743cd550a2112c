//! Reader Command Handlers

use chrono::Utc;
use std::sync::Arc;

use crate::application::cache::{keys, CacheGateway};
use crate::application::commands::{CloseReader, CreateReader, ExtendReader};
use crate::application::error::ApplicationError;
use crate::application::ports::{
    BorrowRepositoryPort, EventPublisherPort, ReaderRepositoryPort, RepositoryError,
};
use crate::domain::events::{ReaderClosed, ReaderCreated};
use crate::domain::reader::{Reader, ReaderError};

const SERVICE: &str = "reader-service";

fn phone_taken(phone_number: &str) -> ApplicationError {
    ApplicationError::business_rule(format!("Phone number {} is already registered", phone_number))
}

// ============================================================================
// CreateReader
// ============================================================================

/// CreateReader Handler
pub struct CreateReaderHandler {
    reader_repo: Arc<dyn ReaderRepositoryPort>,
    publisher: Arc<dyn EventPublisherPort>,
}

impl CreateReaderHandler {
    pub fn new(reader_repo: Arc<dyn ReaderRepositoryPort>, publisher: Arc<dyn EventPublisherPort>) -> Self {
        Self {
            reader_repo,
            publisher,
        }
    }

    pub async fn handle(&self, command: CreateReader) -> Result<Reader, ApplicationError> {
        self.execute(command)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to create reader card"))
    }

    async fn execute(&self, command: CreateReader) -> Result<Reader, ApplicationError> {
        if command.expiry_date < Utc::now().date_naive() {
            return Err(ReaderError::ExpiryInPast.into());
        }
        let reader = Reader::new(command.full_name, command.phone_number, command.expiry_date)?;

        if self.reader_repo.find_by_phone(&reader.phone_number).await?.is_some() {
            return Err(phone_taken(&reader.phone_number));
        }
        match self.reader_repo.create(&reader).await {
            Ok(()) => {}
            Err(RepositoryError::Duplicate(_)) => return Err(phone_taken(&reader.phone_number)),
            Err(e) => return Err(e.into()),
        }

        self.publisher
            .publish(
                ReaderCreated {
                    reader_id: reader.id,
                    full_name: reader.full_name.clone(),
                    phone_number: reader.phone_number.clone(),
                    expiry_date: reader.expiry_date,
                }
                .into(),
            )
            .await?;

        tracing::info!(reader_id = %reader.id, "Reader card created");
        Ok(reader)
    }
}

// ============================================================================
// ExtendReader
// ============================================================================

/// ExtendReader Handler
pub struct ExtendReaderHandler {
    reader_repo: Arc<dyn ReaderRepositoryPort>,
}

impl ExtendReaderHandler {
    pub fn new(reader_repo: Arc<dyn ReaderRepositoryPort>) -> Self {
        Self { reader_repo }
    }

    pub async fn handle(&self, command: ExtendReader) -> Result<Reader, ApplicationError> {
        self.execute(command)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to extend reader card"))
    }

    async fn execute(&self, command: ExtendReader) -> Result<Reader, ApplicationError> {
        let today = Utc::now().date_naive();
        // 在任何仓储 / 缓存调用之前拒绝
        if command.new_expiry_date < today {
            return Err(ReaderError::ExpiryInPast.into());
        }

        let mut reader = self
            .reader_repo
            .find_by_id(command.reader_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Reader", command.reader_id))?;
        reader.extend(command.new_expiry_date, today)?;
        self.reader_repo.update(&reader).await?;

        tracing::info!(
            reader_id = %reader.id,
            expiry_date = %reader.expiry_date,
            "Reader card extended"
        );
        Ok(reader)
    }
}

// ============================================================================
// CloseReader
// ============================================================================

/// CloseReader Handler
pub struct CloseReaderHandler {
    reader_repo: Arc<dyn ReaderRepositoryPort>,
    borrow_repo: Arc<dyn BorrowRepositoryPort>,
    cache: CacheGateway,
    publisher: Arc<dyn EventPublisherPort>,
}

impl CloseReaderHandler {
    pub fn new(
        reader_repo: Arc<dyn ReaderRepositoryPort>,
        borrow_repo: Arc<dyn BorrowRepositoryPort>,
        cache: CacheGateway,
        publisher: Arc<dyn EventPublisherPort>,
    ) -> Self {
        Self {
            reader_repo,
            borrow_repo,
            cache,
            publisher,
        }
    }

    pub async fn handle(&self, command: CloseReader) -> Result<Reader, ApplicationError> {
        self.execute(command)
            .await
            .map_err(|e| e.into_service(SERVICE, "Failed to close reader card"))
    }

    async fn execute(&self, command: CloseReader) -> Result<Reader, ApplicationError> {
        let mut reader = self
            .reader_repo
            .find_by_id(command.reader_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Reader", command.reader_id))?;

        let borrowed = self.borrow_repo.find_issued_by_reader(reader.id).await?;
        if !borrowed.is_empty() {
            return Err(ApplicationError::business_rule(format!(
                "Reader has {} borrowed book(s)",
                borrowed.len()
            )));
        }

        let today = Utc::now().date_naive();
        reader.close(today)?;

        self.cache.remove(&keys::reader_books_key(reader.id)).await;
        self.reader_repo.update(&reader).await?;

        self.publisher
            .publish(
                ReaderClosed {
                    reader_id: reader.id,
                    full_name: reader.full_name.clone(),
                    closed_on: today,
                }
                .into(),
            )
            .await?;

        tracing::info!(reader_id = %reader.id, "Reader card closed");
        Ok(reader)
    }
}
