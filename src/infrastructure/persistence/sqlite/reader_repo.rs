//! SQLite Reader Repository

use async_trait::async_trait;
use sqlx::FromRow;
use uuid::Uuid;

use super::database::{db_error, parse_date, parse_uuid};
use super::DbPool;
use crate::application::ports::{ReaderRepositoryPort, RepositoryError};
use crate::domain::reader::Reader;

/// SQLite Reader Repository
///
/// phone_number 唯一约束冲突返回 `RepositoryError::Duplicate`
pub struct SqliteReaderRepository {
    pool: DbPool,
}

impl SqliteReaderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ReaderRow {
    id: String,
    full_name: String,
    phone_number: String,
    expiry_date: String,
    is_active: bool,
}

impl TryFrom<ReaderRow> for Reader {
    type Error = RepositoryError;

    fn try_from(row: ReaderRow) -> Result<Self, Self::Error> {
        Ok(Reader {
            id: parse_uuid(&row.id)?,
            full_name: row.full_name,
            phone_number: row.phone_number,
            expiry_date: parse_date(&row.expiry_date)?,
            is_active: row.is_active,
        })
    }
}

#[async_trait]
impl ReaderRepositoryPort for SqliteReaderRepository {
    async fn create(&self, reader: &Reader) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO readers (id, full_name, phone_number, expiry_date, is_active) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(reader.id.to_string())
        .bind(&reader.full_name)
        .bind(&reader.phone_number)
        .bind(reader.expiry_date.to_string())
        .bind(reader.is_active)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn update(&self, reader: &Reader) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE readers SET full_name = ?, phone_number = ?, expiry_date = ?, is_active = ? WHERE id = ?",
        )
        .bind(&reader.full_name)
        .bind(&reader.phone_number)
        .bind(reader.expiry_date.to_string())
        .bind(reader.is_active)
        .bind(reader.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("reader {}", reader.id)));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reader>, RepositoryError> {
        let row: Option<ReaderRow> = sqlx::query_as(
            "SELECT id, full_name, phone_number, expiry_date, is_active FROM readers WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Reader::try_from).transpose()
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Reader>, RepositoryError> {
        let row: Option<ReaderRow> = sqlx::query_as(
            "SELECT id, full_name, phone_number, expiry_date, is_active FROM readers WHERE phone_number = ?",
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        row.map(Reader::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::database::test_pool;
    use crate::test_support::{active_reader, today};

    #[tokio::test]
    async fn test_phone_is_unique() {
        let repo = SqliteReaderRepository::new(test_pool().await);
        let reader = active_reader("+100");
        repo.create(&reader).await.unwrap();

        let err = repo.create(&active_reader("+100")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));
        assert_eq!(repo.find_by_phone("+100").await.unwrap().unwrap().id, reader.id);
    }

    #[tokio::test]
    async fn test_close_is_persisted() {
        let repo = SqliteReaderRepository::new(test_pool().await);
        let mut reader = active_reader("+200");
        repo.create(&reader).await.unwrap();

        reader.close(today()).unwrap();
        repo.update(&reader).await.unwrap();

        let stored = repo.find_by_id(reader.id).await.unwrap().unwrap();
        assert_eq!(stored, reader);
        assert!(!stored.is_active);
    }
}
