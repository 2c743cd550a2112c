//! In-Memory Borrow Repository

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::{BorrowRepositoryPort, RepositoryError};
use crate::domain::lending::Borrow;

/// 内存借阅仓储
///
/// `issued` 索引 book_id -> borrow_id，借出检查与写入在同一个分片锁内完成
pub struct InMemoryBorrowRepository {
    borrows: DashMap<Uuid, Borrow>,
    issued: DashMap<Uuid, Uuid>,
}

impl InMemoryBorrowRepository {
    pub fn new() -> Self {
        Self {
            borrows: DashMap::new(),
            issued: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for InMemoryBorrowRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BorrowRepositoryPort for InMemoryBorrowRepository {
    async fn create(&self, borrow: &Borrow) -> Result<(), RepositoryError> {
        if borrow.is_issued() {
            match self.issued.entry(borrow.book_id) {
                Entry::Occupied(_) => {
                    return Err(RepositoryError::Duplicate(format!(
                        "book {} already has an issued borrow",
                        borrow.book_id
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(borrow.id);
                }
            }
        }
        self.borrows.insert(borrow.id, borrow.clone());
        Ok(())
    }

    async fn update(&self, borrow: &Borrow) -> Result<(), RepositoryError> {
        {
            let mut stored = self
                .borrows
                .get_mut(&borrow.id)
                .ok_or_else(|| RepositoryError::NotFound(format!("borrow {}", borrow.id)))?;
            *stored = borrow.clone();
        }
        if !borrow.is_issued() {
            self.issued.remove_if(&borrow.book_id, |_, id| *id == borrow.id);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Borrow>, RepositoryError> {
        Ok(self.borrows.get(&id).map(|b| b.clone()))
    }

    async fn find_issued_by_book(&self, book_id: Uuid) -> Result<Option<Borrow>, RepositoryError> {
        let Some(borrow_id) = self.issued.get(&book_id).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.borrows.get(&borrow_id).map(|b| b.clone()))
    }

    async fn find_issued_by_reader(&self, reader_id: Uuid) -> Result<Vec<Borrow>, RepositoryError> {
        let mut borrows: Vec<Borrow> = self
            .borrows
            .iter()
            .filter(|entry| entry.reader_id == reader_id && entry.is_issued())
            .map(|entry| entry.value().clone())
            .collect();
        borrows.sort_by_key(|b| (b.borrow_date, b.id));
        Ok(borrows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn test_one_issued_borrow_per_book() {
        let repo = InMemoryBorrowRepository::new();
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let book_id = Uuid::new_v4();

        let mut first = Borrow::issue(book_id, Uuid::new_v4(), today);
        repo.create(&first).await.unwrap();

        let second = Borrow::issue(book_id, Uuid::new_v4(), today);
        assert!(matches!(repo.create(&second).await, Err(RepositoryError::Duplicate(_))));

        first.return_book(today).unwrap();
        repo.update(&first).await.unwrap();
        assert!(repo.find_issued_by_book(book_id).await.unwrap().is_none());
        repo.create(&second).await.unwrap();
    }
}
