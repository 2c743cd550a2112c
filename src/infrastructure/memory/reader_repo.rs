//! In-Memory Reader Repository

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::{ReaderRepositoryPort, RepositoryError};
use crate::domain::reader::Reader;

/// 内存读者仓储（手机号唯一）
pub struct InMemoryReaderRepository {
    readers: DashMap<Uuid, Reader>,
    phones: DashMap<String, Uuid>,
}

impl InMemoryReaderRepository {
    pub fn new() -> Self {
        Self {
            readers: DashMap::new(),
            phones: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl Default for InMemoryReaderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReaderRepositoryPort for InMemoryReaderRepository {
    async fn create(&self, reader: &Reader) -> Result<(), RepositoryError> {
        match self.phones.entry(reader.phone_number.clone()) {
            Entry::Occupied(_) => {
                return Err(RepositoryError::Duplicate(format!(
                    "phone number {}",
                    reader.phone_number
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(reader.id);
            }
        }
        self.readers.insert(reader.id, reader.clone());
        Ok(())
    }

    async fn update(&self, reader: &Reader) -> Result<(), RepositoryError> {
        let mut stored = self
            .readers
            .get_mut(&reader.id)
            .ok_or_else(|| RepositoryError::NotFound(format!("reader {}", reader.id)))?;
        if stored.phone_number != reader.phone_number {
            match self.phones.entry(reader.phone_number.clone()) {
                Entry::Occupied(_) => {
                    return Err(RepositoryError::Duplicate(format!(
                        "phone number {}",
                        reader.phone_number
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(reader.id);
                }
            }
            self.phones.remove(&stored.phone_number);
        }
        *stored = reader.clone();
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Reader>, RepositoryError> {
        Ok(self.readers.get(&id).map(|r| r.clone()))
    }

    async fn find_by_phone(&self, phone_number: &str) -> Result<Option<Reader>, RepositoryError> {
        let Some(id) = self.phones.get(phone_number).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.readers.get(&id).map(|r| r.clone()))
    }
}
