//! 测试辅助：内存依赖装配、记录型 / 失败型端口实现

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::application::cache::CacheGateway;
use crate::application::ports::{
    BlobStoreError, BlobStorePort, CacheError, CacheStorePort, EventPublisherPort, PublishError,
    ReaderRepositoryPort, RepositoryError,
};
use crate::domain::book::{Book, BookKind};
use crate::domain::events::DomainEvent;
use crate::domain::reader::Reader;
use crate::infrastructure::blob::{BlobStoreConfig, ObjectStoreBlobStore};
use crate::infrastructure::memory::{
    InMemoryActivityLogRepository, InMemoryBookRepository, InMemoryBorrowRepository,
    InMemoryReaderRepository, InMemoryReportRepository,
};
use crate::infrastructure::persistence::sled::SledCacheStore;

pub const URL_TTL_MINUTES: u32 = 60;

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn fiction_book(title: &str, authors: &[&str]) -> Book {
    Book::new(
        title,
        BookKind::Fiction {
            genre: "novel".to_string(),
        },
        authors.iter().map(|a| a.to_string()).collect(),
        "",
        1999,
    )
    .unwrap()
}

pub fn active_reader(phone: &str) -> Reader {
    Reader::new("Ada Lovelace", phone, today() + chrono::Days::new(365)).unwrap()
}

/// 全内存依赖
pub struct TestContext {
    pub books: Arc<InMemoryBookRepository>,
    pub borrows: Arc<InMemoryBorrowRepository>,
    pub readers: Arc<InMemoryReaderRepository>,
    pub reports: Arc<InMemoryReportRepository>,
    pub logs: Arc<InMemoryActivityLogRepository>,
    pub blob: Arc<ObjectStoreBlobStore>,
    pub cache: CacheGateway,
    pub publisher: Arc<RecordingPublisher>,
}

impl TestContext {
    pub fn new() -> Self {
        Self {
            books: InMemoryBookRepository::new().arc(),
            borrows: InMemoryBorrowRepository::new().arc(),
            readers: InMemoryReaderRepository::new().arc(),
            reports: InMemoryReportRepository::new().arc(),
            logs: InMemoryActivityLogRepository::new().arc(),
            blob: Arc::new(ObjectStoreBlobStore::in_memory(BlobStoreConfig::default())),
            cache: CacheGateway::new(Arc::new(SledCacheStore::temporary().unwrap())),
            publisher: Arc::new(RecordingPublisher::default()),
        }
    }

    /// 预置缓存值
    pub async fn seed_cache(&self, key: &str) {
        self.cache.set(key, &"stale", Duration::from_secs(600)).await;
    }

    pub async fn is_cached(&self, key: &str) -> bool {
        self.cache.get::<serde_json::Value>(key).await.is_some()
    }
}

/// 记录所有发布的事件
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.events().iter().map(|e| e.kind().to_string()).collect()
    }
}

#[async_trait]
impl EventPublisherPort for RecordingPublisher {
    async fn publish(&self, event: DomainEvent) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// 总是失败的发布器
pub struct FailingPublisher;

#[async_trait]
impl EventPublisherPort for FailingPublisher {
    async fn publish(&self, _event: DomainEvent) -> Result<(), PublishError> {
        Err(PublishError::Broker("broker unreachable".to_string()))
    }
}

/// 上传总是失败的对象存储
pub struct FailingBlobStore;

#[async_trait]
impl BlobStorePort for FailingBlobStore {
    async fn upload(&self, _path: &str, _data: Vec<u8>, _content_type: &str) -> Result<(), BlobStoreError> {
        Err(BlobStoreError::UploadFailed("connection reset".to_string()))
    }

    async fn get_url(&self, _path: &str, _ttl_minutes: u32) -> Result<String, BlobStoreError> {
        Err(BlobStoreError::UploadFailed("connection reset".to_string()))
    }
}

/// 所有操作都失败的缓存后端
pub struct FailingCacheStore;

#[async_trait]
impl CacheStorePort for FailingCacheStore {
    async fn get_raw(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }

    async fn set_raw(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }

    async fn remove(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }

    async fn remove_by_prefix(&self, _prefix: &str) -> Result<usize, CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }

    async fn purge_expired(&self) -> Result<usize, CacheError> {
        Err(CacheError::Unavailable("down".to_string()))
    }
}

/// 不允许被调用的读者仓储
pub struct UnreachableReaderRepository;

#[async_trait]
impl ReaderRepositoryPort for UnreachableReaderRepository {
    async fn create(&self, _reader: &Reader) -> Result<(), RepositoryError> {
        panic!("unexpected repository call: create")
    }

    async fn update(&self, _reader: &Reader) -> Result<(), RepositoryError> {
        panic!("unexpected repository call: update")
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<Reader>, RepositoryError> {
        panic!("unexpected repository call: find_by_id")
    }

    async fn find_by_phone(&self, _phone_number: &str) -> Result<Option<Reader>, RepositoryError> {
        panic!("unexpected repository call: find_by_phone")
    }
}
