//! Object store blob storage
//!
//! 基于 object_store（内存 / 本地文件系统后端）。
//! 访问 URL 形如 `{public_base_url}/{bucket}/{path}?expires={unix}&signature={md5}`，
//! 签名为 md5(secret|bucket|path|expires)

use async_trait::async_trait;
use chrono::Utc;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as StoragePath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use std::path::Path;
use std::sync::Arc;

use crate::application::ports::{BlobStoreError, BlobStorePort};

/// 对象存储配置
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    pub bucket: String,
    pub public_base_url: String,
    pub signing_secret: String,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            bucket: "folio".to_string(),
            public_base_url: "http://localhost:9000".to_string(),
            signing_secret: "change-me".to_string(),
        }
    }
}

/// object_store 封装
#[derive(Clone)]
pub struct ObjectStoreBlobStore {
    store: Arc<dyn ObjectStore>,
    config: BlobStoreConfig,
    /// 后端是否支持对象属性（本地文件系统不支持 Content-Type）
    supports_attributes: bool,
}

impl ObjectStoreBlobStore {
    pub fn new(store: Arc<dyn ObjectStore>, config: BlobStoreConfig, supports_attributes: bool) -> Self {
        Self {
            store,
            config,
            supports_attributes,
        }
    }

    /// 内存存储（测试 / 本地开发）
    pub fn in_memory(config: BlobStoreConfig) -> Self {
        Self::new(Arc::new(InMemory::new()), config, true)
    }

    /// 本地文件系统存储
    pub fn local(root: impl AsRef<Path>, config: BlobStoreConfig) -> Result<Self, BlobStoreError> {
        std::fs::create_dir_all(root.as_ref())
            .map_err(|e| BlobStoreError::InvalidArgument(format!("cannot create blob root: {}", e)))?;
        let store = LocalFileSystem::new_with_prefix(root.as_ref())?;
        Ok(Self::new(Arc::new(store), config, false))
    }

    /// 读取对象内容
    pub async fn download(&self, path: &str) -> Result<Vec<u8>, BlobStoreError> {
        let location = parse_path(path)?;
        let bytes = self.store.get(&location).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    fn sign(&self, path: &str, expires: i64) -> String {
        let material = format!(
            "{}|{}|{}|{}",
            self.config.signing_secret, self.config.bucket, path, expires
        );
        format!("{:x}", md5::compute(material.as_bytes()))
    }
}

fn parse_path(path: &str) -> Result<StoragePath, BlobStoreError> {
    if path.trim().is_empty() {
        return Err(BlobStoreError::InvalidArgument("path is empty".to_string()));
    }
    StoragePath::parse(path).map_err(|e| BlobStoreError::InvalidArgument(e.to_string()))
}

#[async_trait]
impl BlobStorePort for ObjectStoreBlobStore {
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), BlobStoreError> {
        let location = parse_path(path)?;
        if content_type.trim().is_empty() {
            return Err(BlobStoreError::InvalidArgument("content type is empty".to_string()));
        }

        let size = data.len();
        let mut options = PutOptions::default();
        if self.supports_attributes {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
            options.attributes = attributes;
        }

        self.store
            .put_opts(&location, PutPayload::from(data), options)
            .await
            .map_err(|e| BlobStoreError::UploadFailed(e.to_string()))?;

        tracing::info!(path, size, content_type, "Uploaded to blob store");
        Ok(())
    }

    async fn get_url(&self, path: &str, ttl_minutes: u32) -> Result<String, BlobStoreError> {
        let location = parse_path(path)?;
        if ttl_minutes == 0 {
            return Err(BlobStoreError::InvalidArgument("ttl must be positive".to_string()));
        }

        let expires = Utc::now().timestamp() + i64::from(ttl_minutes) * 60;
        let path = location.as_ref();
        Ok(format!(
            "{}/{}/{}?expires={}&signature={}",
            self.config.public_base_url.trim_end_matches('/'),
            self.config.bucket,
            path,
            expires,
            self.sign(path, expires)
        ))
    }
}
