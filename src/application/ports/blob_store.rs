//! Blob Store Port - 对象存储
//!
//! 不透明的上传 / 预签名 URL 门面

use async_trait::async_trait;
use thiserror::Error;

/// 对象存储错误
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object store error: {0}")]
    ObjectStoreError(#[from] object_store::Error),
}

/// Blob Store Port
#[async_trait]
pub trait BlobStorePort: Send + Sync {
    /// 上传对象
    async fn upload(&self, path: &str, data: Vec<u8>, content_type: &str) -> Result<(), BlobStoreError>;

    /// 获取限时访问 URL
    async fn get_url(&self, path: &str, ttl_minutes: u32) -> Result<String, BlobStoreError>;
}
