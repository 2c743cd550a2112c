//! Blob Store - 对象存储实现

mod object_store_blob;

pub use object_store_blob::{BlobStoreConfig, ObjectStoreBlobStore};
