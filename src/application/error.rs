//! 应用层错误定义
//!
//! 客户端错误（NotFound / 校验 / 业务规则 / 状态）原样返回给调用方；
//! 基础设施失败在用例边界被包装为 `Service`，保留原始错误作为 source

use thiserror::Error;

use crate::application::ports::{BlobStoreError, PublishError, RepositoryError};
use crate::domain::book::BookError;
use crate::domain::lending::BorrowError;
use crate::domain::reader::ReaderError;
use crate::domain::reporting::ReportError;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 业务规则违反
    #[error("Business rule violation: {0}")]
    BusinessRuleViolation(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// 服务错误（已包装的意外失败）
    #[error("{service}: {message}")]
    Service {
        service: &'static str,
        message: &'static str,
        #[source]
        source: BoxError,
    },

    /// 仓储错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// 事件发布错误
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// 对象存储错误
    #[error("Blob store error: {0}")]
    BlobStore(#[from] BlobStoreError),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建业务规则违反错误
    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::BusinessRuleViolation(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 是否为客户端错误（不重试、不包装）
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::ValidationError(_)
                | Self::BusinessRuleViolation(_)
                | Self::InvalidState(_)
        )
    }

    /// 在用例边界包装意外失败
    ///
    /// 客户端错误与已包装的错误原样返回
    pub fn into_service(self, service: &'static str, message: &'static str) -> Self {
        if self.is_client_error() || matches!(self, Self::Service { .. }) {
            return self;
        }
        tracing::error!(service, error = %self, "{}", message);
        Self::Service {
            service,
            message,
            source: Box::new(self),
        }
    }
}

impl From<BookError> for ApplicationError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::NoAuthors | BookError::EmptyTitle => Self::ValidationError(err.to_string()),
            _ => Self::BusinessRuleViolation(err.to_string()),
        }
    }
}

impl From<ReaderError> for ApplicationError {
    fn from(err: ReaderError) -> Self {
        match err {
            ReaderError::ExpiryInPast | ReaderError::EmptyName | ReaderError::EmptyPhone => {
                Self::ValidationError(err.to_string())
            }
            _ => Self::BusinessRuleViolation(err.to_string()),
        }
    }
}

impl From<BorrowError> for ApplicationError {
    fn from(err: BorrowError) -> Self {
        Self::InvalidState(err.to_string())
    }
}

impl From<ReportError> for ApplicationError {
    fn from(err: ReportError) -> Self {
        match err {
            ReportError::NotGenerated => Self::InvalidState(err.to_string()),
            _ => Self::ValidationError(err.to_string()),
        }
    }
}
