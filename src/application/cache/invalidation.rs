//! 写路径缓存失效
//!
//! 一次变更需要删除：实体的详情 key，以及所有“会包含该实体”的列表前缀。
//! 列表过滤的每个维度要么等于实体的取值，要么缺省，因此对每个维度取
//! {实体取值, 缺省} 的笛卡尔积；变更前后的维度都要覆盖，实体移入的列表同样刷新。

use std::collections::BTreeSet;

use super::keys;
use super::CacheGateway;
use crate::domain::book::{Book, BookCategory, BookStatus};

/// 参与列表缓存 key 的书籍维度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDimensions {
    pub status: BookStatus,
    pub category: BookCategory,
    pub authors: Vec<String>,
}

impl From<&Book> for BookDimensions {
    fn from(book: &Book) -> Self {
        Self {
            status: book.status,
            category: book.category(),
            authors: book.authors.clone(),
        }
    }
}

impl BookDimensions {
    fn author_variants(&self) -> Vec<Option<&str>> {
        let mut variants: Vec<Option<&str>> = self.authors.iter().map(|a| Some(a.as_str())).collect();
        variants.push(None);
        variants
    }

    /// 所有可能包含该书的书目列表前缀
    pub fn book_list_prefixes(&self) -> Vec<String> {
        let mut prefixes = Vec::new();
        for status in [Some(self.status), None] {
            for category in [Some(self.category), None] {
                for author in self.author_variants() {
                    prefixes.push(keys::book_list_prefix(status, category, author));
                }
            }
        }
        prefixes
    }

    /// 所有可能包含该书的馆藏列表前缀（已归档的书不在馆藏列表中）
    pub fn library_prefixes(&self) -> Vec<String> {
        if self.status == BookStatus::Archived {
            return Vec::new();
        }

        let mut availability = vec![false];
        if self.status == BookStatus::Available {
            availability.push(true);
        }

        let mut prefixes = Vec::new();
        for category in [Some(self.category), None] {
            for author in self.author_variants() {
                for &available_only in &availability {
                    prefixes.push(keys::library_books_prefix(category, author, available_only));
                }
            }
        }
        prefixes
    }
}

/// 一次写操作需要失效的 key 和前缀
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    keys: BTreeSet<String>,
    prefixes: BTreeSet<String>,
}

impl InvalidationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// 书籍变更：变更前维度，以及不同于变更前的变更后维度
    pub fn for_book(before: &Book, after: Option<&Book>) -> Self {
        let mut plan = Self::new().with_key(keys::book_details_key(before.id));
        plan.add_dimensions(&BookDimensions::from(before));
        if let Some(after) = after {
            let after_dims = BookDimensions::from(after);
            if after_dims != BookDimensions::from(before) {
                plan.add_dimensions(&after_dims);
            }
        }
        plan
    }

    /// 新书：只会进入列表
    pub fn for_new_book(book: &Book) -> Self {
        let mut plan = Self::new();
        plan.add_dimensions(&BookDimensions::from(book));
        plan
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.keys.insert(key.into());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.insert(prefix.into());
        self
    }

    fn add_dimensions(&mut self, dims: &BookDimensions) {
        self.prefixes.extend(dims.book_list_prefixes());
        self.prefixes.extend(dims.library_prefixes());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.prefixes.iter().map(String::as_str)
    }

    /// 执行失效（失败只记录日志）
    pub async fn apply(&self, cache: &CacheGateway) {
        for key in &self.keys {
            cache.remove(key).await;
        }
        let mut removed = 0;
        for prefix in &self.prefixes {
            removed += cache.remove_by_prefix(prefix).await;
        }
        tracing::debug!(
            keys = self.keys.len(),
            prefixes = self.prefixes.len(),
            removed,
            "Cache invalidated"
        );
    }
}
