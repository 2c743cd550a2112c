//! Book Context - Value Objects

use serde::{Deserialize, Serialize};

/// 书籍状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookStatus {
    /// 在馆可借
    Available,
    /// 已借出
    Borrowed,
    /// 已归档
    Archived,
}

impl BookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Available => "available",
            BookStatus::Borrowed => "borrowed",
            BookStatus::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "available" => Some(BookStatus::Available),
            "borrowed" => Some(BookStatus::Borrowed),
            "archived" => Some(BookStatus::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 书籍分类（用于过滤与缓存 key）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookCategory {
    Scientific,
    Educational,
    Fiction,
}

impl BookCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookCategory::Scientific => "scientific",
            BookCategory::Educational => "educational",
            BookCategory::Fiction => "fiction",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "scientific" => Some(BookCategory::Scientific),
            "educational" => Some(BookCategory::Educational),
            "fiction" => Some(BookCategory::Fiction),
            _ => None,
        }
    }
}

impl std::fmt::Display for BookCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 分类专属字段
///
/// 每种分类携带自己的附加信息，`category()` 给出扁平分类
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum BookKind {
    #[serde(rename_all = "camelCase")]
    Scientific {
        research_field: String,
        publisher: String,
    },
    #[serde(rename_all = "camelCase")]
    Educational { level: String },
    #[serde(rename_all = "camelCase")]
    Fiction { genre: String },
}

impl BookKind {
    pub fn category(&self) -> BookCategory {
        match self {
            BookKind::Scientific { .. } => BookCategory::Scientific,
            BookKind::Educational { .. } => BookCategory::Educational,
            BookKind::Fiction { .. } => BookCategory::Fiction,
        }
    }
}

/// 允许的封面图片扩展名
pub const COVER_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".webp"];

/// 封面图片最大字节数 (5 MiB)
pub const MAX_COVER_SIZE: usize = 5 * 1024 * 1024;

/// 校验封面扩展名（大小写不敏感）
pub fn is_valid_cover_extension(extension: &str) -> bool {
    let lower = extension.to_ascii_lowercase();
    COVER_EXTENSIONS.contains(&lower.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [BookStatus::Available, BookStatus::Borrowed, BookStatus::Archived] {
            assert_eq!(BookStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(BookStatus::from_str("lost"), None);
    }

    #[test]
    fn test_kind_category() {
        let kind = BookKind::Fiction {
            genre: "novel".to_string(),
        };
        assert_eq!(kind.category(), BookCategory::Fiction);

        let json = serde_json::to_value(&kind).unwrap();
        assert_eq!(json["category"], "fiction");
        assert_eq!(json["genre"], "novel");
    }

    #[test]
    fn test_cover_extension() {
        assert!(is_valid_cover_extension(".PNG"));
        assert!(is_valid_cover_extension(".webp"));
        assert!(!is_valid_cover_extension(".gif"));
        assert!(!is_valid_cover_extension(""));
    }
}
