use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored wiki page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Page {
    pub id: i64,
    pub name: String,
    pub content: String,
}

/// Result of looking a page up by name.
///
/// `id` and `raw_content` are only populated when `found` is true.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageLookup {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "rawContent", skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
}

impl PageLookup {
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn found(id: i64, raw_content: String) -> Self {
        Self {
            found: true,
            id: Some(id),
            raw_content: Some(raw_content),
        }
    }
}

/// Ordered `(name, content)` pairs taken for one backup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    pub entries: Vec<(String, String)>,
}

impl From<Vec<Page>> for PageSnapshot {
    fn from(pages: Vec<Page>) -> Self {
        Self {
            entries: pages.into_iter().map(|p| (p.name, p.content)).collect(),
        }
    }
}
