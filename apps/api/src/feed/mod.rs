//! Combined notes + insights timeline, newest first, paginated by offset.

pub mod handlers;
pub mod repo;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::insight::InsightRow;
use crate::models::note::NoteRow;

pub const DEFAULT_LIMIT: i64 = 20;
pub const MAX_LIMIT: i64 = 100;

/// Shown when a feed row's person could not be joined.
pub const UNKNOWN_PERSON: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedNote {
    #[serde(flatten)]
    pub note: NoteRow,
    pub person: PersonRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedInsight {
    #[serde(flatten)]
    pub insight: InsightRow,
    pub person: PersonRef,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedItem {
    Note(FeedNote),
    Insight(FeedInsight),
}

/// Raw `page` / `limit` query values. Parsed leniently: anything that is not
/// a number falls back to the default.
#[derive(Debug, Default, Deserialize)]
pub struct FeedQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn from_query(query: &FeedQuery) -> Self {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<i64>().ok());
        Self {
            page: parse(&query.page).unwrap_or(1).max(1),
            limit: parse(&query.limit)
                .unwrap_or(DEFAULT_LIMIT)
                .clamp(1, MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn has_more(&self, total: i64) -> bool {
        self.offset().saturating_add(self.limit) < total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, limit: Option<&str>) -> Pagination {
        Pagination::from_query(&FeedQuery {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        })
    }

    #[test]
    fn test_defaults() {
        assert_eq!(query(None, None), Pagination { page: 1, limit: 20 });
        assert_eq!(query(Some("abc"), Some("")), Pagination { page: 1, limit: 20 });
    }

    #[test]
    fn test_clamping() {
        assert_eq!(query(Some("0"), Some("500")), Pagination { page: 1, limit: 100 });
        assert_eq!(query(Some("-3"), Some("0")), Pagination { page: 1, limit: 1 });
    }

    #[test]
    fn test_offset_and_has_more() {
        let p = query(Some("2"), Some("20"));
        assert_eq!(p.offset(), 20);
        assert!(p.has_more(41));
        assert!(!p.has_more(40));
        assert!(!query(Some("1"), Some("20")).has_more(0));
    }

    #[test]
    fn test_feed_item_wire_shape() {
        use chrono::Utc;
        let person_id = Uuid::new_v4();
        let item = FeedItem::Note(FeedNote {
            note: NoteRow {
                id: Uuid::new_v4(),
                person_id,
                user_id: Uuid::new_v4(),
                content: "likes tea".into(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            person: PersonRef {
                id: person_id,
                name: UNKNOWN_PERSON.into(),
            },
        });
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "note");
        assert_eq!(value["content"], "likes tea");
        assert_eq!(value["person"]["name"], "Unknown");
    }
}
