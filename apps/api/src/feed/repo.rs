use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

use super::{FeedInsight, FeedItem, FeedNote, Pagination, PersonRef, UNKNOWN_PERSON};
use crate::models::insight::{InsightCategory, InsightRow};
use crate::models::note::NoteRow;

/// One row of the notes/insights union.
#[derive(Debug, FromRow)]
struct FeedRow {
    kind: String,
    id: Uuid,
    person_id: Uuid,
    user_id: Uuid,
    category: Option<InsightCategory>,
    content: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    person_name: Option<String>,
}

impl FeedRow {
    fn into_item(self) -> Option<FeedItem> {
        let person = PersonRef {
            id: self.person_id,
            name: self
                .person_name
                .unwrap_or_else(|| UNKNOWN_PERSON.to_string()),
        };
        match (self.kind.as_str(), self.category) {
            ("note", _) => Some(FeedItem::Note(FeedNote {
                note: NoteRow {
                    id: self.id,
                    person_id: self.person_id,
                    user_id: self.user_id,
                    content: self.content,
                    created_at: self.created_at,
                    updated_at: self.updated_at,
                },
                person,
            })),
            ("insight", Some(category)) => Some(FeedItem::Insight(FeedInsight {
                insight: InsightRow {
                    id: self.id,
                    person_id: self.person_id,
                    user_id: self.user_id,
                    category,
                    content: self.content,
                    created_at: self.created_at,
                    updated_at: self.updated_at,
                },
                person,
            })),
            (kind, _) => {
                warn!("Skipping malformed feed row {} of kind '{kind}'", self.id);
                None
            }
        }
    }
}

/// One page of the timeline plus the total number of items.
pub async fn fetch_page(
    pool: &PgPool,
    user_id: Uuid,
    pagination: Pagination,
) -> Result<(Vec<FeedItem>, i64), sqlx::Error> {
    let rows: Vec<FeedRow> = sqlx::query_as(
        r#"
        SELECT * FROM (
            SELECT 'note' AS kind, n.id, n.person_id, n.user_id,
                   NULL::insight_category AS category, n.content,
                   n.created_at, n.updated_at, p.name AS person_name
            FROM notes n
            LEFT JOIN people p ON p.id = n.person_id
            WHERE n.user_id = $1
            UNION ALL
            SELECT 'insight' AS kind, i.id, i.person_id, i.user_id,
                   i.category, i.content,
                   i.created_at, i.updated_at, p.name AS person_name
            FROM insights i
            LEFT JOIN people p ON p.id = i.person_id
            WHERE i.user_id = $1
        ) feed
        ORDER BY created_at DESC, id DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user_id)
    .bind(pagination.limit)
    .bind(pagination.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT (SELECT COUNT(*) FROM notes WHERE user_id = $1)
             + (SELECT COUNT(*) FROM insights WHERE user_id = $1)
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    Ok((rows.into_iter().filter_map(FeedRow::into_item).collect(), total))
}
