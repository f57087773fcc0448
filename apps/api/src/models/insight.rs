use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Mirrors the `insight_category` Postgres enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "insight_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    MotivatedBy,
    PreferredCommunication,
    WorksBestWhen,
    CollaborationStyle,
    FeedbackApproach,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InsightRow {
    pub id: Uuid,
    pub person_id: Uuid,
    pub user_id: Uuid,
    pub category: InsightCategory,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
