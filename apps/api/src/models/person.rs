use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::note::NoteRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PersonRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub vibe_summary: Option<String>,
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// People-list entry: the person plus their earliest note.
#[derive(Debug, Clone, Serialize)]
pub struct PersonWithNote {
    #[serde(flatten)]
    pub person: PersonRow,
    pub first_note: Option<NoteRow>,
}
