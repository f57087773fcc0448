use std::collections::HashMap;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::insight::InsightCategory;
use crate::models::note::NoteRow;
use crate::models::person::{PersonRow, PersonWithNote};

pub const SAMPLE_NAME: &str = "Alex (Sample)";
const SAMPLE_VIBE: &str = "Example person to show how insights work";
const SAMPLE_INSIGHTS: [(InsightCategory, &str); 3] = [
    (
        InsightCategory::MotivatedBy,
        "Likes to see progress and impact of their work",
    ),
    (
        InsightCategory::PreferredCommunication,
        "Prefers async updates via Slack, but appreciates quick syncs for blockers",
    ),
    (
        InsightCategory::WorksBestWhen,
        "Has clear context and can focus without interruptions",
    ),
];

/// Changes applied by `update_person`. `None` leaves a column untouched.
#[derive(Debug, Default)]
pub struct PersonChanges {
    pub name: Option<String>,
    /// `Some(None)` clears the summary.
    pub vibe_summary: Option<Option<String>>,
    pub is_favorite: Option<bool>,
}

/// People newest first, each with their earliest note.
pub async fn list_people(
    pool: &PgPool,
    user_id: Uuid,
    favorites_only: bool,
) -> Result<Vec<PersonWithNote>, sqlx::Error> {
    let people: Vec<PersonRow> = sqlx::query_as(
        r#"
        SELECT * FROM people
        WHERE user_id = $1 AND ($2 = FALSE OR is_favorite)
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .bind(favorites_only)
    .fetch_all(pool)
    .await?;

    let ids: Vec<Uuid> = people.iter().map(|p| p.id).collect();
    let first_notes: Vec<NoteRow> = sqlx::query_as(
        r#"
        SELECT DISTINCT ON (person_id) * FROM notes
        WHERE user_id = $1 AND person_id = ANY($2)
        ORDER BY person_id, created_at ASC
        "#,
    )
    .bind(user_id)
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_person: HashMap<Uuid, NoteRow> =
        first_notes.into_iter().map(|n| (n.person_id, n)).collect();

    Ok(people
        .into_iter()
        .map(|person| PersonWithNote {
            first_note: by_person.remove(&person.id),
            person,
        })
        .collect())
}

pub async fn get_person(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
) -> Result<Option<PersonRow>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM people WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn create_person(
    pool: &PgPool,
    user_id: Uuid,
    name: &str,
    vibe_summary: Option<&str>,
) -> Result<PersonRow, sqlx::Error> {
    let person: PersonRow = sqlx::query_as(
        r#"
        INSERT INTO people (id, user_id, name, vibe_summary)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(name)
    .bind(vibe_summary)
    .fetch_one(pool)
    .await?;

    info!("Created person {} for user {user_id}", person.id);
    Ok(person)
}

pub async fn update_person(
    pool: &PgPool,
    user_id: Uuid,
    id: Uuid,
    changes: &PersonChanges,
) -> Result<Option<PersonRow>, sqlx::Error> {
    let (set_vibe, vibe) = match &changes.vibe_summary {
        Some(v) => (true, v.as_deref()),
        None => (false, None),
    };

    sqlx::query_as(
        r#"
        UPDATE people SET
            name = COALESCE($3, name),
            vibe_summary = CASE WHEN $4 THEN $5 ELSE vibe_summary END,
            is_favorite = COALESCE($6, is_favorite),
            updated_at = now()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(changes.name.as_deref())
    .bind(set_vibe)
    .bind(vibe)
    .bind(changes.is_favorite)
    .fetch_optional(pool)
    .await
}

/// Deletes a person; their notes and insights go with them (FK cascade).
/// Returns `false` if no such person belongs to the user.
pub async fn delete_person(pool: &PgPool, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM people WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Returns the user's sample person, creating it with its insights on first
/// call.
pub async fn ensure_sample_person(pool: &PgPool, user_id: Uuid) -> Result<PersonRow, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let existing: Option<PersonRow> =
        sqlx::query_as("SELECT * FROM people WHERE user_id = $1 AND name = $2 LIMIT 1")
            .bind(user_id)
            .bind(SAMPLE_NAME)
            .fetch_optional(&mut *tx)
            .await?;
    if let Some(person) = existing {
        tx.commit().await?;
        return Ok(person);
    }

    let person: PersonRow = sqlx::query_as(
        r#"
        INSERT INTO people (id, user_id, name, vibe_summary)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(SAMPLE_NAME)
    .bind(SAMPLE_VIBE)
    .fetch_one(&mut *tx)
    .await?;

    for (category, content) in SAMPLE_INSIGHTS {
        sqlx::query(
            r#"
            INSERT INTO insights (id, person_id, user_id, category, content)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(person.id)
        .bind(user_id)
        .bind(category)
        .bind(content)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!("Created sample person {} for user {user_id}", person.id);
    Ok(person)
}
