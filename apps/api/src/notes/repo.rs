use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::insight::{InsightCategory, InsightRow};
use crate::models::note::NoteRow;

/// A person's notes, newest first.
pub async fn list_notes(
    pool: &PgPool,
    user_id: Uuid,
    person_id: Uuid,
) -> Result<Vec<NoteRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM notes
        WHERE person_id = $1 AND user_id = $2
        ORDER BY created_at DESC
        "#,
    )
    .bind(person_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn create_note(
    pool: &PgPool,
    user_id: Uuid,
    person_id: Uuid,
    content: &str,
) -> Result<NoteRow, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO notes (id, person_id, user_id, content)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(person_id)
    .bind(user_id)
    .bind(content)
    .fetch_one(pool)
    .await
}

pub async fn delete_note(
    pool: &PgPool,
    user_id: Uuid,
    person_id: Uuid,
    note_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM notes WHERE id = $1 AND person_id = $2 AND user_id = $3")
            .bind(note_id)
            .bind(person_id)
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}

/// Turns a note into an insight with the same content. The insert and the
/// delete commit together; `None` if the note does not exist.
pub async fn move_to_insight(
    pool: &PgPool,
    user_id: Uuid,
    person_id: Uuid,
    note_id: Uuid,
    category: InsightCategory,
) -> Result<Option<InsightRow>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let note: Option<NoteRow> = sqlx::query_as(
        r#"
        DELETE FROM notes
        WHERE id = $1 AND person_id = $2 AND user_id = $3
        RETURNING *
        "#,
    )
    .bind(note_id)
    .bind(person_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(note) = note else {
        tx.rollback().await?;
        return Ok(None);
    };

    let insight: InsightRow = sqlx::query_as(
        r#"
        INSERT INTO insights (id, person_id, user_id, category, content)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(person_id)
    .bind(user_id)
    .bind(category)
    .bind(&note.content)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    info!("Moved note {note_id} to insight {} ({category:?})", insight.id);
    Ok(Some(insight))
}
