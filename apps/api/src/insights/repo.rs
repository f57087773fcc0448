use sqlx::PgPool;
use uuid::Uuid;

use crate::models::insight::{InsightCategory, InsightRow};

/// A person's insights, oldest first.
pub async fn list_insights(
    pool: &PgPool,
    user_id: Uuid,
    person_id: Uuid,
) -> Result<Vec<InsightRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM insights
        WHERE person_id = $1 AND user_id = $2
        ORDER BY created_at ASC
        "#,
    )
    .bind(person_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn create_insight(
    pool: &PgPool,
    user_id: Uuid,
    person_id: Uuid,
    category: InsightCategory,
    content: &str,
) -> Result<InsightRow, sqlx::Error> {
    sqlx::query_as(
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
    .bind(content)
    .fetch_one(pool)
    .await
}

pub async fn update_insight(
    pool: &PgPool,
    user_id: Uuid,
    person_id: Uuid,
    insight_id: Uuid,
    content: Option<&str>,
    category: Option<InsightCategory>,
) -> Result<Option<InsightRow>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE insights SET
            content = COALESCE($4, content),
            category = COALESCE($5, category),
            updated_at = now()
        WHERE id = $1 AND person_id = $2 AND user_id = $3
        RETURNING *
        "#,
    )
    .bind(insight_id)
    .bind(person_id)
    .bind(user_id)
    .bind(content)
    .bind(category)
    .fetch_optional(pool)
    .await
}

pub async fn delete_insight(
    pool: &PgPool,
    user_id: Uuid,
    person_id: Uuid,
    insight_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM insights WHERE id = $1 AND person_id = $2 AND user_id = $3")
            .bind(insight_id)
            .bind(person_id)
            .bind(user_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected() > 0)
}
