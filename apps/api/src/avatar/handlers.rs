use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::avatar::storage::avatar_key;
use crate::errors::AppError;
use crate::people::handlers::SuccessResponse;
use crate::state::AppState;
use crate::validation::{avatar_extension, check_avatar_size};

#[derive(Serialize)]
pub struct AvatarResponse {
    pub success: bool,
    pub avatar_url: String,
}

struct Upload {
    content_type: String,
    data: Bytes,
}

/// Pulls the `file` field out of the multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?;
        return Ok(Upload { content_type, data });
    }
    Err(AppError::Validation("No file provided".to_string()))
}

async fn current_avatar_key(pool: &PgPool, user_id: Uuid) -> Result<Option<String>, AppError> {
    let key: Option<Option<String>> =
        sqlx::query_scalar("SELECT avatar_key FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
    Ok(key.flatten())
}

async fn save_avatar(
    pool: &PgPool,
    user_id: Uuid,
    key: Option<&str>,
    url: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, avatar_key, avatar_url, updated_at)
        VALUES ($1, $2, $3, now())
        ON CONFLICT (user_id) DO UPDATE
        SET avatar_key = EXCLUDED.avatar_key,
            avatar_url = EXCLUDED.avatar_url,
            updated_at = now()
        "#,
    )
    .bind(user_id)
    .bind(key)
    .bind(url)
    .execute(pool)
    .await?;
    Ok(())
}

/// PUT /profile/avatar (multipart, field `file`)
pub async fn handle_upload_avatar(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    multipart: Multipart,
) -> Result<Json<AvatarResponse>, AppError> {
    let upload = read_upload(multipart).await?;
    let ext = avatar_extension(&upload.content_type)?;
    check_avatar_size(upload.data.len())?;

    let key = avatar_key(user_id, ext);
    let previous = current_avatar_key(&state.db, user_id).await?;

    state
        .avatars
        .put(&key, upload.data, &upload.content_type)
        .await?;

    // Same key means the upload already overwrote it.
    if let Some(old) = previous.filter(|old| *old != key) {
        if let Err(e) = state.avatars.delete(&old).await {
            warn!("Could not remove old avatar {old}: {e}");
        }
    }

    let url = state.avatars.public_url(&key);
    save_avatar(&state.db, user_id, Some(&key), Some(&url)).await?;
    info!("Avatar updated for user {user_id}");

    Ok(Json(AvatarResponse {
        success: true,
        avatar_url: url,
    }))
}

/// DELETE /profile/avatar
pub async fn handle_delete_avatar(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<SuccessResponse>, AppError> {
    if let Some(key) = current_avatar_key(&state.db, user_id).await? {
        state.avatars.delete(&key).await?;
    }
    save_avatar(&state.db, user_id, None, None).await?;
    Ok(SuccessResponse::ok())
}
