use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::insight::{InsightCategory, InsightRow};
use crate::models::note::NoteRow;
use crate::notes::repo;
use crate::people::handlers::SuccessResponse;
use crate::people::repo as people_repo;
use crate::state::AppState;
use crate::validation::required_text;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct MoveToInsightRequest {
    pub category: InsightCategory,
}

#[derive(Serialize)]
pub struct NotesResponse {
    pub success: bool,
    pub notes: Vec<NoteRow>,
}

#[derive(Serialize)]
pub struct NoteResponse {
    pub success: bool,
    pub note: NoteRow,
}

#[derive(Serialize)]
pub struct MovedResponse {
    pub success: bool,
    pub insight: InsightRow,
}

/// Fails with 404 unless the person exists and belongs to the caller.
pub(crate) async fn require_person(
    state: &AppState,
    user_id: Uuid,
    person_id: Uuid,
) -> Result<(), AppError> {
    people_repo::get_person(&state.db, user_id, person_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound("Person not found".to_string()))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /people/:id/notes
pub async fn handle_list_notes(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(person_id): Path<Uuid>,
) -> Result<Json<NotesResponse>, AppError> {
    let notes = repo::list_notes(&state.db, user_id, person_id).await?;
    Ok(Json(NotesResponse {
        success: true,
        notes,
    }))
}

/// POST /people/:id/notes
pub async fn handle_create_note(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(person_id): Path<Uuid>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<(StatusCode, Json<NoteResponse>), AppError> {
    let content = required_text(&req.content, "Content is required")?;
    require_person(&state, user_id, person_id).await?;

    let note = repo::create_note(&state.db, user_id, person_id, &content).await?;
    Ok((
        StatusCode::CREATED,
        Json(NoteResponse {
            success: true,
            note,
        }),
    ))
}

/// DELETE /people/:id/notes/:note_id
pub async fn handle_delete_note(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((person_id, note_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !repo::delete_note(&state.db, user_id, person_id, note_id).await? {
        return Err(AppError::NotFound("Note not found".to_string()));
    }
    Ok(SuccessResponse::ok())
}

/// POST /people/:id/notes/:note_id/move-to-insight
pub async fn handle_move_to_insight(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((person_id, note_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<MoveToInsightRequest>,
) -> Result<Json<MovedResponse>, AppError> {
    let insight = repo::move_to_insight(&state.db, user_id, person_id, note_id, req.category)
        .await?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))?;
    Ok(Json(MovedResponse {
        success: true,
        insight,
    }))
}
