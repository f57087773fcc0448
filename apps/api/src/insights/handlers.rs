use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::insights::repo;
use crate::models::insight::{InsightCategory, InsightRow};
use crate::notes::handlers::require_person;
use crate::people::handlers::SuccessResponse;
use crate::state::AppState;
use crate::validation::required_text;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateInsightRequest {
    pub category: InsightCategory,
    pub content: String,
    /// Echoed by clients; the path parameter is authoritative.
    #[serde(default)]
    pub person_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateInsightRequest {
    pub content: Option<String>,
    pub category: Option<InsightCategory>,
}

/// A validated insight update.
#[derive(Debug, PartialEq)]
pub struct InsightChanges {
    pub content: Option<String>,
    pub category: Option<InsightCategory>,
}

impl TryFrom<UpdateInsightRequest> for InsightChanges {
    type Error = AppError;

    fn try_from(req: UpdateInsightRequest) -> Result<Self, Self::Error> {
        if req.content.is_none() && req.category.is_none() {
            return Err(AppError::Validation(
                "Either content or category must be provided".to_string(),
            ));
        }
        let content = req
            .content
            .as_deref()
            .map(|c| required_text(c, "Content cannot be empty"))
            .transpose()?;
        Ok(InsightChanges {
            content,
            category: req.category,
        })
    }
}

#[derive(Serialize)]
pub struct InsightsResponse {
    pub success: bool,
    pub insights: Vec<InsightRow>,
}

#[derive(Serialize)]
pub struct InsightResponse {
    pub success: bool,
    pub insight: InsightRow,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /people/:id/insights
pub async fn handle_list_insights(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(person_id): Path<Uuid>,
) -> Result<Json<InsightsResponse>, AppError> {
    let insights = repo::list_insights(&state.db, user_id, person_id).await?;
    Ok(Json(InsightsResponse {
        success: true,
        insights,
    }))
}

/// POST /people/:id/insights
pub async fn handle_create_insight(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(person_id): Path<Uuid>,
    Json(req): Json<CreateInsightRequest>,
) -> Result<(StatusCode, Json<InsightResponse>), AppError> {
    let content = required_text(&req.content, "Content is required")?;
    if req.person_id.is_some_and(|id| id != person_id) {
        return Err(AppError::Validation(
            "person_id does not match the URL".to_string(),
        ));
    }
    require_person(&state, user_id, person_id).await?;

    let insight =
        repo::create_insight(&state.db, user_id, person_id, req.category, &content).await?;
    Ok((
        StatusCode::CREATED,
        Json(InsightResponse {
            success: true,
            insight,
        }),
    ))
}

/// PATCH /people/:id/insights/:insight_id
pub async fn handle_update_insight(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((person_id, insight_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateInsightRequest>,
) -> Result<Json<InsightResponse>, AppError> {
    let changes = InsightChanges::try_from(req)?;
    let insight = repo::update_insight(
        &state.db,
        user_id,
        person_id,
        insight_id,
        changes.content.as_deref(),
        changes.category,
    )
    .await?
    .ok_or_else(|| AppError::NotFound("Insight not found".to_string()))?;
    Ok(Json(InsightResponse {
        success: true,
        insight,
    }))
}

/// DELETE /people/:id/insights/:insight_id
pub async fn handle_delete_insight(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path((person_id, insight_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !repo::delete_insight(&state.db, user_id, person_id, insight_id).await? {
        return Err(AppError::NotFound("Insight not found".to_string()));
    }
    Ok(SuccessResponse::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_update_rejected() {
        let err = InsightChanges::try_from(UpdateInsightRequest::default()).unwrap_err();
        assert!(
            matches!(err, AppError::Validation(msg) if msg == "Either content or category must be provided")
        );
    }

    #[test]
    fn test_blank_content_rejected() {
        let req = UpdateInsightRequest {
            content: Some("   ".into()),
            category: Some(InsightCategory::MotivatedBy),
        };
        assert!(matches!(
            InsightChanges::try_from(req),
            Err(AppError::Validation(msg)) if msg == "Content cannot be empty"
        ));
    }

    #[test]
    fn test_category_only() {
        let req: UpdateInsightRequest =
            serde_json::from_str(r#"{"category": "collaboration_style"}"#).unwrap();
        assert_eq!(
            InsightChanges::try_from(req).unwrap(),
            InsightChanges {
                content: None,
                category: Some(InsightCategory::CollaborationStyle),
            }
        );
    }
}
