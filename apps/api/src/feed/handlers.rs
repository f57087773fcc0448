use axum::{
    extract::{Query, State},
    Json,
};
use serde::Serialize;

use super::{repo, FeedItem, FeedQuery, Pagination};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct FeedResponse {
    pub success: bool,
    pub items: Vec<FeedItem>,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

/// GET /feed?page=N&limit=M
pub async fn handle_feed(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, AppError> {
    let pagination = Pagination::from_query(&query);
    let (items, total) = repo::fetch_page(&state.db, user_id, pagination).await?;
    Ok(Json(FeedResponse {
        success: true,
        items,
        has_more: pagination.has_more(total),
    }))
}
