use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::person::{PersonRow, PersonWithNote};
use crate::notes::repo as notes_repo;
use crate::people::repo::{self, PersonChanges};
use crate::state::AppState;
use crate::validation::{optional_text, required_text};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListPeopleQuery {
    #[serde(default)]
    pub favorites: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreatePersonRequest {
    pub name: String,
    pub vibe_summary: Option<String>,
    pub first_note: Option<String>,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePersonRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub vibe_summary: Option<Option<String>>,
    pub is_favorite: Option<bool>,
}

#[derive(Serialize)]
pub struct PeopleResponse {
    pub people: Vec<PersonWithNote>,
}

#[derive(Serialize)]
pub struct PersonResponse {
    pub success: bool,
    pub person: PersonRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PersonResponse {
    fn ok(person: PersonRow) -> Self {
        Self {
            success: true,
            person,
            error: None,
        }
    }
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// Validates a patch into column changes. Blank names are rejected; a blank
/// summary clears the field.
pub fn person_changes(req: UpdatePersonRequest) -> Result<PersonChanges, AppError> {
    if req.name.is_none() && req.vibe_summary.is_none() && req.is_favorite.is_none() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }
    let name = req
        .name
        .as_deref()
        .map(|n| required_text(n, "Name is required"))
        .transpose()?;
    Ok(PersonChanges {
        name,
        vibe_summary: req.vibe_summary.map(|v| optional_text(v.as_deref())),
        is_favorite: req.is_favorite,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /people[?favorites=true]
pub async fn handle_list_people(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(params): Query<ListPeopleQuery>,
) -> Result<Json<PeopleResponse>, AppError> {
    let people = repo::list_people(&state.db, user_id, params.favorites).await?;
    Ok(Json(PeopleResponse { people }))
}

/// POST /people
pub async fn handle_create_person(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(req): Json<CreatePersonRequest>,
) -> Result<(StatusCode, Json<PersonResponse>), AppError> {
    let name = required_text(&req.name, "Name is required")?;
    let vibe = optional_text(req.vibe_summary.as_deref());

    let person = repo::create_person(&state.db, user_id, &name, vibe.as_deref()).await?;
    let mut response = PersonResponse::ok(person);

    // The person stands even if their first note cannot be saved.
    if let Some(first_note) = optional_text(req.first_note.as_deref()) {
        if let Err(e) =
            notes_repo::create_note(&state.db, user_id, response.person.id, &first_note).await
        {
            warn!("First note for person {} failed: {e}", response.person.id);
            response.error = Some("Person created but note failed to save".to_string());
        }
    }

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /people/sample
pub async fn handle_create_sample_person(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<PersonResponse>, AppError> {
    let person = repo::ensure_sample_person(&state.db, user_id).await?;
    Ok(Json(PersonResponse::ok(person)))
}

/// GET /people/:id
pub async fn handle_get_person(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PersonResponse>, AppError> {
    let person = repo::get_person(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Person not found".to_string()))?;
    Ok(Json(PersonResponse::ok(person)))
}

/// PATCH /people/:id
pub async fn handle_update_person(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePersonRequest>,
) -> Result<Json<PersonResponse>, AppError> {
    let changes = person_changes(req)?;
    let person = repo::update_person(&state.db, user_id, id, &changes)
        .await?
        .ok_or_else(|| AppError::Validation("Failed to update person".to_string()))?;
    Ok(Json(PersonResponse::ok(person)))
}

/// DELETE /people/:id
pub async fn handle_delete_person(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !repo::delete_person(&state.db, user_id, id).await? {
        return Err(AppError::NotFound("Person not found".to_string()));
    }
    Ok(SuccessResponse::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> UpdatePersonRequest {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_null_vibe_clears() {
        let changes = person_changes(parse(r#"{"vibe_summary": null}"#)).unwrap();
        assert_eq!(changes.vibe_summary, Some(None));
        assert!(changes.name.is_none());
    }

    #[test]
    fn test_absent_vibe_untouched() {
        let changes = person_changes(parse(r#"{"is_favorite": true}"#)).unwrap();
        assert_eq!(changes.vibe_summary, None);
        assert_eq!(changes.is_favorite, Some(true));
    }

    #[test]
    fn test_blank_vibe_clears() {
        let changes = person_changes(parse(r#"{"vibe_summary": "   "}"#)).unwrap();
        assert_eq!(changes.vibe_summary, Some(None));
    }

    #[test]
    fn test_blank_name_rejected() {
        assert!(matches!(
            person_changes(parse(r#"{"name": "  "}"#)),
            Err(AppError::Validation(msg)) if msg == "Name is required"
        ));
    }

    #[test]
    fn test_empty_patch_rejected() {
        assert!(person_changes(parse("{}")).is_err());
    }

    #[test]
    fn test_name_trimmed() {
        let changes = person_changes(parse(r#"{"name": " Priya "}"#)).unwrap();
        assert_eq!(changes.name.as_deref(), Some("Priya"));
    }
}
