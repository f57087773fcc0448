pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::avatar::handlers as avatar;
use crate::feed::handlers as feed;
use crate::insights::handlers as insights;
use crate::notes::handlers as notes;
use crate::people::handlers as people;
use crate::state::AppState;
use crate::validation::MAX_AVATAR_BYTES;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // People
        .route(
            "/people",
            get(people::handle_list_people).post(people::handle_create_person),
        )
        .route("/people/sample", post(people::handle_create_sample_person))
        .route(
            "/people/:id",
            get(people::handle_get_person)
                .patch(people::handle_update_person)
                .delete(people::handle_delete_person),
        )
        // Notes
        .route(
            "/people/:id/notes",
            get(notes::handle_list_notes).post(notes::handle_create_note),
        )
        .route(
            "/people/:id/notes/:note_id",
            delete(notes::handle_delete_note),
        )
        .route(
            "/people/:id/notes/:note_id/move-to-insight",
            post(notes::handle_move_to_insight),
        )
        // Insights
        .route(
            "/people/:id/insights",
            get(insights::handle_list_insights).post(insights::handle_create_insight),
        )
        .route(
            "/people/:id/insights/:insight_id",
            patch(insights::handle_update_insight)
                .delete(insights::handle_delete_insight),
        )
        // Feed
        .route("/feed", get(feed::handle_feed))
        // Profile
        .route(
            "/profile/avatar",
            put(avatar::handle_upload_avatar)
                .delete(avatar::handle_delete_avatar)
                .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + 64 * 1024)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use bytes::Bytes;
    use serde_json::Value;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::USER_ID_HEADER;
    use crate::avatar::storage::AvatarStore;
    use crate::errors::AppError;

    struct NullStore;

    #[async_trait]
    impl AvatarStore for NullStore {
        async fn put(&self, _key: &str, _body: Bytes, _content_type: &str) -> Result<(), AppError> {
            Ok(())
        }

        async fn delete(&self, _key: &str) -> Result<(), AppError> {
            Ok(())
        }

        fn public_url(&self, key: &str) -> String {
            format!("http://storage.test/{key}")
        }
    }

    /// Router over a pool that never connects. Only paths that fail before
    /// touching the database can be exercised.
    fn app() -> Router {
        let db = PgPoolOptions::new()
            .connect_lazy("postgres://refracty@localhost/refracty_test")
            .unwrap();
        build_router(AppState {
            db,
            avatars: Arc::new(NullStore),
        })
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_missing_user_is_unauthorized() {
        let (status, body) = send(Request::get("/feed").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_malformed_user_is_unauthorized() {
        let request = Request::get("/people")
            .header(USER_ID_HEADER, "someone")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_blank_person_name_rejected() {
        let (status, body) = send(json_request("POST", "/people", r#"{"name": "   "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Name is required");
    }

    #[tokio::test]
    async fn test_blank_note_rejected() {
        let uri = format!("/people/{}/notes", Uuid::new_v4());
        let (status, body) = send(json_request("POST", &uri, r#"{"content": " "}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Content is required");
    }

    #[tokio::test]
    async fn test_empty_insight_patch_rejected() {
        let uri = format!("/people/{}/insights/{}", Uuid::new_v4(), Uuid::new_v4());
        let (status, body) = send(json_request("PATCH", &uri, "{}")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Either content or category must be provided");
    }

    #[tokio::test]
    async fn test_avatar_rejects_non_image() {
        let boundary = "refracty-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\n\
             Content-Type: text/plain\r\n\r\n\
             hello\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::put("/profile/avatar")
            .header(USER_ID_HEADER, Uuid::new_v4().to_string())
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Please select a valid image file (JPEG, PNG, WebP, or GIF)"
        );
    }
}
