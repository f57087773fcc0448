//! HTTP gateway against a mock backend: headers, envelopes and error mapping.

use refracty_client::gateway::http::USER_ID_HEADER;
use refracty_client::models::{FeedItem, InsightCategory, InsightPatch, PersonPatch};
use refracty_client::{ClientConfig, Gateway, GatewayError, HttpGateway, ValidationError};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TS: &str = "2024-05-01T12:00:00Z";

fn gateway(server: &MockServer, user_id: Uuid) -> HttpGateway {
    HttpGateway::new(&ClientConfig::new(server.uri(), user_id)).expect("client builds")
}

fn note_json(id: Uuid, person_id: Uuid, content: &str) -> serde_json::Value {
    json!({
        "id": id,
        "person_id": person_id,
        "user_id": Uuid::nil(),
        "content": content,
        "created_at": TS,
        "updated_at": TS
    })
}

#[tokio::test]
async fn test_every_request_carries_user_id() {
    let server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    let person_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!("/people/{person_id}/notes")))
        .and(header(USER_ID_HEADER, user_id.to_string().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "notes": [note_json(Uuid::new_v4(), person_id, "likes tea")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let notes = gateway(&server, user_id).list_notes(person_id).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].content, "likes tea");
}

#[tokio::test]
async fn test_success_false_is_application_error() {
    let server = MockServer::start().await;
    let person_id = Uuid::new_v4();
    let note_id = Uuid::new_v4();

    Mock::given(method("DELETE"))
        .and(path(format!("/people/{person_id}/notes/{note_id}")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "success": false, "error": "Note not found" })),
        )
        .mount(&server)
        .await;

    let err = gateway(&server, Uuid::new_v4())
        .delete_note(person_id, note_id)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Application { status: 200, .. }));
    assert_eq!(err.user_message(), "Note not found");
}

#[tokio::test]
async fn test_non_2xx_carries_server_message() {
    let server = MockServer::start().await;
    let person_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!("/people/{person_id}/notes")))
        .and(body_json(json!({ "content": "  " })))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "success": false, "error": "Content is required" })),
        )
        .mount(&server)
        .await;

    let err = gateway(&server, Uuid::new_v4())
        .create_note(person_id, "  ")
        .await
        .unwrap_err();
    match err {
        GatewayError::Application { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "Content is required");
        }
        other => panic!("expected application error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_error_without_body_uses_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/people"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = gateway(&server, Uuid::new_v4())
        .list_people(false)
        .await
        .unwrap_err();
    assert_eq!(err.user_message(), "Request failed with status 502");
}

#[tokio::test]
async fn test_get_person_404_is_not_found() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("GET"))
        .and(path(format!("/people/{id}")))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "success": false, "error": "Person not found" })),
        )
        .mount(&server)
        .await;

    let err = gateway(&server, Uuid::new_v4())
        .get_person(id)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotFound(ref what) if what == "Person"));
    assert_eq!(err.user_message(), "Person not found");
}

#[tokio::test]
async fn test_feed_page_parses_items_and_has_more() {
    let server = MockServer::start().await;
    let person_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(query_param("page", "2"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "type": "note",
                    "id": Uuid::new_v4(),
                    "person_id": person_id,
                    "user_id": Uuid::nil(),
                    "content": "quiet in standups",
                    "created_at": TS,
                    "updated_at": TS,
                    "person": { "id": person_id, "name": "Sam" }
                },
                {
                    "type": "insight",
                    "id": Uuid::new_v4(),
                    "person_id": person_id,
                    "user_id": Uuid::nil(),
                    "category": "works_best_when",
                    "content": "has a clear brief",
                    "created_at": TS,
                    "updated_at": TS,
                    "person": { "id": person_id, "name": "Unknown" }
                }
            ],
            "hasMore": true
        })))
        .mount(&server)
        .await;

    let page = gateway(&server, Uuid::new_v4())
        .list_feed(2, 20)
        .await
        .unwrap();
    assert!(page.has_more);
    assert_eq!(page.items.len(), 2);
    assert!(page.items[0].is_note());
    match &page.items[1] {
        FeedItem::Insight(i) => {
            assert_eq!(i.insight.category, InsightCategory::WorksBestWhen);
            assert_eq!(i.person.name, "Unknown");
        }
        other => panic!("expected insight, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_patch_never_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = gateway(&server, Uuid::new_v4())
        .update_insight(Uuid::new_v4(), Uuid::new_v4(), &InsightPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Invalid(ValidationError::EmptyPatch)));
}

#[tokio::test]
async fn test_empty_person_patch_names_people_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = gateway(&server, Uuid::new_v4())
        .update_person(Uuid::new_v4(), &PersonPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Invalid(ValidationError::EmptyPersonPatch)));
    assert_eq!(err.user_message(), "No fields to update");
}

#[tokio::test]
async fn test_move_to_insight_sends_category() {
    let server = MockServer::start().await;
    let person_id = Uuid::new_v4();
    let note_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/people/{person_id}/notes/{note_id}/move-to-insight"
        )))
        .and(body_json(json!({ "category": "feedback_approach" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    gateway(&server, Uuid::new_v4())
        .move_note_to_insight(person_id, note_id, InsightCategory::FeedbackApproach)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unreachable_server_is_transport_error() {
    // Grab a free port and close it again so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let gateway = HttpGateway::new(&ClientConfig::new(uri, Uuid::new_v4())).unwrap();
    let err = gateway.list_feed(1, 20).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(
        err.user_message(),
        "Network error. Check your connection and try again."
    );
}
