use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Gateway, Page};
use crate::config::ClientConfig;
use crate::errors::{GatewayError, ValidationError};
use crate::models::{
    CreatePerson, FeedItem, Insight, InsightCategory, InsightPatch, NewInsight, Note, Person,
    PersonPatch, PersonWithNote,
};

/// Header carrying the ambient caller identity.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Response envelope shared by every endpoint: `{success?, error?, ...payload}`.
/// List endpoints omit `success`, so it is optional here.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    payload: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Ack {}

#[derive(Debug, Deserialize)]
struct PeopleBody {
    people: Vec<PersonWithNote>,
}

#[derive(Debug, Deserialize)]
struct PersonBody {
    person: Person,
}

#[derive(Debug, Deserialize)]
struct NotesBody {
    notes: Vec<Note>,
}

#[derive(Debug, Deserialize)]
struct NoteBody {
    note: Note,
}

#[derive(Debug, Deserialize)]
struct InsightsBody {
    insights: Vec<Insight>,
}

#[derive(Debug, Deserialize)]
struct InsightBody {
    insight: Insight,
}

#[derive(Debug, Deserialize)]
struct FeedBody {
    items: Vec<FeedItem>,
    #[serde(rename = "hasMore")]
    has_more: bool,
}

#[derive(Debug, Serialize)]
struct ContentBody<'a> {
    content: &'a str,
}

/// [`Gateway`] over HTTP. Every request carries the configured user id.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    user_id: Uuid,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            user_id: config.user_id,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(self.url(path))
            .header(USER_ID_HEADER, self.user_id.to_string())
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.client
            .post(self.url(path))
            .header(USER_ID_HEADER, self.user_id.to_string())
    }

    fn patch(&self, path: &str) -> RequestBuilder {
        self.client
            .patch(self.url(path))
            .header(USER_ID_HEADER, self.user_id.to_string())
    }

    fn delete(&self, path: &str) -> RequestBuilder {
        self.client
            .delete(self.url(path))
            .header(USER_ID_HEADER, self.user_id.to_string())
    }

    /// Sends a request and unwraps the envelope.
    ///
    /// `entity` names the resource for a 404 on single-entity reads; other
    /// 404s are reported as application errors like any non-2xx.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        entity: Option<&str>,
    ) -> Result<T, GatewayError> {
        let response = request.send().await.map_err(|e| {
            warn!("Gateway request failed: {e}");
            GatewayError::Transport(e)
        })?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            if let Some(entity) = entity {
                return Err(GatewayError::NotFound(entity.to_string()));
            }
        }

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
            debug!("Gateway returned {status}: {message}");
            return Err(GatewayError::Application {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        if envelope.success == Some(false) {
            return Err(GatewayError::Application {
                status: status.as_u16(),
                message: envelope
                    .error
                    .unwrap_or_else(|| "Operation failed".to_string()),
            });
        }

        Ok(envelope.payload)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn list_people(&self, favorites_only: bool) -> Result<Vec<PersonWithNote>, GatewayError> {
        let mut request = self.get("/people");
        if favorites_only {
            request = request.query(&[("favorites", "true")]);
        }
        let body: PeopleBody = self.send(request, None).await?;
        Ok(body.people)
    }

    async fn get_person(&self, id: Uuid) -> Result<Person, GatewayError> {
        let body: PersonBody = self
            .send(self.get(&format!("/people/{id}")), Some("Person"))
            .await?;
        Ok(body.person)
    }

    async fn create_person(&self, input: &CreatePerson) -> Result<Person, GatewayError> {
        let body: PersonBody = self.send(self.post("/people").json(input), None).await?;
        Ok(body.person)
    }

    async fn update_person(&self, id: Uuid, patch: &PersonPatch) -> Result<Person, GatewayError> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPersonPatch.into());
        }
        let body: PersonBody = self
            .send(self.patch(&format!("/people/{id}")).json(patch), None)
            .await?;
        Ok(body.person)
    }

    async fn delete_person(&self, id: Uuid) -> Result<(), GatewayError> {
        let _: Ack = self.send(self.delete(&format!("/people/{id}")), None).await?;
        Ok(())
    }

    async fn create_sample_person(&self) -> Result<Person, GatewayError> {
        let body: PersonBody = self.send(self.post("/people/sample"), None).await?;
        Ok(body.person)
    }

    async fn list_notes(&self, person_id: Uuid) -> Result<Vec<Note>, GatewayError> {
        let body: NotesBody = self
            .send(self.get(&format!("/people/{person_id}/notes")), None)
            .await?;
        Ok(body.notes)
    }

    async fn create_note(&self, person_id: Uuid, content: &str) -> Result<Note, GatewayError> {
        let body: NoteBody = self
            .send(
                self.post(&format!("/people/{person_id}/notes"))
                    .json(&ContentBody { content }),
                None,
            )
            .await?;
        Ok(body.note)
    }

    async fn delete_note(&self, person_id: Uuid, note_id: Uuid) -> Result<(), GatewayError> {
        let _: Ack = self
            .send(
                self.delete(&format!("/people/{person_id}/notes/{note_id}")),
                None,
            )
            .await?;
        Ok(())
    }

    async fn move_note_to_insight(
        &self,
        person_id: Uuid,
        note_id: Uuid,
        category: InsightCategory,
    ) -> Result<(), GatewayError> {
        let _: Ack = self
            .send(
                self.post(&format!(
                    "/people/{person_id}/notes/{note_id}/move-to-insight"
                ))
                .json(&json!({ "category": category })),
                None,
            )
            .await?;
        Ok(())
    }

    async fn list_insights(&self, person_id: Uuid) -> Result<Vec<Insight>, GatewayError> {
        let body: InsightsBody = self
            .send(self.get(&format!("/people/{person_id}/insights")), None)
            .await?;
        Ok(body.insights)
    }

    async fn create_insight(&self, input: &NewInsight) -> Result<Insight, GatewayError> {
        let body: InsightBody = self
            .send(
                self.post(&format!("/people/{}/insights", input.person_id))
                    .json(input),
                None,
            )
            .await?;
        Ok(body.insight)
    }

    async fn update_insight(
        &self,
        person_id: Uuid,
        insight_id: Uuid,
        patch: &InsightPatch,
    ) -> Result<Insight, GatewayError> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }
        let body: InsightBody = self
            .send(
                self.patch(&format!("/people/{person_id}/insights/{insight_id}"))
                    .json(patch),
                None,
            )
            .await?;
        Ok(body.insight)
    }

    async fn delete_insight(&self, person_id: Uuid, insight_id: Uuid) -> Result<(), GatewayError> {
        let _: Ack = self
            .send(
                self.delete(&format!("/people/{person_id}/insights/{insight_id}")),
                None,
            )
            .await?;
        Ok(())
    }

    async fn list_feed(&self, page: u32, limit: u32) -> Result<Page<FeedItem>, GatewayError> {
        let body: FeedBody = self
            .send(
                self.get("/feed").query(&[("page", page), ("limit", limit)]),
                None,
            )
            .await?;
        Ok(Page {
            items: body.items,
            has_more: body.has_more,
        })
    }
}
