//! Request/response wrapper over the Refracty backend.
//!
//! One method per (resource, verb) pair. Calls are validated structurally
//! only; business rules (non-empty content, ownership) are enforced by the
//! backend and come back as [`GatewayError::Application`]. Nothing here
//! retries: retry policy belongs to the caller.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::models::{
    CreatePerson, FeedItem, Insight, InsightCategory, InsightPatch, NewInsight, Note, Person,
    PersonPatch, PersonWithNote,
};

pub mod http;
pub mod mock;

pub use http::HttpGateway;
pub use mock::{MockCall, MockGateway, MockOp};

/// One page of a paginated list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            has_more: false,
        }
    }
}

#[async_trait]
pub trait Gateway: Send + Sync {
    // People
    async fn list_people(&self, favorites_only: bool) -> Result<Vec<PersonWithNote>, GatewayError>;
    async fn get_person(&self, id: Uuid) -> Result<Person, GatewayError>;
    async fn create_person(&self, input: &CreatePerson) -> Result<Person, GatewayError>;
    async fn update_person(&self, id: Uuid, patch: &PersonPatch) -> Result<Person, GatewayError>;
    async fn delete_person(&self, id: Uuid) -> Result<(), GatewayError>;
    async fn create_sample_person(&self) -> Result<Person, GatewayError>;

    // Notes
    async fn list_notes(&self, person_id: Uuid) -> Result<Vec<Note>, GatewayError>;
    async fn create_note(&self, person_id: Uuid, content: &str) -> Result<Note, GatewayError>;
    async fn delete_note(&self, person_id: Uuid, note_id: Uuid) -> Result<(), GatewayError>;
    async fn move_note_to_insight(
        &self,
        person_id: Uuid,
        note_id: Uuid,
        category: InsightCategory,
    ) -> Result<(), GatewayError>;

    // Insights
    async fn list_insights(&self, person_id: Uuid) -> Result<Vec<Insight>, GatewayError>;
    async fn create_insight(&self, input: &NewInsight) -> Result<Insight, GatewayError>;
    async fn update_insight(
        &self,
        person_id: Uuid,
        insight_id: Uuid,
        patch: &InsightPatch,
    ) -> Result<Insight, GatewayError>;
    async fn delete_insight(&self, person_id: Uuid, insight_id: Uuid) -> Result<(), GatewayError>;

    // Feed
    async fn list_feed(&self, page: u32, limit: u32) -> Result<Page<FeedItem>, GatewayError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Page sources
// ────────────────────────────────────────────────────────────────────────────

/// Where a reconciled list gets its pages from. Page numbers start at 1.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<Page<T>, GatewayError>;
}

/// The combined notes + insights timeline.
pub struct FeedSource {
    gateway: Arc<dyn Gateway>,
}

impl FeedSource {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl PageSource<FeedItem> for FeedSource {
    async fn fetch_page(&self, page: u32, limit: u32) -> Result<Page<FeedItem>, GatewayError> {
        self.gateway.list_feed(page, limit).await
    }
}

/// All notes of one person. The endpoint is not paginated, so page 1 is the
/// whole list and later pages are empty.
pub struct PersonNotesSource {
    gateway: Arc<dyn Gateway>,
    person_id: Uuid,
}

impl PersonNotesSource {
    pub fn new(gateway: Arc<dyn Gateway>, person_id: Uuid) -> Self {
        Self { gateway, person_id }
    }
}

#[async_trait]
impl PageSource<Note> for PersonNotesSource {
    async fn fetch_page(&self, page: u32, _limit: u32) -> Result<Page<Note>, GatewayError> {
        if page > 1 {
            return Ok(Page::last(Vec::new()));
        }
        Ok(Page::last(self.gateway.list_notes(self.person_id).await?))
    }
}

/// All insights of one person, oldest first.
pub struct PersonInsightsSource {
    gateway: Arc<dyn Gateway>,
    person_id: Uuid,
}

impl PersonInsightsSource {
    pub fn new(gateway: Arc<dyn Gateway>, person_id: Uuid) -> Self {
        Self { gateway, person_id }
    }
}

#[async_trait]
impl PageSource<Insight> for PersonInsightsSource {
    async fn fetch_page(&self, page: u32, _limit: u32) -> Result<Page<Insight>, GatewayError> {
        if page > 1 {
            return Ok(Page::last(Vec::new()));
        }
        Ok(Page::last(self.gateway.list_insights(self.person_id).await?))
    }
}

/// The sidebar / people page list.
pub struct PeopleSource {
    gateway: Arc<dyn Gateway>,
    favorites_only: bool,
}

impl PeopleSource {
    pub fn new(gateway: Arc<dyn Gateway>, favorites_only: bool) -> Self {
        Self {
            gateway,
            favorites_only,
        }
    }
}

#[async_trait]
impl PageSource<PersonWithNote> for PeopleSource {
    async fn fetch_page(
        &self,
        page: u32,
        _limit: u32,
    ) -> Result<Page<PersonWithNote>, GatewayError> {
        if page > 1 {
            return Ok(Page::last(Vec::new()));
        }
        Ok(Page::last(
            self.gateway.list_people(self.favorites_only).await?,
        ))
    }
}
