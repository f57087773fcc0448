//! In-memory gateway for deterministic tests.
//!
//! Keeps people, notes and insights in memory and applies mutations to them,
//! serves scripted feed pages, records every call, and can be told to fail a
//! given operation or to hold its requests until released.
//!
//! ```rust
//! use refracty_client::gateway::{Gateway, MockGateway, MockOp};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gateway = MockGateway::new();
//! gateway.fail_on(MockOp::DeleteNote, "Note not found");
//! let result = gateway.delete_note(uuid::Uuid::new_v4(), uuid::Uuid::new_v4()).await;
//! assert!(result.is_err());
//! assert_eq!(gateway.call_count(MockOp::DeleteNote), 1);
//! # }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::{Gateway, Page};
use crate::errors::{GatewayError, ValidationError};
use crate::models::{
    CreatePerson, FeedItem, Insight, InsightCategory, InsightPatch, NewInsight, Note, Person,
    PersonPatch, PersonWithNote,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    ListPeople,
    GetPerson,
    CreatePerson,
    UpdatePerson,
    DeletePerson,
    CreateSamplePerson,
    ListNotes,
    CreateNote,
    DeleteNote,
    MoveNoteToInsight,
    ListInsights,
    CreateInsight,
    UpdateInsight,
    DeleteInsight,
    ListFeed,
}

#[derive(Debug, Clone)]
pub struct MockCall {
    pub op: MockOp,
    /// Target id for single-entity operations, page number for the feed.
    pub target: Option<String>,
}

#[derive(Default)]
struct MockStore {
    user_id: Uuid,
    people: Vec<Person>,
    notes: Vec<Note>,
    insights: Vec<Insight>,
    feed_pages: HashMap<u32, Page<FeedItem>>,
    failures: HashMap<MockOp, String>,
    calls: Vec<MockCall>,
}

/// Mock [`Gateway`] backed by in-memory state.
#[derive(Clone)]
pub struct MockGateway {
    store: Arc<Mutex<MockStore>>,
    gates: Arc<Mutex<HashMap<MockOp, Arc<Semaphore>>>>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            store: Arc::new(Mutex::new(MockStore {
                user_id: Uuid::new_v4(),
                ..MockStore::default()
            })),
            gates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn store(&self) -> MutexGuard<'_, MockStore> {
        // A test that panicked mid-call poisons the lock; the data is still usable.
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn user_id(&self) -> Uuid {
        self.store().user_id
    }

    pub fn with_person(self, person: Person) -> Self {
        self.store().people.push(person);
        self
    }

    pub fn with_notes(self, notes: Vec<Note>) -> Self {
        self.store().notes.extend(notes);
        self
    }

    pub fn with_insights(self, insights: Vec<Insight>) -> Self {
        self.store().insights.extend(insights);
        self
    }

    /// Scripts the response for `list_feed(page, _)`.
    pub fn with_feed_page(self, page: u32, items: Vec<FeedItem>, has_more: bool) -> Self {
        self.store()
            .feed_pages
            .insert(page, Page { items, has_more });
        self
    }

    /// Makes every call to `op` fail with an application error until cleared.
    pub fn fail_on(&self, op: MockOp, message: &str) {
        self.store().failures.insert(op, message.to_string());
    }

    pub fn clear_failure(&self, op: MockOp) {
        self.store().failures.remove(&op);
    }

    /// Holds every subsequent `op` request until [`MockGateway::release`]
    /// hands out permits.
    pub fn hold(&self, op: MockOp) {
        self.gates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(op, Arc::new(Semaphore::new(0)));
    }

    /// Lets `n` held `op` requests through.
    pub fn release(&self, op: MockOp, n: usize) {
        if let Some(gate) = self.gates.lock().unwrap_or_else(|e| e.into_inner()).get(&op) {
            gate.add_permits(n);
        }
    }

    async fn pass_gate(&self, op: MockOp) {
        let gate = self
            .gates
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&op)
            .cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.store().calls.clone()
    }

    pub fn call_count(&self, op: MockOp) -> usize {
        self.store().calls.iter().filter(|c| c.op == op).count()
    }

    pub fn notes(&self) -> Vec<Note> {
        self.store().notes.clone()
    }

    pub fn insights(&self) -> Vec<Insight> {
        self.store().insights.clone()
    }

    /// Records the call and returns the scripted failure, if any.
    fn begin(&self, op: MockOp, target: Option<String>) -> Result<MutexGuard<'_, MockStore>, GatewayError> {
        let mut store = self.store();
        store.calls.push(MockCall { op, target });
        if let Some(message) = store.failures.get(&op) {
            return Err(GatewayError::Application {
                status: 400,
                message: message.clone(),
            });
        }
        Ok(store)
    }
}

fn not_found(what: &str) -> GatewayError {
    GatewayError::Application {
        status: 404,
        message: format!("{what} not found"),
    }
}

#[async_trait]
impl Gateway for MockGateway {
    async fn list_people(&self, favorites_only: bool) -> Result<Vec<PersonWithNote>, GatewayError> {
        let store = self.begin(MockOp::ListPeople, None)?;
        let mut people: Vec<_> = store
            .people
            .iter()
            .filter(|p| !favorites_only || p.is_favorite)
            .map(|p| PersonWithNote {
                person: p.clone(),
                first_note: store
                    .notes
                    .iter()
                    .filter(|n| n.person_id == p.id)
                    .min_by_key(|n| n.created_at)
                    .cloned(),
            })
            .collect();
        people.sort_by(|a, b| b.person.created_at.cmp(&a.person.created_at));
        Ok(people)
    }

    async fn get_person(&self, id: Uuid) -> Result<Person, GatewayError> {
        let store = self.begin(MockOp::GetPerson, Some(id.to_string()))?;
        store
            .people
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound("Person".to_string()))
    }

    async fn create_person(&self, input: &CreatePerson) -> Result<Person, GatewayError> {
        let mut store = self.begin(MockOp::CreatePerson, None)?;
        if input.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        let now = Utc::now();
        let person = Person {
            id: Uuid::new_v4(),
            user_id: store.user_id,
            name: input.name.trim().to_string(),
            vibe_summary: input.vibe_summary.clone(),
            is_favorite: false,
            created_at: now,
            updated_at: now,
        };
        if let Some(first) = input.first_note.as_deref().filter(|s| !s.trim().is_empty()) {
            let note = Note {
                id: Uuid::new_v4(),
                person_id: person.id,
                user_id: store.user_id,
                content: first.trim().to_string(),
                created_at: now,
                updated_at: now,
            };
            store.notes.push(note);
        }
        store.people.push(person.clone());
        Ok(person)
    }

    async fn update_person(&self, id: Uuid, patch: &PersonPatch) -> Result<Person, GatewayError> {
        let mut store = self.begin(MockOp::UpdatePerson, Some(id.to_string()))?;
        if patch.is_empty() {
            return Err(ValidationError::EmptyPersonPatch.into());
        }
        let person = store
            .people
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found("Person"))?;
        if let Some(name) = &patch.name {
            person.name = name.trim().to_string();
        }
        if let Some(vibe) = &patch.vibe_summary {
            person.vibe_summary = vibe.clone();
        }
        if let Some(is_favorite) = patch.is_favorite {
            person.is_favorite = is_favorite;
        }
        person.updated_at = Utc::now();
        Ok(person.clone())
    }

    async fn delete_person(&self, id: Uuid) -> Result<(), GatewayError> {
        let mut store = self.begin(MockOp::DeletePerson, Some(id.to_string()))?;
        let before = store.people.len();
        store.people.retain(|p| p.id != id);
        if store.people.len() == before {
            return Err(not_found("Person"));
        }
        store.notes.retain(|n| n.person_id != id);
        store.insights.retain(|i| i.person_id != id);
        Ok(())
    }

    async fn create_sample_person(&self) -> Result<Person, GatewayError> {
        let mut store = self.begin(MockOp::CreateSamplePerson, None)?;
        if let Some(existing) = store.people.iter().find(|p| p.name == "Alex (Sample)") {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        let person = Person {
            id: Uuid::new_v4(),
            user_id: store.user_id,
            name: "Alex (Sample)".to_string(),
            vibe_summary: Some("Example person to show how insights work".to_string()),
            is_favorite: false,
            created_at: now,
            updated_at: now,
        };
        store.people.push(person.clone());
        Ok(person)
    }

    async fn list_notes(&self, person_id: Uuid) -> Result<Vec<Note>, GatewayError> {
        let store = self.begin(MockOp::ListNotes, Some(person_id.to_string()))?;
        let mut notes: Vec<_> = store
            .notes
            .iter()
            .filter(|n| n.person_id == person_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notes)
    }

    async fn create_note(&self, person_id: Uuid, content: &str) -> Result<Note, GatewayError> {
        self.pass_gate(MockOp::CreateNote).await;
        let mut store = self.begin(MockOp::CreateNote, Some(person_id.to_string()))?;
        if content.trim().is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            person_id,
            user_id: store.user_id,
            content: content.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        store.notes.push(note.clone());
        Ok(note)
    }

    async fn delete_note(&self, person_id: Uuid, note_id: Uuid) -> Result<(), GatewayError> {
        self.pass_gate(MockOp::DeleteNote).await;
        let mut store = self.begin(MockOp::DeleteNote, Some(note_id.to_string()))?;
        store
            .notes
            .retain(|n| !(n.id == note_id && n.person_id == person_id));
        Ok(())
    }

    async fn move_note_to_insight(
        &self,
        person_id: Uuid,
        note_id: Uuid,
        category: InsightCategory,
    ) -> Result<(), GatewayError> {
        self.pass_gate(MockOp::MoveNoteToInsight).await;
        let mut store = self.begin(MockOp::MoveNoteToInsight, Some(note_id.to_string()))?;
        let index = store
            .notes
            .iter()
            .position(|n| n.id == note_id && n.person_id == person_id)
            .ok_or_else(|| not_found("Note"))?;
        let note = store.notes.remove(index);
        let now = Utc::now();
        store.insights.push(Insight {
            id: Uuid::new_v4(),
            person_id,
            user_id: note.user_id,
            category,
            content: note.content,
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    async fn list_insights(&self, person_id: Uuid) -> Result<Vec<Insight>, GatewayError> {
        let store = self.begin(MockOp::ListInsights, Some(person_id.to_string()))?;
        let mut insights: Vec<_> = store
            .insights
            .iter()
            .filter(|i| i.person_id == person_id)
            .cloned()
            .collect();
        insights.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(insights)
    }

    async fn create_insight(&self, input: &NewInsight) -> Result<Insight, GatewayError> {
        self.pass_gate(MockOp::CreateInsight).await;
        let mut store = self.begin(MockOp::CreateInsight, Some(input.person_id.to_string()))?;
        if input.content.trim().is_empty() {
            return Err(ValidationError::EmptyContent.into());
        }
        let now = Utc::now();
        let insight = Insight {
            id: Uuid::new_v4(),
            person_id: input.person_id,
            user_id: store.user_id,
            category: input.category,
            content: input.content.trim().to_string(),
            created_at: now,
            updated_at: now,
        };
        store.insights.push(insight.clone());
        Ok(insight)
    }

    async fn update_insight(
        &self,
        _person_id: Uuid,
        insight_id: Uuid,
        patch: &InsightPatch,
    ) -> Result<Insight, GatewayError> {
        self.pass_gate(MockOp::UpdateInsight).await;
        let mut store = self.begin(MockOp::UpdateInsight, Some(insight_id.to_string()))?;
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }
        let insight = store
            .insights
            .iter_mut()
            .find(|i| i.id == insight_id)
            .ok_or_else(|| not_found("Insight"))?;
        if let Some(content) = &patch.content {
            insight.content = content.trim().to_string();
        }
        if let Some(category) = patch.category {
            insight.category = category;
        }
        insight.updated_at = Utc::now();
        Ok(insight.clone())
    }

    async fn delete_insight(&self, _person_id: Uuid, insight_id: Uuid) -> Result<(), GatewayError> {
        self.pass_gate(MockOp::DeleteInsight).await;
        let mut store = self.begin(MockOp::DeleteInsight, Some(insight_id.to_string()))?;
        store.insights.retain(|i| i.id != insight_id);
        Ok(())
    }

    async fn list_feed(&self, page: u32, _limit: u32) -> Result<Page<FeedItem>, GatewayError> {
        drop(self.begin(MockOp::ListFeed, Some(page.to_string()))?);
        self.pass_gate(MockOp::ListFeed).await;

        let store = self.store();
        Ok(store
            .feed_pages
            .get(&page)
            .cloned()
            .unwrap_or_else(|| Page::last(Vec::new())))
    }
}
