//! Optimistic edits against reconciled lists, with rollback on failure.
//!
//! Every user-initiated change is applied to the visible list first, then
//! sent to the backend. On success the list is left alone (the server copy
//! differs only in timestamps); on failure the list is put back exactly as it
//! was and an error notice goes out on the bus. Creates are not optimistic:
//! the item only appears once the server has assigned its id.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::GatewayError;
use crate::events::{AppEvent, EventBus};
use crate::gateway::Gateway;
use crate::models::{
    validate_capture, Insight, InsightCategory, InsightPatch, MutableItem, NewInsight, Note,
    ResourceKind,
};
use crate::reconciler::{FetchOutcome, ListReconciler, Refresh};

#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    /// The backend accepted the change; the optimistic state stands.
    Committed,
    /// The backend refused or was unreachable; the list was restored.
    RolledBack { error: String },
    /// The target is not in the list. Nothing was sent.
    Missing,
    /// Another mutation on the same id has not settled yet. Nothing was sent.
    Busy,
    /// The request was invalid before it reached the backend.
    Rejected { error: String },
}

impl MutationOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, MutationOutcome::Committed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome<T> {
    Created(T),
    Rejected { error: String },
    Failed { error: String },
}

impl<T> CreateOutcome<T> {
    pub fn created(self) -> Option<T> {
        match self {
            CreateOutcome::Created(item) => Some(item),
            _ => None,
        }
    }
}

/// Marks an id as having a mutation in flight until dropped.
struct InFlight {
    ids: Arc<Mutex<HashSet<Uuid>>>,
    id: Uuid,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.ids
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

#[derive(Clone)]
pub struct MutationCoordinator {
    gateway: Arc<dyn Gateway>,
    bus: EventBus,
    in_flight: Arc<Mutex<HashSet<Uuid>>>,
}

impl MutationCoordinator {
    pub fn new(gateway: Arc<dyn Gateway>, bus: EventBus) -> Self {
        Self {
            gateway,
            bus,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn is_in_flight(&self, id: Uuid) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&id)
    }

    fn claim(&self, id: Uuid) -> Option<InFlight> {
        let mut ids = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !ids.insert(id) {
            return None;
        }
        Some(InFlight {
            ids: Arc::clone(&self.in_flight),
            id,
        })
    }

    fn fail(&self, action: &str, id: Uuid, err: &GatewayError) -> MutationOutcome {
        warn!("{action} failed for {id}, rolling back: {err}");
        let error = err.user_message();
        self.bus.publish(AppEvent::error(error.clone()));
        MutationOutcome::RolledBack { error }
    }

    /// Removes an item, then deletes it on the backend. A failed delete puts
    /// the item back between the neighbours it was removed from.
    pub async fn delete<T: MutableItem>(
        &self,
        list: &ListReconciler<T>,
        id: Uuid,
    ) -> MutationOutcome {
        let Some(_claim) = self.claim(id) else {
            return MutationOutcome::Busy;
        };
        let Some(removed) = list.remove_local(id) else {
            return MutationOutcome::Missing;
        };
        let person_id = removed.item.person_id();
        let kind = removed.item.kind();

        let result = match kind {
            ResourceKind::Note => self.gateway.delete_note(person_id, id).await,
            ResourceKind::Insight => self.gateway.delete_insight(person_id, id).await,
        };

        match result {
            Ok(()) => {
                let (event, message) = match kind {
                    ResourceKind::Note => (
                        AppEvent::NoteRemoved {
                            person_id,
                            note_id: id,
                        },
                        "Note deleted",
                    ),
                    ResourceKind::Insight => (
                        AppEvent::InsightRemoved {
                            person_id,
                            insight_id: id,
                        },
                        "Insight deleted",
                    ),
                };
                self.bus.publish(event);
                self.bus.publish(AppEvent::success(message));
                MutationOutcome::Committed
            }
            Err(err) => {
                list.restore(removed);
                self.fail("Delete", id, &err)
            }
        }
    }

    /// Moves an insight to another category in place.
    pub async fn recategorize<T: MutableItem>(
        &self,
        list: &ListReconciler<T>,
        id: Uuid,
        category: InsightCategory,
    ) -> MutationOutcome {
        let Some(_claim) = self.claim(id) else {
            return MutationOutcome::Busy;
        };
        let Some(previous) = list.get(id) else {
            return MutationOutcome::Missing;
        };
        let Some(updated) = previous.with_category(category) else {
            return MutationOutcome::Rejected {
                error: "Only insights have a category".to_string(),
            };
        };

        list.replace_local(id, updated);
        let patch = InsightPatch::category(category);
        match self
            .gateway
            .update_insight(previous.person_id(), id, &patch)
            .await
        {
            Ok(insight) => {
                self.bus.publish(AppEvent::InsightSaved { insight });
                self.bus.publish(AppEvent::success(format!(
                    "Moved to {}",
                    category.label()
                )));
                MutationOutcome::Committed
            }
            Err(err) => {
                list.replace_local(id, previous);
                self.fail("Recategorize", id, &err)
            }
        }
    }

    /// Rewrites an insight's text. Notes have no update endpoint and are
    /// rejected without touching the list.
    pub async fn edit_content<T: MutableItem>(
        &self,
        list: &ListReconciler<T>,
        id: Uuid,
        content: &str,
    ) -> MutationOutcome {
        let content = content.trim();
        if content.is_empty() {
            return MutationOutcome::Rejected {
                error: "Content cannot be empty".to_string(),
            };
        }
        let Some(_claim) = self.claim(id) else {
            return MutationOutcome::Busy;
        };
        let Some(previous) = list.get(id) else {
            return MutationOutcome::Missing;
        };
        if previous.kind() == ResourceKind::Note {
            return MutationOutcome::Rejected {
                error: "Notes cannot be edited".to_string(),
            };
        }

        list.replace_local(id, previous.with_content(content));
        let patch = InsightPatch::content(content);
        match self
            .gateway
            .update_insight(previous.person_id(), id, &patch)
            .await
        {
            Ok(insight) => {
                self.bus.publish(AppEvent::InsightSaved { insight });
                self.bus.publish(AppEvent::success("Insight updated"));
                MutationOutcome::Committed
            }
            Err(err) => {
                list.replace_local(id, previous);
                self.fail("Edit", id, &err)
            }
        }
    }

    /// Converts a note into an insight of `category`. The note leaves the
    /// list immediately; on success every list in `dependents` is reloaded
    /// so the new insight shows up wherever it belongs.
    pub async fn move_note_to_insight<T: MutableItem>(
        &self,
        notes: &ListReconciler<T>,
        note_id: Uuid,
        category: InsightCategory,
        dependents: &[&dyn Refresh],
    ) -> MutationOutcome {
        let Some(_claim) = self.claim(note_id) else {
            return MutationOutcome::Busy;
        };
        match notes.get(note_id) {
            None => return MutationOutcome::Missing,
            Some(item) if item.kind() != ResourceKind::Note => {
                return MutationOutcome::Rejected {
                    error: "Only notes can be moved to insights".to_string(),
                };
            }
            Some(_) => {}
        }
        let Some(removed) = notes.remove_local(note_id) else {
            return MutationOutcome::Missing;
        };
        let person_id = removed.item.person_id();

        match self
            .gateway
            .move_note_to_insight(person_id, note_id, category)
            .await
        {
            Ok(()) => {
                info!("Note {note_id} moved to {category}");
                self.bus.publish(AppEvent::NoteConverted {
                    person_id,
                    note_id,
                    category,
                });
                self.bus.publish(AppEvent::success(format!(
                    "Moved to {}",
                    category.label()
                )));
                for list in dependents {
                    if let FetchOutcome::Failed(error) = list.refresh().await {
                        warn!("Dependent list failed to reload after moving {note_id}: {error}");
                        self.bus.publish(AppEvent::error(error));
                    }
                }
                MutationOutcome::Committed
            }
            Err(err) => {
                notes.restore(removed);
                self.fail("Move to insight", note_id, &err)
            }
        }
    }

    /// Saves a quick-capture note for a person. The note is inserted at the
    /// head of `notes` when given, and announced on the bus either way so
    /// other views showing that person pick it up.
    pub async fn capture_note(
        &self,
        person_id: Uuid,
        content: &str,
        notes: Option<&ListReconciler<Note>>,
    ) -> CreateOutcome<Note> {
        let content = match validate_capture(content) {
            Ok(content) => content,
            Err(err) => {
                return CreateOutcome::Rejected {
                    error: err.to_string(),
                }
            }
        };

        match self.gateway.create_note(person_id, &content).await {
            Ok(note) => {
                if let Some(list) = notes {
                    list.insert_local(note.clone());
                }
                self.bus.publish(AppEvent::NoteAdded {
                    person_id,
                    note: note.clone(),
                });
                self.bus.publish(AppEvent::success("Note captured"));
                CreateOutcome::Created(note)
            }
            Err(err) => {
                warn!("Failed to capture note for {person_id}: {err}");
                let error = err.user_message();
                self.bus.publish(AppEvent::error(error.clone()));
                CreateOutcome::Failed { error }
            }
        }
    }

    /// Adds an insight and appends it to `insights` (which is oldest first).
    pub async fn add_insight(
        &self,
        insights: &ListReconciler<Insight>,
        input: NewInsight,
    ) -> CreateOutcome<Insight> {
        let content = input.content.trim();
        if content.is_empty() {
            return CreateOutcome::Rejected {
                error: "Content is required".to_string(),
            };
        }
        let input = NewInsight {
            content: content.to_string(),
            ..input
        };

        match self.gateway.create_insight(&input).await {
            Ok(insight) => {
                insights.append_local(insight.clone());
                self.bus.publish(AppEvent::InsightSaved {
                    insight: insight.clone(),
                });
                self.bus.publish(AppEvent::success("Insight added"));
                CreateOutcome::Created(insight)
            }
            Err(err) => {
                warn!("Failed to add insight for {}: {err}", input.person_id);
                let error = err.user_message();
                self.bus.publish(AppEvent::error(error.clone()));
                CreateOutcome::Failed { error }
            }
        }
    }
}
