//! Typed publish/subscribe channel for cross-view updates.
//!
//! Views that do not share a list (the capture bar and a person's notes
//! card, say) learn about each other's changes through this bus instead of
//! window-level events. Each subscriber gets its own stream.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Insight, InsightCategory, Note};
use crate::reconciler::ListReconciler;

pub const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AppEvent {
    NoteAdded {
        person_id: Uuid,
        note: Note,
    },
    NoteRemoved {
        person_id: Uuid,
        note_id: Uuid,
    },
    NoteConverted {
        person_id: Uuid,
        note_id: Uuid,
        category: InsightCategory,
    },
    InsightSaved {
        insight: Insight,
    },
    InsightRemoved {
        person_id: Uuid,
        insight_id: Uuid,
    },
    /// Transient user-facing message (toast).
    Notice {
        level: NoticeLevel,
        message: String,
    },
}

impl AppEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            AppEvent::NoteAdded { .. } => "note_added",
            AppEvent::NoteRemoved { .. } => "note_removed",
            AppEvent::NoteConverted { .. } => "note_converted",
            AppEvent::InsightSaved { .. } => "insight_saved",
            AppEvent::InsightRemoved { .. } => "insight_removed",
            AppEvent::Notice { .. } => "notice",
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        AppEvent::Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        AppEvent::Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes to all current subscribers. Dropped silently if there are none.
    pub fn publish(&self, event: AppEvent) {
        debug!(
            event_type = event.event_type(),
            subscriber_count = self.tx.receiver_count(),
            "EventBus publish"
        );
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Mirrors `NoteAdded` events for one person into that person's notes list.
///
/// The task ends when the bus is dropped or the list is disposed.
pub fn follow_person_notes(
    bus: &EventBus,
    person_id: Uuid,
    notes: ListReconciler<Note>,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = notes.closed() => {
                    debug!("Notes list for person {person_id} disposed, follower stopping");
                    break;
                }
                event = rx.recv() => event,
            };
            match event {
                Ok(AppEvent::NoteAdded { person_id: pid, note }) if pid == person_id => {
                    if !notes.insert_local(note) {
                        debug!("Note already present for person {person_id}, skipping");
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "Notes follower lagged, missed events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("Event bus closed, notes follower stopping");
                    break;
                }
            }
        }
    })
}
