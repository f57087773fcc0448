use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;

/// Maximum length of a quick-capture note, in characters.
pub const CAPTURE_MAX_CHARS: usize = 144;

/// Name used when a feed row arrives without its person join.
pub const UNKNOWN_PERSON: &str = "Unknown";

// ────────────────────────────────────────────────────────────────────────────
// Entities
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Person {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub vibe_summary: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A person together with their earliest note, as shown in the people list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonWithNote {
    #[serde(flatten)]
    pub person: Person,
    #[serde(default)]
    pub first_note: Option<Note>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: Uuid,
    pub person_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Insight {
    pub id: Uuid,
    pub person_id: Uuid,
    pub user_id: Uuid,
    pub category: InsightCategory,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The five fixed insight categories. Declaration order is display order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    MotivatedBy,
    PreferredCommunication,
    WorksBestWhen,
    CollaborationStyle,
    FeedbackApproach,
}

impl InsightCategory {
    pub const ALL: [InsightCategory; 5] = [
        InsightCategory::MotivatedBy,
        InsightCategory::PreferredCommunication,
        InsightCategory::WorksBestWhen,
        InsightCategory::CollaborationStyle,
        InsightCategory::FeedbackApproach,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InsightCategory::MotivatedBy => "motivated_by",
            InsightCategory::PreferredCommunication => "preferred_communication",
            InsightCategory::WorksBestWhen => "works_best_when",
            InsightCategory::CollaborationStyle => "collaboration_style",
            InsightCategory::FeedbackApproach => "feedback_approach",
        }
    }

    /// Human label used as the section heading.
    pub fn label(&self) -> &'static str {
        match self {
            InsightCategory::MotivatedBy => "Motivated by",
            InsightCategory::PreferredCommunication => "Preferred communication",
            InsightCategory::WorksBestWhen => "Works best when",
            InsightCategory::CollaborationStyle => "Collaboration style",
            InsightCategory::FeedbackApproach => "Feedback approach",
        }
    }
}

impl fmt::Display for InsightCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InsightCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InsightCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

/// Denormalized person snapshot carried by feed items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
}

impl PersonRef {
    pub fn unknown(id: Uuid) -> Self {
        Self {
            id,
            name: UNKNOWN_PERSON.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoteWithPerson {
    #[serde(flatten)]
    pub note: Note,
    pub person: PersonRef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InsightWithPerson {
    #[serde(flatten)]
    pub insight: Insight,
    pub person: PersonRef,
}

/// One entry of the combined timeline. The `type` tag is fixed once an item
/// exists; converting a note produces a new insight item rather than retagging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedItem {
    Note(NoteWithPerson),
    Insight(InsightWithPerson),
}

impl FeedItem {
    pub fn person(&self) -> &PersonRef {
        match self {
            FeedItem::Note(n) => &n.person,
            FeedItem::Insight(i) => &i.person,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            FeedItem::Note(n) => &n.note.content,
            FeedItem::Insight(i) => &i.insight.content,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            FeedItem::Note(n) => n.note.created_at,
            FeedItem::Insight(i) => i.insight.created_at,
        }
    }

    pub fn is_note(&self) -> bool {
        matches!(self, FeedItem::Note(_))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// List item capabilities
// ────────────────────────────────────────────────────────────────────────────

/// Which backend resource an item lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Note,
    Insight,
}

/// Anything a reconciled list can hold: it must carry a stable id.
pub trait ListItem: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;
}

/// Items the mutation coordinator can delete, edit and recategorize.
pub trait MutableItem: ListItem {
    fn person_id(&self) -> Uuid;

    fn kind(&self) -> ResourceKind;

    fn with_content(&self, content: &str) -> Self;

    /// Returns `None` when the item has no category (notes).
    fn with_category(&self, category: InsightCategory) -> Option<Self>;
}

impl ListItem for Note {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl ListItem for Insight {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl ListItem for FeedItem {
    fn id(&self) -> Uuid {
        match self {
            FeedItem::Note(n) => n.note.id,
            FeedItem::Insight(i) => i.insight.id,
        }
    }
}

impl ListItem for PersonWithNote {
    fn id(&self) -> Uuid {
        self.person.id
    }
}

impl MutableItem for Note {
    fn person_id(&self) -> Uuid {
        self.person_id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Note
    }

    fn with_content(&self, content: &str) -> Self {
        Note {
            content: content.to_string(),
            ..self.clone()
        }
    }

    fn with_category(&self, _category: InsightCategory) -> Option<Self> {
        None
    }
}

impl MutableItem for Insight {
    fn person_id(&self) -> Uuid {
        self.person_id
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::Insight
    }

    fn with_content(&self, content: &str) -> Self {
        Insight {
            content: content.to_string(),
            ..self.clone()
        }
    }

    fn with_category(&self, category: InsightCategory) -> Option<Self> {
        Some(Insight {
            category,
            ..self.clone()
        })
    }
}

impl MutableItem for FeedItem {
    fn person_id(&self) -> Uuid {
        self.person().id
    }

    fn kind(&self) -> ResourceKind {
        match self {
            FeedItem::Note(_) => ResourceKind::Note,
            FeedItem::Insight(_) => ResourceKind::Insight,
        }
    }

    fn with_content(&self, content: &str) -> Self {
        match self {
            FeedItem::Note(n) => FeedItem::Note(NoteWithPerson {
                note: n.note.with_content(content),
                person: n.person.clone(),
            }),
            FeedItem::Insight(i) => FeedItem::Insight(InsightWithPerson {
                insight: i.insight.with_content(content),
                person: i.person.clone(),
            }),
        }
    }

    fn with_category(&self, category: InsightCategory) -> Option<Self> {
        match self {
            FeedItem::Note(_) => None,
            FeedItem::Insight(i) => Some(FeedItem::Insight(InsightWithPerson {
                insight: i.insight.with_category(category)?,
                person: i.person.clone(),
            })),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Request bodies
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreatePerson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibe_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_note: Option<String>,
}

/// Partial update of a person. `vibe_summary: Some(None)` clears the field.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct PersonPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibe_summary: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
}

impl PersonPatch {
    pub fn favorite(is_favorite: bool) -> Self {
        Self {
            is_favorite: Some(is_favorite),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.vibe_summary.is_none() && self.is_favorite.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewInsight {
    pub person_id: Uuid,
    pub category: InsightCategory,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct InsightPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<InsightCategory>,
}

impl InsightPatch {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            category: None,
        }
    }

    pub fn category(category: InsightCategory) -> Self {
        Self {
            content: None,
            category: Some(category),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_none() && self.category.is_none()
    }
}

/// Validates quick-capture text and returns the trimmed content.
pub fn validate_capture(content: &str) -> Result<String, ValidationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    let len = trimmed.chars().count();
    if len > CAPTURE_MAX_CHARS {
        return Err(ValidationError::TooLong {
            max: CAPTURE_MAX_CHARS,
            actual: len,
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_order_matches_display_order() {
        let labels: Vec<_> = InsightCategory::ALL.iter().map(|c| c.label()).collect();
        assert_eq!(
            labels,
            vec![
                "Motivated by",
                "Preferred communication",
                "Works best when",
                "Collaboration style",
                "Feedback approach"
            ]
        );
        let mut sorted = InsightCategory::ALL.to_vec();
        sorted.sort();
        assert_eq!(sorted, InsightCategory::ALL.to_vec());
    }

    #[test]
    fn test_category_from_str() {
        assert_eq!(
            "works_best_when".parse::<InsightCategory>().unwrap(),
            InsightCategory::WorksBestWhen
        );
        assert!("vibes".parse::<InsightCategory>().is_err());
    }

    #[test]
    fn test_feed_item_deserializes_tagged_note() {
        let id = Uuid::new_v4();
        let person_id = Uuid::new_v4();
        let value = json!({
            "type": "note",
            "id": id,
            "person_id": person_id,
            "user_id": Uuid::new_v4(),
            "content": "Prefers mornings",
            "created_at": "2025-01-01T10:00:00Z",
            "updated_at": "2025-01-01T10:00:00Z",
            "person": { "id": person_id, "name": "Sam" }
        });
        let item: FeedItem = serde_json::from_value(value).unwrap();
        assert!(item.is_note());
        assert_eq!(item.id(), id);
        assert_eq!(item.person().name, "Sam");
        assert_eq!(item.content(), "Prefers mornings");
    }

    #[test]
    fn test_feed_item_deserializes_tagged_insight() {
        let person_id = Uuid::new_v4();
        let value = json!({
            "type": "insight",
            "id": Uuid::new_v4(),
            "person_id": person_id,
            "user_id": Uuid::new_v4(),
            "category": "feedback_approach",
            "content": "Direct, in private",
            "created_at": "2025-01-01T10:00:00Z",
            "updated_at": "2025-01-01T10:00:00Z",
            "person": { "id": person_id, "name": "Sam" }
        });
        let item: FeedItem = serde_json::from_value(value).unwrap();
        assert_eq!(item.kind(), ResourceKind::Insight);
        let moved = item.with_category(InsightCategory::MotivatedBy).unwrap();
        match moved {
            FeedItem::Insight(i) => assert_eq!(i.insight.category, InsightCategory::MotivatedBy),
            FeedItem::Note(_) => panic!("tag must not change"),
        }
    }

    #[test]
    fn test_note_has_no_category() {
        let note = Note {
            id: Uuid::new_v4(),
            person_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            content: "x".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(note.with_category(InsightCategory::MotivatedBy).is_none());
        assert_eq!(note.with_content("y").content, "y");
    }

    #[test]
    fn test_person_patch_serializes_null_vibe() {
        let patch = PersonPatch {
            vibe_summary: Some(None),
            ..PersonPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "vibe_summary": null })
        );
        assert!(PersonPatch::default().is_empty());
        assert_eq!(
            serde_json::to_value(PersonPatch::favorite(true)).unwrap(),
            json!({ "is_favorite": true })
        );
    }

    #[test]
    fn test_validate_capture() {
        assert_eq!(validate_capture("  hello  ").unwrap(), "hello");
        assert!(matches!(
            validate_capture("   "),
            Err(ValidationError::EmptyContent)
        ));
        let exact = "é".repeat(CAPTURE_MAX_CHARS);
        assert!(validate_capture(&exact).is_ok());
        let over = "a".repeat(CAPTURE_MAX_CHARS + 1);
        assert!(matches!(
            validate_capture(&over),
            Err(ValidationError::TooLong { max: 144, actual: 145 })
        ));
    }
}
