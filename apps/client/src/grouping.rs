//! Category grouping for a person's insights.

use std::collections::BTreeMap;

use tokio::sync::watch;

use crate::models::{Insight, InsightCategory};
use crate::reconciler::ListReconciler;

/// Insights keyed by category. Every category is present, possibly empty,
/// and iteration follows [`InsightCategory::ALL`].
pub type CategoryGroups = BTreeMap<InsightCategory, Vec<Insight>>;

/// Groups insights by category, preserving their relative order.
pub fn group_by_category(items: &[Insight]) -> CategoryGroups {
    let mut groups: CategoryGroups = InsightCategory::ALL
        .into_iter()
        .map(|c| (c, Vec::new()))
        .collect();
    for insight in items {
        groups
            .entry(insight.category)
            .or_default()
            .push(insight.clone());
    }
    groups
}

/// Grouped view over an insights list, re-derived whenever the list changes.
pub struct CategoryView {
    list: ListReconciler<Insight>,
    changes: watch::Receiver<u64>,
    groups: CategoryGroups,
}

impl CategoryView {
    pub fn new(list: ListReconciler<Insight>) -> Self {
        let mut changes = list.subscribe();
        changes.borrow_and_update();
        let groups = group_by_category(&list.items());
        Self {
            list,
            changes,
            groups,
        }
    }

    /// Current groups, recomputed from scratch if the list changed since the
    /// last call.
    pub fn groups(&mut self) -> &CategoryGroups {
        if self.changes.has_changed().unwrap_or(false) {
            self.changes.borrow_and_update();
            self.groups = group_by_category(&self.list.items());
        }
        &self.groups
    }

    pub fn category(&mut self, category: InsightCategory) -> &[Insight] {
        self.groups()
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Waits for the next change to the underlying list. Returns `false`
    /// once the list is gone.
    pub async fn changed(&mut self) -> bool {
        self.changes.changed().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MockGateway, PersonInsightsSource};
    use chrono::Utc;
    use std::sync::Arc;
    use uuid::Uuid;

    fn insight(category: InsightCategory, content: &str) -> Insight {
        Insight {
            id: Uuid::new_v4(),
            person_id: Uuid::nil(),
            user_id: Uuid::nil(),
            category,
            content: content.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_input_has_all_categories() {
        let groups = group_by_category(&[]);
        assert_eq!(groups.len(), 5);
        assert!(groups.values().all(Vec::is_empty));
        let keys: Vec<_> = groups.keys().copied().collect();
        assert_eq!(keys, InsightCategory::ALL.to_vec());
    }

    #[test]
    fn test_preserves_relative_order() {
        let items = vec![
            insight(InsightCategory::WorksBestWhen, "first"),
            insight(InsightCategory::MotivatedBy, "m"),
            insight(InsightCategory::WorksBestWhen, "second"),
        ];
        let groups = group_by_category(&items);
        let wbw: Vec<_> = groups[&InsightCategory::WorksBestWhen]
            .iter()
            .map(|i| i.content.as_str())
            .collect();
        assert_eq!(wbw, vec!["first", "second"]);
        assert_eq!(groups[&InsightCategory::MotivatedBy].len(), 1);
        assert!(groups[&InsightCategory::FeedbackApproach].is_empty());
    }

    #[test]
    fn test_view_follows_recategorization() {
        let gateway = Arc::new(MockGateway::new());
        let list = ListReconciler::new(
            Arc::new(PersonInsightsSource::new(gateway, Uuid::nil())),
            20,
        );
        let a = insight(InsightCategory::MotivatedBy, "a");
        list.initialize(vec![a.clone()], false);

        let mut view = CategoryView::new(list.clone());
        assert_eq!(view.category(InsightCategory::MotivatedBy).len(), 1);

        let moved = Insight {
            category: InsightCategory::CollaborationStyle,
            ..a.clone()
        };
        list.replace_local(a.id, moved);

        assert!(view.category(InsightCategory::MotivatedBy).is_empty());
        assert_eq!(view.category(InsightCategory::CollaborationStyle).len(), 1);
    }
}
