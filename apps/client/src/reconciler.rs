//! Owns one rendered list's items and its pagination cursor.
//!
//! Server pages are appended at the tail in arrival order; locally created
//! items are prepended. Neither path sorts by timestamp. The reconciler never
//! holds two items with the same id, and `has_more` only goes from `false`
//! back to `true` through [`ListReconciler::initialize`].
//!
//! State lives behind a short-lived mutex that is never held across an
//! await, so a page fetch and optimistic mutations interleave in call order.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::gateway::PageSource;
use crate::models::ListItem;

/// Result of a `fetch_more` / `reload` call. Never an error: failures are
/// logged and reported here so the caller can surface them.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Nothing to do: already loading, no more pages, or disposed.
    Skipped,
    /// The page arrived and this many new items were merged.
    Appended(usize),
    /// The page arrived after a reset or disposal and was dropped.
    Discarded,
    Failed(String),
}

/// Snapshot of an item taken on removal, enough to put it back exactly.
///
/// `prev` and `next` are the neighbours at removal time (`None` at either
/// end). Rollback places the item against whichever neighbour is still
/// present, so removals that settle out of order restore the original
/// sequence. An item that was first goes back to the head; otherwise
/// `index` is the fallback when both neighbours are gone.
#[derive(Debug, Clone, PartialEq)]
pub struct Removed<T> {
    pub index: usize,
    pub prev: Option<Uuid>,
    pub next: Option<Uuid>,
    pub item: T,
}

struct ListState<T> {
    items: Vec<T>,
    page: u32,
    has_more: bool,
    loading: bool,
    epoch: u64,
    disposed: bool,
    /// Ids removed locally. Neither a late page nor a reload may bring them
    /// back; only a local reinsert (rollback) clears one.
    tombstones: HashSet<Uuid>,
}

impl<T: ListItem> ListState<T> {
    fn contains(&self, id: Uuid) -> bool {
        self.items.iter().any(|i| i.id() == id)
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|i| i.id() == id)
    }

    fn restore_index(&self, removed: &Removed<T>) -> usize {
        if let Some(at) = removed.next.and_then(|id| self.position(id)) {
            return at;
        }
        match removed.prev {
            Some(id) => match self.position(id) {
                Some(at) => at + 1,
                None => removed.index.min(self.items.len()),
            },
            None => 0,
        }
    }
}

/// Clears `loading` when a fetch future is dropped before its page arrives,
/// so an abandoned request does not wedge the list.
struct AbandonGuard<'a, T: ListItem> {
    list: &'a ListReconciler<T>,
    epoch: u64,
    armed: bool,
}

impl<T: ListItem> AbandonGuard<'_, T> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl<T: ListItem> Drop for AbandonGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.list.lock();
            if state.epoch == self.epoch {
                state.loading = false;
            }
        }
    }
}

/// Handle to a reconciled list. Clones share the same state.
pub struct ListReconciler<T: ListItem> {
    state: Arc<Mutex<ListState<T>>>,
    source: Arc<dyn PageSource<T>>,
    page_size: u32,
    revision: Arc<watch::Sender<u64>>,
    closed: Arc<watch::Sender<bool>>,
}

impl<T: ListItem> Clone for ListReconciler<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            source: Arc::clone(&self.source),
            page_size: self.page_size,
            revision: Arc::clone(&self.revision),
            closed: Arc::clone(&self.closed),
        }
    }
}

impl<T: ListItem> ListReconciler<T> {
    /// Creates an empty list. Call [`ListReconciler::initialize`] with the
    /// server-rendered first page before use.
    pub fn new(source: Arc<dyn PageSource<T>>, page_size: u32) -> Self {
        let (revision, _) = watch::channel(0);
        let (closed, _) = watch::channel(false);
        Self {
            state: Arc::new(Mutex::new(ListState {
                items: Vec::new(),
                page: 1,
                has_more: false,
                loading: false,
                epoch: 0,
                disposed: false,
                tombstones: HashSet::new(),
            })),
            source,
            page_size: page_size.max(1),
            revision: Arc::new(revision),
            closed: Arc::new(closed),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListState<T>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    pub fn items(&self) -> Vec<T> {
        self.lock().items.clone()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.lock().items.iter().map(|i| i.id()).collect()
    }

    pub fn get(&self, id: Uuid) -> Option<T> {
        self.lock().items.iter().find(|i| i.id() == id).cloned()
    }

    pub fn position(&self, id: Uuid) -> Option<usize> {
        self.lock().position(id)
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    pub fn page(&self) -> u32 {
        self.lock().page
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    /// Receiver that ticks on every change to the item sequence.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Resolves once the list has been disposed.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    // ── Transitions ─────────────────────────────────────────────────────────

    /// Replaces the list with a server-provided first page.
    ///
    /// Resets the cursor to page 1 and drops any page still in flight.
    /// Duplicate ids in `items` keep their first occurrence, and ids removed
    /// locally stay removed.
    pub fn initialize(&self, items: Vec<T>, has_more: bool) {
        {
            let mut state = self.lock();
            let mut seen = HashSet::with_capacity(items.len());
            let kept: Vec<T> = items
                .into_iter()
                .filter(|i| !state.tombstones.contains(&i.id()) && seen.insert(i.id()))
                .collect();
            state.items = kept;
            state.page = 1;
            state.has_more = has_more;
            state.loading = false;
            state.epoch += 1;
        }
        self.bump();
    }

    /// Loads the next page and appends it.
    ///
    /// No-op while a fetch is in flight or once the list is exhausted, so
    /// overlapping triggers issue exactly one request.
    pub async fn fetch_more(&self) -> FetchOutcome {
        let (next_page, epoch) = {
            let mut state = self.lock();
            if state.disposed || state.loading || !state.has_more {
                return FetchOutcome::Skipped;
            }
            state.loading = true;
            (state.page + 1, state.epoch)
        };

        debug!("Fetching page {next_page} (limit {})", self.page_size);
        let abandon = AbandonGuard {
            list: self,
            epoch,
            armed: true,
        };
        let result = self.source.fetch_page(next_page, self.page_size).await;
        abandon.disarm();

        let outcome = {
            let mut state = self.lock();
            if state.disposed || state.epoch != epoch {
                debug!("Dropping page {next_page}: list was reset or disposed");
                return FetchOutcome::Discarded;
            }
            state.loading = false;

            match result {
                Ok(page) => {
                    let before = state.items.len();
                    for item in page.items {
                        let id = item.id();
                        if state.tombstones.contains(&id) || state.contains(id) {
                            continue;
                        }
                        state.items.push(item);
                    }
                    state.page = next_page;
                    state.has_more = page.has_more;
                    FetchOutcome::Appended(state.items.len() - before)
                }
                Err(e) => {
                    warn!("Failed to fetch page {next_page}: {e}");
                    return FetchOutcome::Failed(e.user_message());
                }
            }
        };

        self.bump();
        outcome
    }

    /// Re-fetches the first page and re-initializes from it.
    pub async fn reload(&self) -> FetchOutcome {
        if self.is_disposed() {
            return FetchOutcome::Skipped;
        }
        match self.source.fetch_page(1, self.page_size).await {
            Ok(page) => {
                if self.is_disposed() {
                    return FetchOutcome::Discarded;
                }
                self.initialize(page.items, page.has_more);
                FetchOutcome::Appended(self.len())
            }
            Err(e) => {
                warn!("Failed to reload list: {e}");
                FetchOutcome::Failed(e.user_message())
            }
        }
    }

    /// Prepends a locally created item. Returns `false` if the id is already
    /// present.
    pub fn insert_local(&self, item: T) -> bool {
        {
            let mut state = self.lock();
            let id = item.id();
            if state.disposed || state.contains(id) {
                return false;
            }
            state.tombstones.remove(&id);
            state.items.insert(0, item);
        }
        self.bump();
        true
    }

    /// Appends a locally created item, for lists shown oldest first.
    pub fn append_local(&self, item: T) -> bool {
        {
            let mut state = self.lock();
            let id = item.id();
            if state.disposed || state.contains(id) {
                return false;
            }
            state.tombstones.remove(&id);
            state.items.push(item);
        }
        self.bump();
        true
    }

    /// Removes an item and returns where it was.
    pub fn remove_local(&self, id: Uuid) -> Option<Removed<T>> {
        let removed = {
            let mut state = self.lock();
            let index = state.position(id)?;
            let prev = index.checked_sub(1).map(|i| state.items[i].id());
            let next = state.items.get(index + 1).map(|i| i.id());
            let item = state.items.remove(index);
            state.tombstones.insert(id);
            Removed {
                index,
                prev,
                next,
                item,
            }
        };
        self.bump();
        Some(removed)
    }

    /// Swaps an item in place and returns the previous value.
    ///
    /// Refuses a replacement whose id already belongs to another item.
    pub fn replace_local(&self, id: Uuid, updated: T) -> Option<T> {
        let previous = {
            let mut state = self.lock();
            let index = state.position(id)?;
            let new_id = updated.id();
            if new_id != id && state.contains(new_id) {
                return None;
            }
            std::mem::replace(&mut state.items[index], updated)
        };
        self.bump();
        Some(previous)
    }

    /// Puts a removed item back next to the neighbour it was removed from.
    /// Used for rollback.
    pub fn restore(&self, removed: Removed<T>) -> bool {
        {
            let mut state = self.lock();
            let id = removed.item.id();
            if state.disposed || state.contains(id) {
                return false;
            }
            state.tombstones.remove(&id);
            let index = state.restore_index(&removed);
            state.items.insert(index, removed.item);
        }
        self.bump();
        true
    }

    /// Puts an item back at `index` (clamped to the current length).
    pub fn restore_at(&self, index: usize, item: T) -> bool {
        {
            let mut state = self.lock();
            let id = item.id();
            if state.disposed || state.contains(id) {
                return false;
            }
            state.tombstones.remove(&id);
            let index = index.min(state.items.len());
            state.items.insert(index, item);
        }
        self.bump();
        true
    }

    /// Marks the list as destroyed with its view. Pages still in flight are
    /// dropped on arrival, later fetches are skipped and [`closed`] resolves.
    ///
    /// [`closed`]: ListReconciler::closed
    pub fn dispose(&self) {
        {
            let mut state = self.lock();
            state.disposed = true;
            state.loading = false;
        }
        self.closed.send_replace(true);
    }
}

/// A list that can be re-fetched after a change made elsewhere.
#[async_trait]
pub trait Refresh: Send + Sync {
    async fn refresh(&self) -> FetchOutcome;
}

#[async_trait]
impl<T: ListItem> Refresh for ListReconciler<T> {
    async fn refresh(&self) -> FetchOutcome {
        self.reload().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::GatewayError;
    use crate::gateway::Page;
    use async_trait::async_trait;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: Uuid,
        label: &'static str,
    }

    impl ListItem for Row {
        fn id(&self) -> Uuid {
            self.id
        }
    }

    fn row(label: &'static str) -> Row {
        Row {
            id: Uuid::new_v4(),
            label,
        }
    }

    /// Serves a fixed page for every request.
    struct FixedSource(Mutex<Result<Page<Row>, String>>);

    #[async_trait]
    impl PageSource<Row> for FixedSource {
        async fn fetch_page(&self, _page: u32, _limit: u32) -> Result<Page<Row>, GatewayError> {
            match &*self.0.lock().unwrap() {
                Ok(page) => Ok(page.clone()),
                Err(msg) => Err(GatewayError::Application {
                    status: 500,
                    message: msg.clone(),
                }),
            }
        }
    }

    fn list_with(page: Result<Page<Row>, String>) -> ListReconciler<Row> {
        ListReconciler::new(Arc::new(FixedSource(Mutex::new(page))), 20)
    }

    fn labels(list: &ListReconciler<Row>) -> Vec<&'static str> {
        list.items().iter().map(|r| r.label).collect()
    }

    #[test]
    fn test_initialize_dedups_first_wins() {
        let list = list_with(Ok(Page::last(vec![])));
        let a = row("a");
        let dup = Row {
            id: a.id,
            label: "a-dup",
        };
        list.initialize(vec![a, row("b"), dup], true);
        assert_eq!(labels(&list), vec!["a", "b"]);
        assert_eq!(list.page(), 1);
        assert!(list.has_more());
    }

    #[test]
    fn test_insert_local_prepends_and_rejects_duplicates() {
        let list = list_with(Ok(Page::last(vec![])));
        let a = row("a");
        list.initialize(vec![a.clone()], false);
        let x = row("x");
        assert!(list.insert_local(x.clone()));
        assert!(!list.insert_local(x));
        assert!(!list.insert_local(a));
        assert_eq!(labels(&list), vec!["x", "a"]);
    }

    #[test]
    fn test_append_local_goes_to_tail() {
        let list = list_with(Ok(Page::last(vec![])));
        list.initialize(vec![row("a")], false);
        assert!(list.append_local(row("z")));
        assert_eq!(labels(&list), vec!["a", "z"]);
    }

    #[test]
    fn test_remove_then_restore_at_same_index() {
        let list = list_with(Ok(Page::last(vec![])));
        let b = row("b");
        list.initialize(vec![row("a"), b.clone(), row("c")], false);
        let removed = list.remove_local(b.id).unwrap();
        assert_eq!(removed.index, 1);
        assert_eq!(labels(&list), vec!["a", "c"]);
        assert!(list.restore_at(removed.index, removed.item));
        assert_eq!(labels(&list), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_remove_missing_is_none() {
        let list = list_with(Ok(Page::last(vec![])));
        assert!(list.remove_local(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_restore_clamps_index() {
        let list = list_with(Ok(Page::last(vec![])));
        list.initialize(vec![row("a")], false);
        assert!(list.restore_at(10, row("z")));
        assert_eq!(labels(&list), vec!["a", "z"]);
    }

    #[test]
    fn test_replace_local_keeps_position() {
        let list = list_with(Ok(Page::last(vec![])));
        let b = row("b");
        list.initialize(vec![row("a"), b.clone(), row("c")], false);
        let prev = list
            .replace_local(b.id, Row { id: b.id, label: "B" })
            .unwrap();
        assert_eq!(prev.label, "b");
        assert_eq!(labels(&list), vec!["a", "B", "c"]);
    }

    #[test]
    fn test_replace_local_refuses_id_collision() {
        let list = list_with(Ok(Page::last(vec![])));
        let a = row("a");
        let b = row("b");
        list.initialize(vec![a.clone(), b.clone()], false);
        assert!(list.replace_local(b.id, a.clone()).is_none());
        assert_eq!(labels(&list), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_fetch_more_appends_and_advances() {
        let list = list_with(Ok(Page {
            items: vec![row("d"), row("e")],
            has_more: false,
        }));
        list.initialize(vec![row("a")], true);
        assert_eq!(list.fetch_more().await, FetchOutcome::Appended(2));
        assert_eq!(labels(&list), vec!["a", "d", "e"]);
        assert_eq!(list.page(), 2);
        assert!(!list.has_more());
        assert_eq!(list.fetch_more().await, FetchOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_state_unchanged() {
        let list = list_with(Err("boom".into()));
        list.initialize(vec![row("a")], true);
        assert_eq!(
            list.fetch_more().await,
            FetchOutcome::Failed("boom".to_string())
        );
        assert_eq!(labels(&list), vec!["a"]);
        assert_eq!(list.page(), 1);
        assert!(list.has_more());
        assert!(!list.is_loading());
    }

    #[tokio::test]
    async fn test_fetch_skips_items_already_held() {
        let x = row("x");
        let list = list_with(Ok(Page::last(vec![x.clone(), row("d")])));
        list.initialize(vec![row("a")], true);
        list.insert_local(x);
        assert_eq!(list.fetch_more().await, FetchOutcome::Appended(1));
        assert_eq!(labels(&list), vec!["x", "a", "d"]);
    }

    #[tokio::test]
    async fn test_reload_reinitializes() {
        let list = list_with(Ok(Page {
            items: vec![row("fresh")],
            has_more: true,
        }));
        list.initialize(vec![row("stale")], false);
        assert_eq!(list.reload().await, FetchOutcome::Appended(1));
        assert_eq!(labels(&list), vec!["fresh"]);
        assert!(list.has_more());
    }

    #[tokio::test]
    async fn test_reload_keeps_removed_item_out() {
        let a = row("a");
        let list = list_with(Ok(Page::last(vec![a.clone(), row("b")])));
        list.initialize(vec![a.clone(), row("b")], false);
        list.remove_local(a.id).unwrap();
        assert_eq!(list.reload().await, FetchOutcome::Appended(1));
        assert_eq!(labels(&list), vec!["b"]);
    }

    #[test]
    fn test_restore_after_reinitialize_clears_removal() {
        let list = list_with(Ok(Page::last(vec![])));
        let a = row("a");
        let b = row("b");
        list.initialize(vec![a.clone(), b.clone()], false);
        let removed = list.remove_local(a.id).unwrap();
        list.initialize(vec![a.clone(), b.clone()], false);
        assert_eq!(labels(&list), vec!["b"]);
        assert!(list.restore(removed));
        assert_eq!(labels(&list), vec!["a", "b"]);
        list.initialize(vec![a, b], false);
        assert_eq!(labels(&list), vec!["a", "b"]);
    }

    #[test]
    fn test_restore_out_of_order_keeps_sequence() {
        for first_back in ["a", "b"] {
            let list = list_with(Ok(Page::last(vec![])));
            let (a, b, c) = (row("a"), row("b"), row("c"));
            list.initialize(vec![a.clone(), b.clone(), c], false);
            let ra = list.remove_local(a.id).unwrap();
            let rb = list.remove_local(b.id).unwrap();
            if first_back == "a" {
                list.restore(ra);
                list.restore(rb);
            } else {
                list.restore(rb);
                list.restore(ra);
            }
            assert_eq!(labels(&list), vec!["a", "b", "c"], "{first_back} restored first");
        }
    }

    #[test]
    fn test_restore_adjacent_tail_items_out_of_order() {
        let list = list_with(Ok(Page::last(vec![])));
        let (b, c) = (row("b"), row("c"));
        list.initialize(vec![row("a"), b.clone(), c.clone()], false);
        let rc = list.remove_local(c.id).unwrap();
        let rb = list.remove_local(b.id).unwrap();
        list.restore(rc);
        list.restore(rb);
        assert_eq!(labels(&list), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_restore_when_neighbours_gone_uses_index() {
        let list = list_with(Ok(Page::last(vec![])));
        let (a, b, c) = (row("a"), row("b"), row("c"));
        list.initialize(vec![a.clone(), b.clone(), c.clone(), row("d")], false);
        let rb = list.remove_local(b.id).unwrap();
        list.remove_local(a.id).unwrap();
        list.remove_local(c.id).unwrap();
        assert!(list.restore(rb));
        assert_eq!(labels(&list), vec!["d", "b"]);
    }

    #[tokio::test]
    async fn test_closed_resolves_on_dispose() {
        let list = list_with(Ok(Page::last(vec![])));
        let waiter = {
            let list = list.clone();
            tokio::spawn(async move { list.closed().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());
        list.dispose();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("closed resolves")
            .unwrap();
        // Already disposed: resolves immediately.
        list.closed().await;
    }

    #[tokio::test]
    async fn test_disposed_list_skips_fetch() {
        let list = list_with(Ok(Page::last(vec![row("d")])));
        list.initialize(vec![row("a")], true);
        list.dispose();
        assert_eq!(list.fetch_more().await, FetchOutcome::Skipped);
        assert!(!list.insert_local(row("x")));
    }

    #[test]
    fn test_subscribe_ticks_on_change() {
        let list = list_with(Ok(Page::last(vec![])));
        let mut rx = list.subscribe();
        assert!(!rx.has_changed().unwrap());
        list.initialize(vec![row("a")], false);
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();
        list.remove_local(Uuid::new_v4());
        assert!(!rx.has_changed().unwrap());
    }
}
