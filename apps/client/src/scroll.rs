//! Turns tail-sentinel visibility into page fetches.
//!
//! Two states: `Idle` and `Triggered`. A visibility signal moves Idle to
//! Triggered only when the list has more pages and is not already loading;
//! the driver returns to Idle when that fetch settles, whatever its result.
//! At most one fetch per list is in flight.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::models::ListItem;
use crate::reconciler::{FetchOutcome, ListReconciler};

/// Default visible fraction of the sentinel that counts as intersecting.
pub const DEFAULT_THRESHOLD: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollState {
    Idle,
    Triggered,
}

/// A viewport-intersection report for the tail sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Visible fraction of the sentinel, 0.0 to 1.0.
    pub ratio: f32,
}

impl Intersection {
    pub fn visible() -> Self {
        Self { ratio: 1.0 }
    }

    pub fn hidden() -> Self {
        Self { ratio: 0.0 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScrollOutcome {
    /// The signal did not start a fetch.
    Ignored,
    /// A fetch ran; its result.
    Fetched(FetchOutcome),
}

struct DriverState {
    scroll: ScrollState,
    observing: bool,
}

/// Returns the driver to Idle when the triggered fetch settles or is dropped.
struct SettleGuard<'a> {
    state: &'a Mutex<DriverState>,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .scroll = ScrollState::Idle;
    }
}

pub struct InfiniteScrollDriver<T: ListItem> {
    list: ListReconciler<T>,
    threshold: f32,
    state: Arc<Mutex<DriverState>>,
}

impl<T: ListItem> Clone for InfiniteScrollDriver<T> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
            threshold: self.threshold,
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: ListItem> InfiniteScrollDriver<T> {
    /// Starts observing the sentinel of `list`.
    pub fn attach(list: ListReconciler<T>, threshold: f32) -> Self {
        Self {
            list,
            threshold: threshold.clamp(0.0, 1.0),
            state: Arc::new(Mutex::new(DriverState {
                scroll: ScrollState::Idle,
                observing: true,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DriverState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> ScrollState {
        self.lock().scroll
    }

    pub fn is_observing(&self) -> bool {
        self.lock().observing
    }

    pub fn list(&self) -> &ListReconciler<T> {
        &self.list
    }

    /// Handles one intersection report for the tail sentinel.
    pub async fn on_intersection(&self, signal: Intersection) -> ScrollOutcome {
        {
            let mut state = self.lock();
            if !state.observing
                || signal.ratio < self.threshold
                || state.scroll == ScrollState::Triggered
                || !self.list.has_more()
                || self.list.is_loading()
            {
                return ScrollOutcome::Ignored;
            }
            state.scroll = ScrollState::Triggered;
        }

        debug!("Tail sentinel visible, fetching next page");
        let _settle = SettleGuard { state: &self.state };
        ScrollOutcome::Fetched(self.list.fetch_more().await)
    }

    /// Stops observing (view unmounted). A fetch already in flight is left to
    /// finish, and its page is dropped because the list is disposed with the
    /// view.
    pub fn detach(&self) {
        self.lock().observing = false;
        self.list.dispose();
    }
}
