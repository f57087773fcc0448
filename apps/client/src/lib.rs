//! Client-side list state for Refracty: the backend gateway, reconciled
//! paginated lists, insight grouping, scroll-driven paging and optimistic
//! mutations with rollback.

pub mod config;
pub mod coordinator;
pub mod display;
pub mod errors;
pub mod events;
pub mod gateway;
pub mod grouping;
pub mod models;
pub mod reconciler;
pub mod scroll;

pub use config::ClientConfig;
pub use coordinator::{CreateOutcome, MutationCoordinator, MutationOutcome};
pub use errors::{GatewayError, ValidationError};
pub use events::{AppEvent, EventBus};
pub use gateway::{Gateway, HttpGateway, MockGateway, Page, PageSource};
pub use grouping::{group_by_category, CategoryView};
pub use reconciler::{FetchOutcome, ListReconciler, Refresh};
pub use scroll::{InfiniteScrollDriver, Intersection, ScrollState};
