use std::sync::Arc;

use sqlx::PgPool;

use crate::avatar::storage::AvatarStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Avatar object storage. S3 in production, swappable in tests.
    pub avatars: Arc<dyn AvatarStore>,
}
