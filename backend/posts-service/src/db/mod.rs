//! Storage layer
//!
//! [`Store`] covers single-record reads and writes. The paired User/Post
//! mutations go through a [`StoreTransaction`] obtained from [`Store::begin`]:
//! every write staged on it becomes visible together at `commit`, and
//! `rollback` (or dropping the transaction) discards all of them.

pub mod memory;
pub mod pg;

pub use memory::{FailPoint, MemoryStore};
pub use pg::PgStore;

use crate::config::DatabaseConfig;
use crate::models::{Post, User};
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("duplicate value for {0}")]
    Duplicate(&'static str),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn user_not_found(id: Uuid) -> Self {
        StoreError::NotFound { entity: "user", id }
    }

    pub fn post_not_found(id: Uuid) -> Self {
        StoreError::NotFound { entity: "post", id }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Record storage shared by all request handlers.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness probe used by the health endpoint.
    async fn health_check(&self) -> StoreResult<()>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Lookup by the stored (already normalized) email.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Fails with [`StoreError::Duplicate`] when the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    /// Overwrite name and email of an existing user.
    async fn update_user_profile(&self, id: Uuid, name: &str, email: &str) -> StoreResult<User>;

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>>;

    async fn find_posts_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Post>>;

    /// Persist the mutable fields of an existing post. Ownership never changes.
    async fn update_post(&self, post: &Post) -> StoreResult<Post>;

    /// Open a multi-record transaction.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}

/// Writes that must persist together or not at all.
#[async_trait]
pub trait StoreTransaction: Send {
    async fn insert_post(&mut self, post: &Post) -> StoreResult<()>;

    /// Add `post_id` to the owner's post set. Adding an id already present is a no-op.
    async fn attach_post(&mut self, owner_id: Uuid, post_id: Uuid) -> StoreResult<()>;

    async fn remove_post(&mut self, post_id: Uuid) -> StoreResult<()>;

    /// Remove `post_id` from the owner's post set.
    async fn detach_post(&mut self, owner_id: Uuid, post_id: Uuid) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}

/// Build the PostgreSQL pool and verify connectivity.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    tracing::debug!(
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout_secs,
        "Creating database pool"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    tracing::info!("Database pool created and verified");

    Ok(pool)
}
