//! Post operations that keep the owner's post set and the post table in step.
//!
//! Create and delete touch two records. Both writes go through one
//! [`StoreTransaction`]; the first failing write triggers an explicit rollback
//! and the caller sees `OperationFailed`. Nothing is retried.
//!
//! The timeout bounds opening the transaction and staging its writes; a
//! transaction still staging at the deadline is dropped, which rolls it back.
//! Commit runs outside the deadline so the reported outcome always matches
//! what the store holds.

use crate::db::{Store, StoreError, StoreResult, StoreTransaction};
use crate::error::{AppError, Result};
use crate::metrics::{POST_TRANSACTIONS_TOTAL, POST_TRANSACTION_DURATION_SECONDS};
use crate::models::{NewPost, Post, PostUpdate};
use crate::services::geocoding::{resolve_recorded, Geocoder};
use crate::services::storage::{release_best_effort, FileStorage};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Clone)]
pub struct PostCoordinator {
    store: Arc<dyn Store>,
    geocoder: Arc<dyn Geocoder>,
    files: Arc<dyn FileStorage>,
    tx_timeout: Duration,
}

/// Treat blank addresses as absent.
fn non_empty(address: Option<String>) -> Option<String> {
    address
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
}

async fn abort(tx: Box<dyn StoreTransaction>, err: StoreError) -> StoreError {
    if let Err(rollback_err) = tx.rollback().await {
        tracing::error!(error = %rollback_err, "rollback failed");
    }
    err
}

impl PostCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        geocoder: Arc<dyn Geocoder>,
        files: Arc<dyn FileStorage>,
        tx_timeout: Duration,
    ) -> Self {
        Self {
            store,
            geocoder,
            files,
            tx_timeout,
        }
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<Post> {
        self.store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post cannot be found.".into()))
    }

    pub async fn get_posts_by_user(&self, user_id: Uuid) -> Result<Vec<Post>> {
        let posts = self.store.find_posts_by_owner(user_id).await?;
        if posts.is_empty() {
            return Err(AppError::NotFound("Posts for user cannot be found.".into()));
        }
        Ok(posts)
    }

    /// Create a post for `owner_id`. A stored image referenced by `fields`
    /// is released if the post is not created.
    pub async fn create_post(&self, owner_id: Uuid, mut fields: NewPost) -> Result<Post> {
        fields.address = non_empty(fields.address);
        let image = fields.image.clone();

        let result = self.try_create(owner_id, fields).await;
        if result.is_err() {
            release_best_effort(self.files.as_ref(), image.as_deref()).await;
        }
        result
    }

    async fn try_create(&self, owner_id: Uuid, fields: NewPost) -> Result<Post> {
        if self.store.find_user(owner_id).await?.is_none() {
            return Err(AppError::NotFound(
                "Cannot find user with given user id.".into(),
            ));
        }

        let location = match fields.address.as_deref() {
            Some(address) => Some(
                resolve_recorded(self.geocoder.as_ref(), address)
                    .await
                    .map_err(|_| {
                        AppError::OperationFailed("Creating post failed, please try again.".into())
                    })?,
            ),
            None => None,
        };

        let post = Post::new(owner_id, fields, location);

        self.run_paired("create", self.stage_create(&post))
            .await
            .map_err(|e| {
                tracing::error!(post_id = %post.id, %owner_id, error = %e, "create transaction failed");
                AppError::OperationFailed("Creating post failed, please try again.".into())
            })?;

        tracing::info!(post_id = %post.id, %owner_id, "post created");
        Ok(post)
    }

    async fn stage_create(&self, post: &Post) -> StoreResult<Box<dyn StoreTransaction>> {
        let mut tx = self.store.begin().await?;

        if let Err(e) = tx.insert_post(post).await {
            return Err(abort(tx, e).await);
        }
        if let Err(e) = tx.attach_post(post.owner_id, post.id).await {
            return Err(abort(tx, e).await);
        }

        Ok(tx)
    }

    /// Overwrite title, description and address. The location follows the
    /// address; a failed lookup clears it instead of failing the update.
    pub async fn update_post(
        &self,
        post_id: Uuid,
        requester: Uuid,
        update: PostUpdate,
    ) -> Result<Post> {
        let mut post = self
            .store
            .find_post(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post cannot be found.".into()))?;

        if post.owner_id != requester {
            tracing::warn!(%post_id, %requester, "update refused for non-owner");
            return Err(AppError::Forbidden("You cannot edit this post.".into()));
        }

        let address = non_empty(update.address);
        let location = match address.as_deref() {
            Some(address) => resolve_recorded(self.geocoder.as_ref(), address).await.ok(),
            None => None,
        };

        post.title = update.title.unwrap_or_default();
        post.description = update.description.unwrap_or_default();
        post.address = address;
        post.location = location;

        self.store.update_post(&post).await.map_err(|e| match e {
            StoreError::NotFound { .. } => AppError::NotFound("Post cannot be found.".into()),
            other => other.into(),
        })
    }

    pub async fn delete_post(&self, post_id: Uuid, requester: Uuid) -> Result<()> {
        let post = self.store.find_post(post_id).await?.ok_or_else(|| {
            AppError::NotFound("Could not find post to delete with given post id.".into())
        })?;

        if post.owner_id != requester {
            tracing::warn!(%post_id, %requester, "delete refused for non-owner");
            return Err(AppError::Forbidden("You cannot delete this post.".into()));
        }

        self.run_paired("delete", self.stage_delete(&post))
            .await
            .map_err(|e| match e {
                StoreError::NotFound { .. } => AppError::NotFound(
                    "Could not find post to delete with given post id.".into(),
                ),
                other => {
                    tracing::error!(%post_id, error = %other, "delete transaction failed");
                    AppError::OperationFailed(
                        "Something went wrong with deleting this post, please try again later."
                            .into(),
                    )
                }
            })?;

        tracing::info!(%post_id, owner_id = %post.owner_id, "post deleted");
        release_best_effort(self.files.as_ref(), post.image.as_deref()).await;
        Ok(())
    }

    async fn stage_delete(&self, post: &Post) -> StoreResult<Box<dyn StoreTransaction>> {
        let mut tx = self.store.begin().await?;

        if let Err(e) = tx.remove_post(post.id).await {
            return Err(abort(tx, e).await);
        }
        if let Err(e) = tx.detach_post(post.owner_id, post.id).await {
            return Err(abort(tx, e).await);
        }

        Ok(tx)
    }

    /// Stage a paired write under the transaction timeout, commit it and
    /// record the outcome.
    async fn run_paired<F>(&self, op: &'static str, stage: F) -> StoreResult<()>
    where
        F: std::future::Future<Output = StoreResult<Box<dyn StoreTransaction>>>,
    {
        let started = Instant::now();
        let staged = match tokio::time::timeout(self.tx_timeout, stage).await {
            Ok(staged) => staged,
            Err(_) => Err(StoreError::Backend(format!(
                "transaction exceeded {} ms",
                self.tx_timeout.as_millis()
            ))),
        };
        let result = match staged {
            Ok(tx) => tx.commit().await,
            Err(e) => Err(e),
        };

        let outcome = if result.is_ok() { "committed" } else { "rolled_back" };
        POST_TRANSACTIONS_TOTAL
            .with_label_values(&[op, outcome])
            .inc();
        POST_TRANSACTION_DURATION_SECONDS
            .with_label_values(&[op])
            .observe(started.elapsed().as_secs_f64());

        result
    }
}
