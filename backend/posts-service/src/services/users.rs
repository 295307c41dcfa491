//! User directory: signup, login and profile updates.

use crate::db::{Store, StoreError};
use crate::error::{AppError, Result};
use crate::models::{User, UserView};
use crate::services::storage::{release_best_effort, FileStorage};
use crypto_core::{hash_password, verify_password, JwtKeys};
use std::sync::Arc;
use uuid::Uuid;

/// A user together with a freshly issued session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn Store>,
    keys: Arc<JwtKeys>,
    files: Arc<dyn FileStorage>,
}

/// Hashing is CPU bound; keep it off the async workers.
async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing task failed");
            AppError::operation_failed("Could not create new user, please try again later.")
        })?
        .map_err(AppError::from)
}

async fn verify_blocking(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password verification task failed");
            AppError::operation_failed("Logging in failed, please try again later.")
        })?
        .map_err(AppError::from)
}

impl UserDirectory {
    pub fn new(store: Arc<dyn Store>, keys: Arc<JwtKeys>, files: Arc<dyn FileStorage>) -> Self {
        Self { store, keys, files }
    }

    pub async fn list_users(&self) -> Result<Vec<UserView>> {
        let users = self.store.list_users().await?;
        Ok(users.iter().map(User::view).collect())
    }

    /// Register a new account. `email` must already be normalized.
    pub async fn signup(
        &self,
        name: String,
        email: String,
        password: String,
        image: Option<String>,
    ) -> Result<Session> {
        let result = self.try_signup(name, email, password, image.clone()).await;
        if result.is_err() {
            release_best_effort(self.files.as_ref(), image.as_deref()).await;
        }
        result
    }

    async fn try_signup(
        &self,
        name: String,
        email: String,
        password: String,
        image: Option<String>,
    ) -> Result<Session> {
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(
                "User with this email already exists.".into(),
            ));
        }

        let password_hash = hash_blocking(password).await?;
        let user = User::new(name, email, password_hash, image);

        self.store.insert_user(&user).await.map_err(|e| match e {
            StoreError::Duplicate(_) => {
                AppError::Conflict("User with this email already exists.".into())
            }
            other => other.into(),
        })?;

        let token = self.keys.issue_token(user.id, &user.email)?;
        tracing::info!(user_id = %user.id, "user signed up");

        Ok(Session { user, token })
    }

    pub async fn login(&self, email: &str, password: String) -> Result<Session> {
        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound("User cannot be found.".into()))?;

        if !verify_blocking(password, user.password_hash.clone()).await? {
            tracing::warn!(user_id = %user.id, "login with wrong password");
            return Err(AppError::Forbidden("Invalid password.".into()));
        }

        let token = self.keys.issue_token(user.id, &user.email)?;
        Ok(Session { user, token })
    }

    /// Overwrite name and email of the requester's own record.
    pub async fn update_user_info(
        &self,
        requester: Uuid,
        target: Uuid,
        name: &str,
        email: &str,
    ) -> Result<User> {
        if requester != target {
            return Err(AppError::Forbidden(
                "You cannot edit this information.".into(),
            ));
        }

        if self.store.find_user(target).await?.is_none() {
            return Err(AppError::NotFound("User cannot be found.".into()));
        }

        if let Some(existing) = self.store.find_user_by_email(email).await? {
            if existing.id != target {
                return Err(AppError::Conflict(
                    "User with this email already exists.".into(),
                ));
            }
        }

        self.store
            .update_user_profile(target, name, email)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate(_) => {
                    AppError::Conflict("User with this email already exists.".into())
                }
                StoreError::NotFound { .. } => AppError::NotFound("User cannot be found.".into()),
                other => other.into(),
            })
    }
}
