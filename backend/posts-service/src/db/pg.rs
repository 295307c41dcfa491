//! PostgreSQL store. The user's post set is the `users.post_ids` array column.

use super::{Store, StoreError, StoreResult, StoreTransaction};
use crate::models::{Post, PostRow, User};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

const USER_COLUMNS: &str =
    "id, name, email, password_hash, image, post_ids, created_at, updated_at";

const POST_COLUMNS: &str = "id, title, description, address, latitude, longitude, image, \
     owner_id, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translate a unique-constraint violation into [`StoreError::Duplicate`].
fn map_unique(err: sqlx::Error, field: &'static str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Duplicate(field)
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, image, post_ids, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.image)
        .bind(&user.post_ids)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, "email"))?;

        Ok(())
    }

    async fn update_user_profile(&self, id: Uuid, name: &str, email: &str) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = $2, email = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique(e, "email"))?
        .ok_or_else(|| StoreError::user_not_found(id))
    }

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    async fn find_posts_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn update_post(&self, post: &Post) -> StoreResult<Post> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "UPDATE posts SET title = $2, description = $3, address = $4, \
             latitude = $5, longitude = $6, updated_at = NOW() \
             WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.address)
        .bind(post.location.map(|l| l.lat))
        .bind(post.location.map(|l| l.lng))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::post_not_found(post.id))?;

        Ok(row.into())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgTransaction { tx }))
    }
}

/// Wraps a live database transaction. Dropping it without commit rolls back.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn insert_post(&mut self, post: &Post) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, title, description, address, latitude, longitude, image,
                               owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.description)
        .bind(&post.address)
        .bind(post.location.map(|l| l.lat))
        .bind(post.location.map(|l| l.lng))
        .bind(&post.image)
        .bind(post.owner_id)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_unique(e, "post id"))?;

        Ok(())
    }

    async fn attach_post(&mut self, owner_id: Uuid, post_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET post_ids = CASE WHEN $2 = ANY(post_ids) THEN post_ids
                                ELSE array_append(post_ids, $2) END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(owner_id)
        .bind(post_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::user_not_found(owner_id));
        }
        Ok(())
    }

    async fn remove_post(&mut self, post_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(post_id)
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::post_not_found(post_id));
        }
        Ok(())
    }

    async fn detach_post(&mut self, owner_id: Uuid, post_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE users SET post_ids = array_remove(post_ids, $2), updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(owner_id)
        .bind(post_id)
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::user_not_found(owner_id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
