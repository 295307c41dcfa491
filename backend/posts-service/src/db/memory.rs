//! In-memory store for development and tests.
//!
//! Transactions stage their writes locally and apply them at commit under a
//! single write lock. Post-set changes are replayed against the committed
//! user record, so two transactions attaching posts to the same owner both
//! land. Failures can be injected at each transactional step.

use super::{Store, StoreError, StoreResult, StoreTransaction};
use crate::models::{Post, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Step at which an injected failure fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    InsertPost,
    AttachPost,
    RemovePost,
    DetachPost,
    Commit,
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    posts: HashMap<Uuid, Post>,
    faults: HashSet<FailPoint>,
}

impl State {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }

    /// Consume a one-shot fault if armed.
    fn trip(&mut self, point: FailPoint) -> StoreResult<()> {
        if self.faults.remove(&point) {
            return Err(StoreError::Backend(format!(
                "injected failure at {:?}",
                point
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot failure for the next transaction reaching `point`.
    pub async fn inject_failure(&self, point: FailPoint) {
        self.state.write().await.faults.insert(point);
    }

    pub async fn post_count(&self) -> usize {
        self.state.read().await.posts.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.email_taken(&user.email, None) {
            return Err(StoreError::Duplicate("email"));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn update_user_profile(&self, id: Uuid, name: &str, email: &str) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.email_taken(email, Some(id)) {
            return Err(StoreError::Duplicate("email"));
        }

        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::user_not_found(id))?;
        user.name = name.to_string();
        user.email = email.to_string();
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn find_post(&self, id: Uuid) -> StoreResult<Option<Post>> {
        Ok(self.state.read().await.posts.get(&id).cloned())
    }

    async fn find_posts_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Post>> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| p.owner_id == owner_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn update_post(&self, post: &Post) -> StoreResult<Post> {
        let mut state = self.state.write().await;
        let stored = state
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| StoreError::post_not_found(post.id))?;

        stored.title = post.title.clone();
        stored.description = post.description.clone();
        stored.address = post.address.clone();
        stored.location = post.location;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
        }))
    }
}

#[derive(Debug)]
enum Staged {
    InsertPost(Post),
    AttachPost { owner_id: Uuid, post_id: Uuid },
    RemovePost(Uuid),
    DetachPost { owner_id: Uuid, post_id: Uuid },
}

pub struct MemoryTransaction {
    state: Arc<RwLock<State>>,
    staged: Vec<Staged>,
}

impl MemoryTransaction {
    fn staged_insert(&self, post_id: Uuid) -> bool {
        self.staged
            .iter()
            .any(|op| matches!(op, Staged::InsertPost(p) if p.id == post_id))
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn insert_post(&mut self, post: &Post) -> StoreResult<()> {
        {
            let mut state = self.state.write().await;
            state.trip(FailPoint::InsertPost)?;
            if state.posts.contains_key(&post.id) {
                return Err(StoreError::Duplicate("post id"));
            }
        }
        self.staged.push(Staged::InsertPost(post.clone()));
        Ok(())
    }

    async fn attach_post(&mut self, owner_id: Uuid, post_id: Uuid) -> StoreResult<()> {
        {
            let mut state = self.state.write().await;
            state.trip(FailPoint::AttachPost)?;
            if !state.users.contains_key(&owner_id) {
                return Err(StoreError::user_not_found(owner_id));
            }
        }
        self.staged.push(Staged::AttachPost { owner_id, post_id });
        Ok(())
    }

    async fn remove_post(&mut self, post_id: Uuid) -> StoreResult<()> {
        {
            let mut state = self.state.write().await;
            state.trip(FailPoint::RemovePost)?;
            if !state.posts.contains_key(&post_id) && !self.staged_insert(post_id) {
                return Err(StoreError::post_not_found(post_id));
            }
        }
        self.staged.push(Staged::RemovePost(post_id));
        Ok(())
    }

    async fn detach_post(&mut self, owner_id: Uuid, post_id: Uuid) -> StoreResult<()> {
        {
            let mut state = self.state.write().await;
            state.trip(FailPoint::DetachPost)?;
            if !state.users.contains_key(&owner_id) {
                return Err(StoreError::user_not_found(owner_id));
            }
        }
        self.staged.push(Staged::DetachPost { owner_id, post_id });
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state.trip(FailPoint::Commit)?;

        // Replay onto copies of the touched records; the committed state is
        // only written once every staged op has been applied successfully.
        let mut users: HashMap<Uuid, User> = HashMap::new();
        let mut posts: HashMap<Uuid, Option<Post>> = HashMap::new();
        let now = Utc::now();

        for op in &self.staged {
            match op {
                Staged::InsertPost(post) => {
                    let exists = match posts.get(&post.id) {
                        Some(slot) => slot.is_some(),
                        None => state.posts.contains_key(&post.id),
                    };
                    if exists {
                        return Err(StoreError::Duplicate("post id"));
                    }
                    posts.insert(post.id, Some(post.clone()));
                }
                Staged::RemovePost(post_id) => {
                    let exists = match posts.get(post_id) {
                        Some(slot) => slot.is_some(),
                        None => state.posts.contains_key(post_id),
                    };
                    if !exists {
                        return Err(StoreError::post_not_found(*post_id));
                    }
                    posts.insert(*post_id, None);
                }
                Staged::AttachPost { owner_id, post_id } => {
                    let user = touched_user(&mut users, &state, *owner_id)?;
                    if !user.post_ids.contains(post_id) {
                        user.post_ids.push(*post_id);
                    }
                    user.updated_at = now;
                }
                Staged::DetachPost { owner_id, post_id } => {
                    let user = touched_user(&mut users, &state, *owner_id)?;
                    user.post_ids.retain(|id| id != post_id);
                    user.updated_at = now;
                }
            }
        }

        for (id, user) in users {
            state.users.insert(id, user);
        }
        for (id, slot) in posts {
            match slot {
                Some(post) => {
                    state.posts.insert(id, post);
                }
                None => {
                    state.posts.remove(&id);
                }
            }
        }

        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        tracing::debug!(staged = self.staged.len(), "discarding staged writes");
        Ok(())
    }
}

fn touched_user<'a>(
    users: &'a mut HashMap<Uuid, User>,
    state: &State,
    owner_id: Uuid,
) -> StoreResult<&'a mut User> {
    if !users.contains_key(&owner_id) {
        let current = state
            .users
            .get(&owner_id)
            .cloned()
            .ok_or_else(|| StoreError::user_not_found(owner_id))?;
        users.insert(owner_id, current);
    }
    users
        .get_mut(&owner_id)
        .ok_or_else(|| StoreError::user_not_found(owner_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewPost;

    async fn store_with_user() -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let user = User::new("Ann".into(), "ann@x.com".into(), "hash".into(), None);
        store.insert_user(&user).await.unwrap();
        (store, user)
    }

    fn post_for(owner: &User) -> Post {
        Post::new(
            owner.id,
            NewPost {
                title: "Tower".into(),
                description: "Tall".into(),
                ..Default::default()
            },
            None,
        )
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (store, _) = store_with_user().await;
        let other = User::new("Bob".into(), "ann@x.com".into(), "hash".into(), None);

        let err = store.insert_user(&other).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("email")));
    }

    #[tokio::test]
    async fn test_staged_writes_invisible_until_commit() {
        let (store, user) = store_with_user().await;
        let post = post_for(&user);

        let mut tx = store.begin().await.unwrap();
        tx.insert_post(&post).await.unwrap();
        tx.attach_post(user.id, post.id).await.unwrap();

        assert!(store.find_post(post.id).await.unwrap().is_none());
        assert!(store.find_user(user.id).await.unwrap().unwrap().post_ids.is_empty());

        tx.commit().await.unwrap();

        assert!(store.find_post(post.id).await.unwrap().is_some());
        assert_eq!(
            store.find_user(user.id).await.unwrap().unwrap().post_ids,
            vec![post.id]
        );
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let (store, user) = store_with_user().await;
        let post = post_for(&user);

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_post(&post).await.unwrap();
        }

        assert_eq!(store.post_count().await, 0);
    }

    #[tokio::test]
    async fn test_interleaved_attaches_both_survive() {
        let (store, user) = store_with_user().await;
        let first = post_for(&user);
        let second = post_for(&user);

        let mut tx_a = store.begin().await.unwrap();
        let mut tx_b = store.begin().await.unwrap();
        tx_a.insert_post(&first).await.unwrap();
        tx_a.attach_post(user.id, first.id).await.unwrap();
        tx_b.insert_post(&second).await.unwrap();
        tx_b.attach_post(user.id, second.id).await.unwrap();
        tx_b.commit().await.unwrap();
        tx_a.commit().await.unwrap();

        let owner = store.find_user(user.id).await.unwrap().unwrap();
        assert!(owner.owns(first.id));
        assert!(owner.owns(second.id));
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let (store, user) = store_with_user().await;
        store.inject_failure(FailPoint::AttachPost).await;

        let mut tx = store.begin().await.unwrap();
        assert!(tx.attach_post(user.id, Uuid::new_v4()).await.is_err());
        assert!(tx.attach_post(user.id, Uuid::new_v4()).await.is_ok());
    }

    #[tokio::test]
    async fn test_commit_fails_when_post_removed_concurrently() {
        let (store, user) = store_with_user().await;
        let post = post_for(&user);
        let mut tx = store.begin().await.unwrap();
        tx.insert_post(&post).await.unwrap();
        tx.attach_post(user.id, post.id).await.unwrap();
        tx.commit().await.unwrap();

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.remove_post(post.id).await.unwrap();
        first.detach_post(user.id, post.id).await.unwrap();
        second.remove_post(post.id).await.unwrap();
        second.detach_post(user.id, post.id).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.find_user(user.id).await.unwrap().unwrap().post_ids.is_empty());
    }
}
