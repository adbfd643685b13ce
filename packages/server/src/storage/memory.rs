//! In-memory storage implementation.
//!
//! All data is held in RAM behind a single [`RwLock`] and is lost when the
//! process exits. Use this for tests, the conformance suite, and ephemeral
//! servers.
//!
//! Posts and comments live in [`BTreeMap`]s keyed by UUIDv7 id, so newest-first
//! keyset pagination is a reverse range query. The friendship graph is a
//! [`SocialGraph`]; every transition takes the write lock, snapshots the pair,
//! plans, and applies before releasing it.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use hearth::types::sort_profiles;
use hearth::{plan, Comment, GraphAction, GraphOp, PairState, Post, ProfileView, SocialGraph, User};

use super::{PostFilter, Storage, StorageError};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Inner {
    /// Users as registered; graph fields are always empty here.
    users: HashMap<String, User>,
    /// Lowercased email → user id.
    emails: HashMap<String, String>,
    graph: SocialGraph,
    posts: BTreeMap<String, Post>,
    comments: BTreeMap<String, Comment>,
}

impl Inner {
    fn with_graph(&self, user: &User) -> User {
        let mut user = user.clone();
        user.friends = self.graph.friends_of(&user.id);
        user.friend_requests = self.graph.requests_for(&user.id);
        user
    }
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Storage`].
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still holds consistent data: every write completes
    // before any code that could panic.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for MemoryStorage {
    // --- Users ---------------------------------------------------------------

    async fn put_user(&self, user: &User) -> Result<(), StorageError> {
        let mut inner = self.write();
        let email = user.email.to_lowercase();
        if inner.users.contains_key(&user.id) || inner.emails.contains_key(&email) {
            return Err(StorageError::Conflict("user already exists".into()));
        }
        let mut stored = user.clone();
        stored.friends.clear();
        stored.friend_requests.clear();
        inner.emails.insert(email, user.id.clone());
        inner.users.insert(user.id.clone(), stored);
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        let inner = self.read();
        Ok(inner.users.get(id).map(|u| inner.with_graph(u)))
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let mut inner = self.write();
        let stored = inner.users.get_mut(&user.id).ok_or(StorageError::NotFound)?;
        stored.name = user.name.clone();
        stored.bio = user.bio.clone();
        stored.location = user.location.clone();
        stored.profile_picture = user.profile_picture.clone();
        stored.cover_picture = user.cover_picture.clone();
        Ok(())
    }

    async fn search_users(
        &self,
        query: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ProfileView>, StorageError> {
        let inner = self.read();
        let needle = query.map(str::to_lowercase);
        let mut views: Vec<ProfileView> = inner
            .users
            .values()
            .filter(|u| match &needle {
                Some(n) => u.name.to_lowercase().contains(n) || u.email.to_lowercase().contains(n),
                None => true,
            })
            .map(User::profile_view)
            .collect();
        sort_profiles(&mut views);
        views.truncate(limit as usize);
        Ok(views)
    }

    async fn profile_views(&self, ids: &[String]) -> Result<Vec<ProfileView>, StorageError> {
        let inner = self.read();
        let mut views: Vec<ProfileView> = ids
            .iter()
            .filter_map(|id| inner.users.get(id))
            .map(User::profile_view)
            .collect();
        sort_profiles(&mut views);
        Ok(views)
    }

    // --- Social graph --------------------------------------------------------

    async fn pair_state(&self, actor: &str, other: &str) -> Result<PairState, StorageError> {
        let inner = self.read();
        let exists = inner.users.contains_key(other);
        Ok(inner.graph.pair_state(actor, other, exists))
    }

    async fn graph_transition(
        &self,
        action: GraphAction,
        actor: &str,
        other: &str,
    ) -> Result<Vec<GraphOp>, StorageError> {
        let mut inner = self.write();
        let exists = inner.users.contains_key(other);
        let state = inner.graph.pair_state(actor, other, exists);
        let ops = plan(action, actor, other, &state)?;
        inner.graph.apply(&ops);
        Ok(ops)
    }

    async fn list_friends(&self, id: &str) -> Result<Vec<String>, StorageError> {
        Ok(self.read().graph.friends_of(id).into_iter().collect())
    }

    async fn list_requests(&self, id: &str) -> Result<Vec<String>, StorageError> {
        Ok(self.read().graph.requests_for(id).into_iter().collect())
    }

    // --- Posts ---------------------------------------------------------------

    async fn put_post(&self, post: &Post) -> Result<(), StorageError> {
        let mut inner = self.write();
        if inner.posts.contains_key(&post.id) {
            return Err(StorageError::Conflict(format!("post {} already exists", post.id)));
        }
        inner.posts.insert(post.id.clone(), post.clone());
        Ok(())
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StorageError> {
        Ok(self.read().posts.get(id).cloned())
    }

    async fn update_post(&self, post: &Post) -> Result<(), StorageError> {
        let mut inner = self.write();
        let stored = inner.posts.get_mut(&post.id).ok_or(StorageError::NotFound)?;
        stored.text = post.text.clone();
        stored.image = post.image.clone();
        stored.updated_at = post.updated_at.clone();
        Ok(())
    }

    async fn delete_post(&self, id: &str) -> Result<(), StorageError> {
        let mut inner = self.write();
        if inner.posts.remove(id).is_none() {
            return Err(StorageError::NotFound);
        }
        inner.comments.retain(|_, c| c.post != id);
        Ok(())
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, StorageError> {
        let inner = self.read();
        let upper = match &filter.before {
            Some(before) => Bound::Excluded(before.clone()),
            None => Bound::Unbounded,
        };
        let posts = inner
            .posts
            .range((Bound::Unbounded, upper))
            .rev()
            .map(|(_, p)| p)
            .filter(|p| filter.authors.is_empty() || filter.authors.contains(&p.author))
            .take(filter.limit as usize)
            .cloned()
            .collect();
        Ok(posts)
    }

    async fn set_post_like(
        &self,
        post_id: &str,
        user: &str,
        liked: bool,
    ) -> Result<Post, StorageError> {
        let mut inner = self.write();
        let post = inner.posts.get_mut(post_id).ok_or(StorageError::NotFound)?;
        if liked {
            post.likes.insert(user.to_string());
        } else {
            post.likes.remove(user);
        }
        Ok(post.clone())
    }

    // --- Comments ------------------------------------------------------------

    async fn put_comment(&self, comment: &Comment) -> Result<(), StorageError> {
        let mut inner = self.write();
        if !inner.posts.contains_key(&comment.post) {
            return Err(StorageError::NotFound);
        }
        if inner.comments.contains_key(&comment.id) {
            return Err(StorageError::Conflict(format!(
                "comment {} already exists",
                comment.id
            )));
        }
        inner.comments.insert(comment.id.clone(), comment.clone());
        Ok(())
    }

    async fn get_comment(&self, id: &str) -> Result<Option<Comment>, StorageError> {
        Ok(self.read().comments.get(id).cloned())
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), StorageError> {
        let mut inner = self.write();
        let stored = inner
            .comments
            .get_mut(&comment.id)
            .ok_or(StorageError::NotFound)?;
        stored.text = comment.text.clone();
        stored.updated_at = comment.updated_at.clone();
        Ok(())
    }

    async fn delete_comment(&self, id: &str) -> Result<(), StorageError> {
        self.write()
            .comments
            .remove(id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }

    async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>, StorageError> {
        Ok(self
            .read()
            .comments
            .values()
            .filter(|c| c.post == post_id)
            .cloned()
            .collect())
    }

    async fn set_comment_like(
        &self,
        comment_id: &str,
        user: &str,
        liked: bool,
    ) -> Result<Comment, StorageError> {
        let mut inner = self.write();
        let comment = inner
            .comments
            .get_mut(comment_id)
            .ok_or(StorageError::NotFound)?;
        if liked {
            comment.likes.insert(user.to_string());
        } else {
            comment.likes.remove(user);
        }
        Ok(comment.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
