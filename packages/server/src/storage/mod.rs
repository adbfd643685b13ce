//! Storage abstraction layer for the Hearth server.
//!
//! The [`Storage`] trait defines the contract between the HTTP handler layer
//! and persistence. Ownership checks live in the handlers; the one piece of
//! domain logic storage owns is the friendship transition, because it must be
//! applied atomically with the snapshot it was planned against.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStorage`] | Tests, conformance suite, ephemeral servers |
//! | [`SqliteStorage`] | Production; durable single-file database |
//!
//! [`MemoryStorage`]: memory::MemoryStorage
//! [`SqliteStorage`]: sqlite::SqliteStorage

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use hearth::{Comment, GraphAction, GraphError, GraphOp, PairState, Post, ProfileView, User};

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that storage operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested item does not exist.
    #[error("not found")]
    NotFound,

    /// An item with the same unique key already exists (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The friendship state machine refused the transition. Nothing was
    /// written.
    #[error(transparent)]
    Rejected(#[from] GraphError),

    /// An unexpected error in the underlying storage backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// PostFilter
// ---------------------------------------------------------------------------

/// Query parameters for [`Storage::list_posts`].
///
/// Posts come back newest first. `authors` restricts the result to posts by
/// any of the listed users; an empty list means every author.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    pub authors: Vec<String>,

    /// Keyset cursor: only posts whose `id < before`. UUIDv7 ids sort in
    /// creation order, so this walks backwards in time.
    pub before: Option<String>,

    pub limit: u32,
}

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// The persistence contract for a Hearth server.
///
/// All methods are `async` and return `Result<_, StorageError>`. Implementations
/// must be `Send + Sync + 'static` so they can be held in an `Arc<dyn Storage>`.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    // --- Users ---------------------------------------------------------------

    /// Register a user. Returns [`StorageError::Conflict`] if the id or the
    /// email (case-insensitive) is already taken. `friends` and
    /// `friend_requests` on the argument are ignored.
    async fn put_user(&self, user: &User) -> Result<(), StorageError>;

    /// Retrieve a user with `friends` and `friend_requests` filled in from
    /// the graph. Returns `None` if not registered.
    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError>;

    /// Overwrite the profile fields of an existing user. Email, key, and
    /// graph fields are not touched. Returns [`StorageError::NotFound`] if
    /// the user does not exist.
    async fn update_user(&self, user: &User) -> Result<(), StorageError>;

    /// Users whose name or email contains `query` (case-insensitive), as
    /// profile views ordered by name then id. `None` matches everyone.
    async fn search_users(
        &self,
        query: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ProfileView>, StorageError>;

    /// Resolve ids to profile views, ordered by name then id. Unknown ids are
    /// skipped.
    async fn profile_views(&self, ids: &[String]) -> Result<Vec<ProfileView>, StorageError>;

    // --- Social graph --------------------------------------------------------

    /// Snapshot the relationship between `actor` and `other`.
    async fn pair_state(&self, actor: &str, other: &str) -> Result<PairState, StorageError>;

    /// Plan and apply a friendship transition as one atomic step.
    ///
    /// Returns the ops that were applied, or [`StorageError::Rejected`] with
    /// the domain error if [`hearth::plan`] refused the action.
    async fn graph_transition(
        &self,
        action: GraphAction,
        actor: &str,
        other: &str,
    ) -> Result<Vec<GraphOp>, StorageError>;

    /// Ids of `id`'s friends, ascending.
    async fn list_friends(&self, id: &str) -> Result<Vec<String>, StorageError>;

    /// Ids of users with a pending request addressed to `id`, ascending.
    async fn list_requests(&self, id: &str) -> Result<Vec<String>, StorageError>;

    // --- Posts ---------------------------------------------------------------

    /// Persist a new post. Returns [`StorageError::Conflict`] on duplicate id.
    async fn put_post(&self, post: &Post) -> Result<(), StorageError>;

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StorageError>;

    /// Overwrite `text`, `image`, and `updated_at` of an existing post.
    async fn update_post(&self, post: &Post) -> Result<(), StorageError>;

    /// Delete a post together with its comments and all their likes.
    async fn delete_post(&self, id: &str) -> Result<(), StorageError>;

    /// Return a page of posts matching `filter`, newest first.
    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, StorageError>;

    /// Add (`liked = true`) or remove `user` from a post's like set and return
    /// the updated post. Idempotent in both directions.
    async fn set_post_like(
        &self,
        post_id: &str,
        user: &str,
        liked: bool,
    ) -> Result<Post, StorageError>;

    // --- Comments ------------------------------------------------------------

    /// Persist a new comment. Returns [`StorageError::NotFound`] if the post
    /// it belongs to does not exist.
    async fn put_comment(&self, comment: &Comment) -> Result<(), StorageError>;

    async fn get_comment(&self, id: &str) -> Result<Option<Comment>, StorageError>;

    async fn update_comment(&self, comment: &Comment) -> Result<(), StorageError>;

    async fn delete_comment(&self, id: &str) -> Result<(), StorageError>;

    /// Comments on `post_id`, oldest first.
    async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>, StorageError>;

    async fn set_comment_like(
        &self,
        comment_id: &str,
        user: &str,
        liked: bool,
    ) -> Result<Comment, StorageError>;
}
