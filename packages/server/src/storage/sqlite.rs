//! SQLite-backed storage implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in an `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! # Schema
//!
//! - `users`: profile columns plus a unique lowercased email.
//! - `friendships`: one row per friendship, `(a, b)` with `a < b`.
//! - `friend_requests`: pending `(sender, recipient)` pairs.
//! - `posts`, `post_likes`: posts and their like sets.
//! - `comments`, `comment_likes`: comments and their like sets.
//!
//! Graph and like tables use composite primary keys, so the set semantics
//! hold even if two writers race past the planner's membership checks.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hearth::types::sort_profiles;
use hearth::{
    plan, Comment, FriendRequest, FriendshipEdge, GraphAction, GraphOp, PairState, Post,
    ProfileView, User,
};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::{PostFilter, Storage, StorageError};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id              TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    name_lower      TEXT NOT NULL,
    email           TEXT NOT NULL,
    email_lower     TEXT NOT NULL UNIQUE,
    bio             TEXT,
    location        TEXT,
    profile_picture TEXT,
    cover_picture   TEXT,
    public_key      TEXT NOT NULL,
    created_at      TEXT NOT NULL
);

-- One row per friendship; endpoints in canonical order.
CREATE TABLE IF NOT EXISTS friendships (
    a TEXT NOT NULL,
    b TEXT NOT NULL,
    PRIMARY KEY (a, b),
    CHECK (a < b)
);
CREATE INDEX IF NOT EXISTS idx_friendships_b ON friendships(b);

CREATE TABLE IF NOT EXISTS friend_requests (
    sender    TEXT NOT NULL,
    recipient TEXT NOT NULL,
    PRIMARY KEY (sender, recipient),
    CHECK (sender <> recipient)
);
CREATE INDEX IF NOT EXISTS idx_friend_requests_recipient ON friend_requests(recipient);

CREATE TABLE IF NOT EXISTS posts (
    id         TEXT PRIMARY KEY,
    author     TEXT NOT NULL,
    text       TEXT NOT NULL,
    image      TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_posts_author ON posts(author);

CREATE TABLE IF NOT EXISTS post_likes (
    post_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    PRIMARY KEY (post_id, user_id)
);

CREATE TABLE IF NOT EXISTS comments (
    id         TEXT PRIMARY KEY,
    post_id    TEXT NOT NULL,
    author     TEXT NOT NULL,
    text       TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id);

CREATE TABLE IF NOT EXISTS comment_likes (
    comment_id TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    PRIMARY KEY (comment_id, user_id)
);
";

const USER_COLUMNS: &str =
    "id, name, email, bio, location, profile_picture, cover_picture, public_key, created_at";
const POST_COLUMNS: &str = "id, author, text, image, created_at, updated_at";
const COMMENT_COLUMNS: &str = "id, post_id, author, text, created_at, updated_at";

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`Storage`].
///
/// Holds a single database connection protected by a `Mutex`. All operations
/// run inside `spawn_blocking` to avoid blocking the async runtime.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    pub fn open(path: &str) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking thread-pool.
    async fn run<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| StorageError::Internal("connection mutex poisoned".into()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StorageError::Internal(format!("task join error: {e}")))?
    }
}

// ---------------------------------------------------------------------------
// Error conversions
// ---------------------------------------------------------------------------

fn map_err(e: rusqlite::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// Like [`map_err`], but a unique-key violation becomes `Conflict(what)`.
fn map_insert_err(e: rusqlite::Error, what: &str) -> StorageError {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::Conflict(what.to_string())
        }
        e => map_err(e),
    }
}

// ---------------------------------------------------------------------------
// Dynamic query parameter helper
// ---------------------------------------------------------------------------

/// Typed SQL parameter for building dynamic WHERE clauses.
enum SqlParam {
    Text(String),
    Integer(i64),
}

impl rusqlite::ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, ValueRef};
        match self {
            SqlParam::Text(s) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))),
            SqlParam::Integer(i) => Ok(ToSqlOutput::Borrowed(ValueRef::Integer(*i))),
        }
    }
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        bio: row.get(3)?,
        location: row.get(4)?,
        profile_picture: row.get(5)?,
        cover_picture: row.get(6)?,
        public_key: row.get(7)?,
        created_at: row.get(8)?,
        friends: Default::default(),
        friend_requests: Default::default(),
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author: row.get(1)?,
        text: row.get(2)?,
        image: row.get(3)?,
        likes: Default::default(),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post: row.get(1)?,
        author: row.get(2)?,
        text: row.get(3)?,
        likes: Default::default(),
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

/// Collect the single text column of every row `sql` returns.
fn query_ids(conn: &Connection, sql: &str, id: &str) -> Result<Vec<String>, StorageError> {
    let mut stmt = conn.prepare(sql).map_err(map_err)?;
    let ids = stmt
        .query_map(params![id], |row| row.get::<_, String>(0))
        .map_err(map_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_err)?;
    Ok(ids)
}

fn friends_of(conn: &Connection, id: &str) -> Result<Vec<String>, StorageError> {
    query_ids(
        conn,
        "SELECT b FROM friendships WHERE a = ?1
         UNION
         SELECT a FROM friendships WHERE b = ?1
         ORDER BY 1",
        id,
    )
}

fn requests_for(conn: &Connection, id: &str) -> Result<Vec<String>, StorageError> {
    query_ids(
        conn,
        "SELECT sender FROM friend_requests WHERE recipient = ?1 ORDER BY sender",
        id,
    )
}

fn load_user(conn: &Connection, id: &str) -> Result<Option<User>, StorageError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            user_from_row,
        )
        .optional()
        .map_err(map_err)?;
    let Some(mut user) = user else {
        return Ok(None);
    };
    user.friends = friends_of(conn, id)?.into_iter().collect();
    user.friend_requests = requests_for(conn, id)?.into_iter().collect();
    Ok(Some(user))
}

fn load_post(conn: &Connection, id: &str) -> Result<Option<Post>, StorageError> {
    let post = conn
        .query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
            params![id],
            post_from_row,
        )
        .optional()
        .map_err(map_err)?;
    let Some(mut post) = post else {
        return Ok(None);
    };
    post.likes = query_ids(conn, "SELECT user_id FROM post_likes WHERE post_id = ?1", id)?
        .into_iter()
        .collect();
    Ok(Some(post))
}

fn load_comment(conn: &Connection, id: &str) -> Result<Option<Comment>, StorageError> {
    let comment = conn
        .query_row(
            &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
            params![id],
            comment_from_row,
        )
        .optional()
        .map_err(map_err)?;
    let Some(mut comment) = comment else {
        return Ok(None);
    };
    comment.likes = query_ids(
        conn,
        "SELECT user_id FROM comment_likes WHERE comment_id = ?1",
        id,
    )?
    .into_iter()
    .collect();
    Ok(Some(comment))
}

fn exists(conn: &Connection, sql: &str, args: impl rusqlite::Params) -> Result<bool, StorageError> {
    conn.query_row(sql, args, |row| row.get::<_, bool>(0))
        .map_err(map_err)
}

fn read_pair_state(conn: &Connection, actor: &str, other: &str) -> Result<PairState, StorageError> {
    let edge = FriendshipEdge::new(actor, other);
    Ok(PairState {
        other_exists: exists(
            conn,
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![other],
        )?,
        friends: exists(
            conn,
            "SELECT EXISTS(SELECT 1 FROM friendships WHERE a = ?1 AND b = ?2)",
            params![edge.a, edge.b],
        )?,
        request_sent: has_request(conn, actor, other)?,
        request_received: has_request(conn, other, actor)?,
    })
}

fn has_request(conn: &Connection, sender: &str, recipient: &str) -> Result<bool, StorageError> {
    exists(
        conn,
        "SELECT EXISTS(SELECT 1 FROM friend_requests WHERE sender = ?1 AND recipient = ?2)",
        params![sender, recipient],
    )
}

fn apply_op(conn: &Connection, op: &GraphOp) -> Result<(), StorageError> {
    match op {
        GraphOp::InsertRequest(FriendRequest { sender, recipient }) => conn
            .execute(
                "INSERT INTO friend_requests (sender, recipient) VALUES (?1, ?2)",
                params![sender, recipient],
            )
            .map_err(|e| map_insert_err(e, "Friend request already sent"))?,
        GraphOp::DeleteRequest(FriendRequest { sender, recipient }) => conn
            .execute(
                "DELETE FROM friend_requests WHERE sender = ?1 AND recipient = ?2",
                params![sender, recipient],
            )
            .map_err(map_err)?,
        GraphOp::InsertFriendship(FriendshipEdge { a, b }) => conn
            .execute(
                "INSERT INTO friendships (a, b) VALUES (?1, ?2)",
                params![a, b],
            )
            .map_err(|e| map_insert_err(e, "You are already friends with this user"))?,
        GraphOp::DeleteFriendship(FriendshipEdge { a, b }) => conn
            .execute(
                "DELETE FROM friendships WHERE a = ?1 AND b = ?2",
                params![a, b],
            )
            .map_err(map_err)?,
    };
    Ok(())
}

fn set_like(
    conn: &Connection,
    table: &str,
    key_column: &str,
    key: &str,
    user: &str,
    liked: bool,
) -> Result<(), StorageError> {
    let sql = if liked {
        format!("INSERT OR IGNORE INTO {table} ({key_column}, user_id) VALUES (?1, ?2)")
    } else {
        format!("DELETE FROM {table} WHERE {key_column} = ?1 AND user_id = ?2")
    };
    conn.execute(&sql, params![key, user]).map_err(map_err)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for SqliteStorage {
    // --- Users ---------------------------------------------------------------

    async fn put_user(&self, user: &User) -> Result<(), StorageError> {
        let user = user.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO users (id, name, name_lower, email, email_lower, bio, location,
                                    profile_picture, cover_picture, public_key, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    user.id,
                    user.name,
                    user.name.to_lowercase(),
                    user.email,
                    user.email.to_lowercase(),
                    user.bio,
                    user.location,
                    user.profile_picture,
                    user.cover_picture,
                    user.public_key,
                    user.created_at,
                ],
            )
            .map_err(|e| map_insert_err(e, "user already exists"))?;
            Ok(())
        })
        .await
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| load_user(conn, &id)).await
    }

    async fn update_user(&self, user: &User) -> Result<(), StorageError> {
        let user = user.clone();
        self.run(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE users
                     SET name = ?2, name_lower = ?3, bio = ?4, location = ?5,
                         profile_picture = ?6, cover_picture = ?7
                     WHERE id = ?1",
                    params![
                        user.id,
                        user.name,
                        user.name.to_lowercase(),
                        user.bio,
                        user.location,
                        user.profile_picture,
                        user.cover_picture,
                    ],
                )
                .map_err(map_err)?;
            if changed == 0 {
                return Err(StorageError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn search_users(
        &self,
        query: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ProfileView>, StorageError> {
        let query = query.map(str::to_lowercase);
        self.run(move |conn| {
            let mut sql = format!("SELECT {USER_COLUMNS} FROM users");
            let mut params_vec: Vec<SqlParam> = Vec::new();
            if let Some(q) = query {
                sql.push_str(" WHERE instr(name_lower, ?) > 0 OR instr(email_lower, ?) > 0");
                params_vec.push(SqlParam::Text(q.clone()));
                params_vec.push(SqlParam::Text(q));
            }
            sql.push_str(" ORDER BY name, id LIMIT ?");
            params_vec.push(SqlParam::Integer(i64::from(limit)));

            let mut stmt = conn.prepare(&sql).map_err(map_err)?;
            let views = stmt
                .query_map(rusqlite::params_from_iter(params_vec.iter()), user_from_row)
                .map_err(map_err)?
                .map(|r| r.map(|u| u.profile_view()))
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_err)?;
            Ok(views)
        })
        .await
    }

    async fn profile_views(&self, ids: &[String]) -> Result<Vec<ProfileView>, StorageError> {
        let ids = ids.to_vec();
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
                .map_err(map_err)?;
            let mut views = Vec::with_capacity(ids.len());
            for id in &ids {
                if let Some(user) = stmt
                    .query_row(params![id], user_from_row)
                    .optional()
                    .map_err(map_err)?
                {
                    views.push(user.profile_view());
                }
            }
            sort_profiles(&mut views);
            Ok(views)
        })
        .await
    }

    // --- Social graph --------------------------------------------------------

    async fn pair_state(&self, actor: &str, other: &str) -> Result<PairState, StorageError> {
        let (actor, other) = (actor.to_string(), other.to_string());
        self.run(move |conn| read_pair_state(conn, &actor, &other))
            .await
    }

    async fn graph_transition(
        &self,
        action: GraphAction,
        actor: &str,
        other: &str,
    ) -> Result<Vec<GraphOp>, StorageError> {
        let (actor, other) = (actor.to_string(), other.to_string());
        self.run(move |conn| {
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_err)?;
            let state = read_pair_state(&tx, &actor, &other)?;
            // Dropping `tx` on an early return rolls back.
            let ops = plan(action, &actor, &other, &state)?;
            for op in &ops {
                apply_op(&tx, op)?;
            }
            tx.commit().map_err(map_err)?;
            Ok(ops)
        })
        .await
    }

    async fn list_friends(&self, id: &str) -> Result<Vec<String>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| friends_of(conn, &id)).await
    }

    async fn list_requests(&self, id: &str) -> Result<Vec<String>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| requests_for(conn, &id)).await
    }

    // --- Posts ---------------------------------------------------------------

    async fn put_post(&self, post: &Post) -> Result<(), StorageError> {
        let post = post.clone();
        self.run(move |conn| {
            conn.execute(
                &format!("INSERT INTO posts ({POST_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    post.id,
                    post.author,
                    post.text,
                    post.image,
                    post.created_at,
                    post.updated_at,
                ],
            )
            .map_err(|e| map_insert_err(e, &format!("post {} already exists", post.id)))?;
            Ok(())
        })
        .await
    }

    async fn get_post(&self, id: &str) -> Result<Option<Post>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| load_post(conn, &id)).await
    }

    async fn update_post(&self, post: &Post) -> Result<(), StorageError> {
        let post = post.clone();
        self.run(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE posts SET text = ?2, image = ?3, updated_at = ?4 WHERE id = ?1",
                    params![post.id, post.text, post.image, post.updated_at],
                )
                .map_err(map_err)?;
            if changed == 0 {
                return Err(StorageError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn delete_post(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            let deleted = tx
                .execute("DELETE FROM posts WHERE id = ?1", params![id])
                .map_err(map_err)?;
            if deleted == 0 {
                return Err(StorageError::NotFound);
            }
            tx.execute("DELETE FROM post_likes WHERE post_id = ?1", params![id])
                .map_err(map_err)?;
            tx.execute(
                "DELETE FROM comment_likes
                 WHERE comment_id IN (SELECT id FROM comments WHERE post_id = ?1)",
                params![id],
            )
            .map_err(map_err)?;
            tx.execute("DELETE FROM comments WHERE post_id = ?1", params![id])
                .map_err(map_err)?;
            tx.commit().map_err(map_err)?;
            Ok(())
        })
        .await
    }

    async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, StorageError> {
        let filter = filter.clone();
        self.run(move |conn| {
            let mut sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE 1=1");
            let mut params_vec: Vec<SqlParam> = Vec::new();

            if !filter.authors.is_empty() {
                let placeholders: Vec<&str> = filter.authors.iter().map(|_| "?").collect();
                sql.push_str(&format!(" AND author IN ({})", placeholders.join(",")));
                for a in &filter.authors {
                    params_vec.push(SqlParam::Text(a.clone()));
                }
            }
            if let Some(before) = &filter.before {
                sql.push_str(" AND id < ?");
                params_vec.push(SqlParam::Text(before.clone()));
            }
            sql.push_str(" ORDER BY id DESC LIMIT ?");
            params_vec.push(SqlParam::Integer(i64::from(filter.limit)));

            let mut stmt = conn.prepare(&sql).map_err(map_err)?;
            let mut posts = stmt
                .query_map(rusqlite::params_from_iter(params_vec.iter()), post_from_row)
                .map_err(map_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_err)?;
            for post in &mut posts {
                post.likes = query_ids(
                    conn,
                    "SELECT user_id FROM post_likes WHERE post_id = ?1",
                    &post.id,
                )?
                .into_iter()
                .collect();
            }
            Ok(posts)
        })
        .await
    }

    async fn set_post_like(
        &self,
        post_id: &str,
        user: &str,
        liked: bool,
    ) -> Result<Post, StorageError> {
        let (post_id, user) = (post_id.to_string(), user.to_string());
        self.run(move |conn| {
            if !exists(
                conn,
                "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
                params![post_id],
            )? {
                return Err(StorageError::NotFound);
            }
            set_like(conn, "post_likes", "post_id", &post_id, &user, liked)?;
            load_post(conn, &post_id)?.ok_or(StorageError::NotFound)
        })
        .await
    }

    // --- Comments ------------------------------------------------------------

    async fn put_comment(&self, comment: &Comment) -> Result<(), StorageError> {
        let comment = comment.clone();
        self.run(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            if !exists(
                &tx,
                "SELECT EXISTS(SELECT 1 FROM posts WHERE id = ?1)",
                params![comment.post],
            )? {
                return Err(StorageError::NotFound);
            }
            tx.execute(
                &format!(
                    "INSERT INTO comments ({COMMENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                ),
                params![
                    comment.id,
                    comment.post,
                    comment.author,
                    comment.text,
                    comment.created_at,
                    comment.updated_at,
                ],
            )
            .map_err(|e| map_insert_err(e, &format!("comment {} already exists", comment.id)))?;
            tx.commit().map_err(map_err)?;
            Ok(())
        })
        .await
    }

    async fn get_comment(&self, id: &str) -> Result<Option<Comment>, StorageError> {
        let id = id.to_string();
        self.run(move |conn| load_comment(conn, &id)).await
    }

    async fn update_comment(&self, comment: &Comment) -> Result<(), StorageError> {
        let comment = comment.clone();
        self.run(move |conn| {
            let changed = conn
                .execute(
                    "UPDATE comments SET text = ?2, updated_at = ?3 WHERE id = ?1",
                    params![comment.id, comment.text, comment.updated_at],
                )
                .map_err(map_err)?;
            if changed == 0 {
                return Err(StorageError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn delete_comment(&self, id: &str) -> Result<(), StorageError> {
        let id = id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction().map_err(map_err)?;
            let deleted = tx
                .execute("DELETE FROM comments WHERE id = ?1", params![id])
                .map_err(map_err)?;
            if deleted == 0 {
                return Err(StorageError::NotFound);
            }
            tx.execute("DELETE FROM comment_likes WHERE comment_id = ?1", params![id])
                .map_err(map_err)?;
            tx.commit().map_err(map_err)?;
            Ok(())
        })
        .await
    }

    async fn list_comments(&self, post_id: &str) -> Result<Vec<Comment>, StorageError> {
        let post_id = post_id.to_string();
        self.run(move |conn| {
            let ids = query_ids(
                conn,
                "SELECT id FROM comments WHERE post_id = ?1 ORDER BY id",
                &post_id,
            )?;
            let mut comments = Vec::with_capacity(ids.len());
            for id in &ids {
                if let Some(c) = load_comment(conn, id)? {
                    comments.push(c);
                }
            }
            Ok(comments)
        })
        .await
    }

    async fn set_comment_like(
        &self,
        comment_id: &str,
        user: &str,
        liked: bool,
    ) -> Result<Comment, StorageError> {
        let (comment_id, user) = (comment_id.to_string(), user.to_string());
        self.run(move |conn| {
            if !exists(
                conn,
                "SELECT EXISTS(SELECT 1 FROM comments WHERE id = ?1)",
                params![comment_id],
            )? {
                return Err(StorageError::NotFound);
            }
            set_like(conn, "comment_likes", "comment_id", &comment_id, &user, liked)?;
            load_comment(conn, &comment_id)?.ok_or(StorageError::NotFound)
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use hearth::GraphError;

    async fn with_users(names: &[&str]) -> (SqliteStorage, Vec<String>) {
        let s = SqliteStorage::open_in_memory().unwrap();
        let mut ids = Vec::new();
        for name in names {
            let u = User::new(*name, format!("{name}@example.com"), "z6MkKey");
            s.put_user(&u).await.unwrap();
            ids.push(u.id);
        }
        (s, ids)
    }

    #[tokio::test]
    async fn put_and_get_user() {
        let (s, ids) = with_users(&["ada"]).await;
        let got = s.get_user(&ids[0]).await.unwrap().unwrap();
        assert_eq!(got.name, "ada");
        assert!(got.friends.is_empty());
        assert!(s.get_user("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let (s, _) = with_users(&["ada"]).await;
        let dup = User::new("Imposter", "Ada@Example.com", "z6MkKey");
        let err = s.put_user(&dup).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn friendship_lifecycle() {
        let (s, ids) = with_users(&["a", "b"]).await;
        let (a, b) = (&ids[0], &ids[1]);

        s.graph_transition(GraphAction::SendRequest, a, b).await.unwrap();
        assert_eq!(s.list_requests(b).await.unwrap(), vec![a.clone()]);

        let err = s
            .graph_transition(GraphAction::SendRequest, a, b)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Rejected(GraphError::Conflict(_))));

        s.graph_transition(GraphAction::AcceptRequest, b, a).await.unwrap();
        assert_eq!(s.list_friends(a).await.unwrap(), vec![b.clone()]);
        assert_eq!(s.list_friends(b).await.unwrap(), vec![a.clone()]);
        assert!(s.list_requests(b).await.unwrap().is_empty());

        s.graph_transition(GraphAction::RemoveFriend, a, b).await.unwrap();
        assert!(s.list_friends(a).await.unwrap().is_empty());
        assert!(s.list_friends(b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn accept_clears_crossing_requests() {
        let (s, ids) = with_users(&["a", "b"]).await;
        let (a, b) = (&ids[0], &ids[1]);
        s.graph_transition(GraphAction::SendRequest, a, b).await.unwrap();
        s.graph_transition(GraphAction::SendRequest, b, a).await.unwrap();

        s.graph_transition(GraphAction::AcceptRequest, a, b).await.unwrap();
        assert!(s.list_requests(a).await.unwrap().is_empty());
        assert!(s.list_requests(b).await.unwrap().is_empty());
        let state = s.pair_state(a, b).await.unwrap();
        assert!(state.friends && !state.request_sent && !state.request_received);
    }

    #[tokio::test]
    async fn rejected_transition_writes_nothing() {
        let (s, ids) = with_users(&["a", "b"]).await;
        let err = s
            .graph_transition(GraphAction::RemoveFriend, &ids[0], &ids[1])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Rejected(GraphError::InvalidOperation(_))
        ));
        assert!(!s.pair_state(&ids[0], &ids[1]).await.unwrap().friends);
    }

    #[tokio::test]
    async fn search_matches_name_or_email() {
        let (s, _) = with_users(&["alice", "bob", "malice"]).await;
        let hits = s.search_users(Some("ALI"), 10).await.unwrap();
        let names: Vec<_> = hits.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["alice", "malice"]);

        let capped = s.search_users(None, 2).await.unwrap();
        assert_eq!(capped.len(), 2);
    }

    #[tokio::test]
    async fn search_folds_non_ascii_names() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let mut u = User::new("Émile Zola", "ezola@example.com", "z6MkKey");
        s.put_user(&u).await.unwrap();

        let hits = s.search_users(Some("émile"), 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, u.id);

        u.name = "Ørjan Émile".into();
        s.update_user(&u).await.unwrap();
        assert_eq!(s.search_users(Some("ØRJAN"), 10).await.unwrap().len(), 1);
        assert!(s.search_users(Some("zola"), 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_posts_filters_authors_and_pages() {
        let s = SqliteStorage::open_in_memory().unwrap();
        for i in 1u8..=6 {
            let author = if i % 2 == 0 { "even" } else { "odd" };
            let mut p = Post::new(author, format!("post {i}"), None);
            p.id = format!("019526b2-f68a-7c3e-a0b4-0000000000{i:02x}");
            s.put_post(&p).await.unwrap();
        }
        let filter = PostFilter {
            authors: vec!["even".into()],
            limit: 2,
            ..Default::default()
        };
        let page = s.list_posts(&filter).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].text, "post 6");
        assert_eq!(page[1].text, "post 4");

        let next = s
            .list_posts(&PostFilter {
                before: Some(page[1].id.clone()),
                ..filter
            })
            .await
            .unwrap();
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].text, "post 2");
    }

    #[tokio::test]
    async fn delete_post_cascades() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let p = Post::new("author", "hello", None);
        s.put_post(&p).await.unwrap();
        s.set_post_like(&p.id, "fan", true).await.unwrap();
        let c = Comment::new(&p.id, "fan", "first");
        s.put_comment(&c).await.unwrap();
        s.set_comment_like(&c.id, "author", true).await.unwrap();

        s.delete_post(&p.id).await.unwrap();
        assert!(s.get_post(&p.id).await.unwrap().is_none());
        assert!(s.get_comment(&c.id).await.unwrap().is_none());
        assert!(matches!(
            s.delete_post(&p.id).await.unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[tokio::test]
    async fn comment_on_missing_post_is_not_found() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let c = Comment::new("no-such-post", "someone", "hi");
        assert!(matches!(
            s.put_comment(&c).await.unwrap_err(),
            StorageError::NotFound
        ));
    }

    #[tokio::test]
    async fn comment_likes_are_sets() {
        let s = SqliteStorage::open_in_memory().unwrap();
        let p = Post::new("author", "hello", None);
        s.put_post(&p).await.unwrap();
        let c = Comment::new(&p.id, "fan", "first");
        s.put_comment(&c).await.unwrap();

        s.set_comment_like(&c.id, "x", true).await.unwrap();
        let liked = s.set_comment_like(&c.id, "x", true).await.unwrap();
        assert_eq!(liked.likes.len(), 1);
        let comments = s.list_comments(&p.id).await.unwrap();
        assert_eq!(comments[0].likes.len(), 1);
    }
}
