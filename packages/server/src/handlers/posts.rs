//! Post handlers, including likes and the comment list of a post.
//!
//! Posts are listed newest first. Pagination is keyset on the UUIDv7 id:
//! pass the last post's id as `before` to continue.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use hearth::{types::now_rfc3339, validate_comment, validate_post, Comment, Post};
use hearth_api::{CommentRequest, CreatePostRequest, Envelope, PostQuery, UpdatePostRequest};
use serde_json::Value;

use crate::{error::AppError, middleware::auth::RequireAuth, storage::PostFilter};

use super::{missing, non_empty, AppState};

/// `GET /posts?author=&before=&limit=`
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<PostQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<Post>>>, AppError> {
    let Query(q) = query?;
    let filter = PostFilter {
        authors: q.author.into_iter().collect(),
        before: q.before,
        limit: state.config.page_limit(q.limit),
    };
    let posts = state.storage.list_posts(&filter).await?;
    Ok(Json(Envelope::list(posts)))
}

/// `GET /posts/feed`: posts by the caller and the caller's friends.
pub async fn feed(
    State(state): State<AppState>,
    auth: RequireAuth,
    query: Result<Query<PostQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<Post>>>, AppError> {
    let Query(q) = query?;
    let mut authors = state.storage.list_friends(&auth.user_id).await?;
    authors.push(auth.user_id);
    let filter = PostFilter {
        authors,
        before: q.before,
        limit: state.config.page_limit(q.limit),
    };
    let posts = state.storage.list_posts(&filter).await?;
    Ok(Json(Envelope::list(posts)))
}

/// `POST /posts`: returns 201 with the stored post.
pub async fn create(
    State(state): State<AppState>,
    auth: RequireAuth,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Post>>), AppError> {
    let Json(req) = payload?;
    let post = Post::new(auth.user_id, req.text, req.image.and_then(non_empty));
    validate_post(&post)?;
    state.storage.put_post(&post).await?;
    tracing::info!(post = %post.id, author = %post.author, "created post");
    Ok((StatusCode::CREATED, Json(Envelope::ok(post))))
}

/// `GET /posts/{id}`
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Post>>, AppError> {
    Ok(Json(Envelope::ok(load(&state, &id).await?)))
}

/// `PUT /posts/{id}`: author only.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: RequireAuth,
    payload: Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<Json<Envelope<Post>>, AppError> {
    let Json(patch) = payload?;
    let mut post = load_owned(&state, &id, &auth.user_id).await?;
    if let Some(text) = patch.text {
        post.text = text;
    }
    if let Some(image) = patch.image {
        post.image = non_empty(image);
    }
    post.updated_at = Some(now_rfc3339());
    validate_post(&post)?;

    state
        .storage
        .update_post(&post)
        .await
        .map_err(missing("Post"))?;
    Ok(Json(Envelope::ok(post)))
}

/// `DELETE /posts/{id}`: author only. Comments and likes go with it.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: RequireAuth,
) -> Result<Json<Envelope<Value>>, AppError> {
    load_owned(&state, &id, &auth.user_id).await?;
    state
        .storage
        .delete_post(&id)
        .await
        .map_err(missing("Post"))?;
    tracing::info!(post = %id, "deleted post");
    Ok(Json(Envelope::empty()))
}

/// `PUT /posts/{id}/like`
pub async fn like(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: RequireAuth,
) -> Result<Json<Envelope<Post>>, AppError> {
    set_like(&state, &id, &auth.user_id, true).await
}

/// `DELETE /posts/{id}/like`
pub async fn unlike(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: RequireAuth,
) -> Result<Json<Envelope<Post>>, AppError> {
    set_like(&state, &id, &auth.user_id, false).await
}

/// `GET /posts/{id}/comments`: oldest first.
pub async fn comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<Vec<Comment>>>, AppError> {
    load(&state, &id).await?;
    let comments = state.storage.list_comments(&id).await?;
    Ok(Json(Envelope::list(comments)))
}

/// `POST /posts/{id}/comments`
pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: RequireAuth,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<Comment>>), AppError> {
    let Json(req) = payload?;
    let comment = Comment::new(id, auth.user_id, req.text);
    validate_comment(&comment)?;
    state
        .storage
        .put_comment(&comment)
        .await
        .map_err(missing("Post"))?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(comment))))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load(state: &AppState, id: &str) -> Result<Post, AppError> {
    state
        .storage
        .get_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".into()))
}

async fn load_owned(state: &AppState, id: &str, caller: &str) -> Result<Post, AppError> {
    let post = load(state, id).await?;
    if post.author != caller {
        return Err(AppError::Unauthorized(
            "You can only modify your own posts".into(),
        ));
    }
    Ok(post)
}

async fn set_like(
    state: &AppState,
    id: &str,
    user: &str,
    liked: bool,
) -> Result<Json<Envelope<Post>>, AppError> {
    let post = state
        .storage
        .set_post_like(id, user, liked)
        .await
        .map_err(missing("Post"))?;
    Ok(Json(Envelope::ok(post)))
}
