//! Comment handlers. Comments are created under their post
//! (`POST /posts/{id}/comments`); these act on a comment by its own id.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use hearth::{types::now_rfc3339, validate_comment, Comment};
use hearth_api::{CommentRequest, Envelope};
use serde_json::Value;

use crate::{error::AppError, middleware::auth::RequireAuth};

use super::{missing, AppState};

/// `PUT /comments/{id}`: author only.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: RequireAuth,
    payload: Result<Json<CommentRequest>, JsonRejection>,
) -> Result<Json<Envelope<Comment>>, AppError> {
    let Json(req) = payload?;
    let mut comment = load_owned(&state, &id, &auth.user_id).await?;
    comment.text = req.text;
    comment.updated_at = Some(now_rfc3339());
    validate_comment(&comment)?;
    state
        .storage
        .update_comment(&comment)
        .await
        .map_err(missing("Comment"))?;
    Ok(Json(Envelope::ok(comment)))
}

/// `DELETE /comments/{id}`: author only.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: RequireAuth,
) -> Result<Json<Envelope<Value>>, AppError> {
    load_owned(&state, &id, &auth.user_id).await?;
    state
        .storage
        .delete_comment(&id)
        .await
        .map_err(missing("Comment"))?;
    Ok(Json(Envelope::empty()))
}

/// `PUT /comments/{id}/like`
pub async fn like(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: RequireAuth,
) -> Result<Json<Envelope<Comment>>, AppError> {
    let comment = state
        .storage
        .set_comment_like(&id, &auth.user_id, true)
        .await
        .map_err(missing("Comment"))?;
    Ok(Json(Envelope::ok(comment)))
}

/// `DELETE /comments/{id}/like`
pub async fn unlike(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: RequireAuth,
) -> Result<Json<Envelope<Comment>>, AppError> {
    let comment = state
        .storage
        .set_comment_like(&id, &auth.user_id, false)
        .await
        .map_err(missing("Comment"))?;
    Ok(Json(Envelope::ok(comment)))
}

async fn load_owned(state: &AppState, id: &str, caller: &str) -> Result<Comment, AppError> {
    let comment = state
        .storage
        .get_comment(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".into()))?;
    if comment.author != caller {
        return Err(AppError::Unauthorized(
            "You can only modify your own comments".into(),
        ));
    }
    Ok(comment)
}
