//! Friendship handlers. Every endpoint acts on behalf of the signed caller.
//!
//! - `GET    /friends`: the caller's friends.
//! - `GET    /friends/requests`: pending requests addressed to the caller.
//! - `GET    /friends/status/{userId}`: how the caller relates to `userId`.
//! - `POST   /friends/request/{userId}`: send a request.
//! - `PUT    /friends/accept/{userId}`: accept `userId`'s request.
//! - `PUT    /friends/reject/{userId}`: reject `userId`'s request.
//! - `DELETE /friends/{userId}`: end a friendship.
//!
//! State changes go through [`Storage::graph_transition`], which plans and
//! applies the change atomically; domain refusals come back as 400/404 with
//! the planner's message.
//!
//! [`Storage::graph_transition`]: crate::storage::Storage::graph_transition

use axum::{
    extract::{Path, State},
    Json,
};
use hearth::{relationship, GraphAction, ProfileView};
use hearth_api::{Envelope, RelationshipResponse};
use serde_json::Value;

use crate::{error::AppError, middleware::auth::RequireAuth};

use super::AppState;

/// `GET /friends`: ordered by name, then id.
pub async fn list(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Envelope<Vec<ProfileView>>>, AppError> {
    let ids = state.storage.list_friends(&auth.user_id).await?;
    let views = state.storage.profile_views(&ids).await?;
    Ok(Json(Envelope::list(views)))
}

/// `GET /friends/requests`: senders of pending requests, ordered by name.
pub async fn requests(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Envelope<Vec<ProfileView>>>, AppError> {
    let ids = state.storage.list_requests(&auth.user_id).await?;
    let views = state.storage.profile_views(&ids).await?;
    Ok(Json(Envelope::list(views)))
}

/// `GET /friends/status/{userId}`
pub async fn status(
    State(state): State<AppState>,
    Path(other): Path<String>,
    auth: RequireAuth,
) -> Result<Json<Envelope<RelationshipResponse>>, AppError> {
    let pair = state.storage.pair_state(&auth.user_id, &other).await?;
    if !pair.other_exists {
        return Err(AppError::NotFound("User not found".into()));
    }
    Ok(Json(Envelope::ok(RelationshipResponse {
        relationship: relationship(&auth.user_id, &other, &pair),
        user: other,
    })))
}

/// `POST /friends/request/{userId}`
pub async fn send_request(
    State(state): State<AppState>,
    Path(other): Path<String>,
    auth: RequireAuth,
) -> Result<Json<Envelope<Value>>, AppError> {
    transition(&state, GraphAction::SendRequest, &auth.user_id, &other).await
}

/// `PUT /friends/accept/{userId}`
pub async fn accept(
    State(state): State<AppState>,
    Path(other): Path<String>,
    auth: RequireAuth,
) -> Result<Json<Envelope<Value>>, AppError> {
    transition(&state, GraphAction::AcceptRequest, &auth.user_id, &other).await
}

/// `PUT /friends/reject/{userId}`
pub async fn reject(
    State(state): State<AppState>,
    Path(other): Path<String>,
    auth: RequireAuth,
) -> Result<Json<Envelope<Value>>, AppError> {
    transition(&state, GraphAction::RejectRequest, &auth.user_id, &other).await
}

/// `DELETE /friends/{userId}`
pub async fn remove(
    State(state): State<AppState>,
    Path(other): Path<String>,
    auth: RequireAuth,
) -> Result<Json<Envelope<Value>>, AppError> {
    transition(&state, GraphAction::RemoveFriend, &auth.user_id, &other).await
}

async fn transition(
    state: &AppState,
    action: GraphAction,
    actor: &str,
    other: &str,
) -> Result<Json<Envelope<Value>>, AppError> {
    match state.storage.graph_transition(action, actor, other).await {
        Ok(ops) => {
            tracing::info!(%action, actor, other, ops = ops.len(), "graph transition");
            Ok(Json(Envelope::empty()))
        }
        Err(e) => {
            tracing::debug!(%action, actor, other, error = %e, "graph transition refused");
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::handlers::test_support::{ids, TestApp, TestUser};

    async fn befriend(app: &TestApp, a: &TestUser, b: &TestUser) {
        let (s, _) = app
            .signed(a, "POST", &format!("/friends/request/{}", b.id), None)
            .await;
        assert_eq!(s, StatusCode::OK);
        let (s, _) = app
            .signed(b, "PUT", &format!("/friends/accept/{}", a.id), None)
            .await;
        assert_eq!(s, StatusCode::OK);
    }

    #[tokio::test]
    async fn request_accept_makes_mutual_friends() {
        let app = TestApp::new();
        let a = app.user("Alice").await;
        let b = app.user("Bob").await;

        app.signed(&a, "POST", &format!("/friends/request/{}", b.id), None)
            .await;
        let (_, body) = app.signed(&b, "GET", "/friends/requests", None).await;
        assert_eq!(body["count"], 1);
        assert_eq!(ids(&body), [a.id.clone()]);

        let (status, body) = app
            .signed(&b, "PUT", &format!("/friends/accept/{}", a.id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "data": {} }));

        let (_, a_friends) = app.signed(&a, "GET", "/friends", None).await;
        let (_, b_friends) = app.signed(&b, "GET", "/friends", None).await;
        assert_eq!(ids(&a_friends), [b.id.clone()]);
        assert_eq!(ids(&b_friends), [a.id.clone()]);

        let (_, body) = app.signed(&b, "GET", "/friends/requests", None).await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn reject_clears_request_without_friendship() {
        let app = TestApp::new();
        let a = app.user("Alice").await;
        let b = app.user("Bob").await;
        app.signed(&a, "POST", &format!("/friends/request/{}", b.id), None)
            .await;

        let (status, _) = app
            .signed(&b, "PUT", &format!("/friends/reject/{}", a.id), None)
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = app.signed(&b, "GET", "/friends/requests", None).await;
        assert_eq!(body["count"], 0);
        let (_, body) = app.signed(&a, "GET", "/friends", None).await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn duplicate_request_is_bad_request() {
        let app = TestApp::new();
        let a = app.user("Alice").await;
        let b = app.user("Bob").await;
        let path = format!("/friends/request/{}", b.id);
        app.signed(&a, "POST", &path, None).await;

        let (status, body) = app.signed(&a, "POST", &path, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Friend request already sent");

        let (_, body) = app.signed(&b, "GET", "/friends/requests", None).await;
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn request_to_self_is_bad_request() {
        let app = TestApp::new();
        let a = app.user("Alice").await;
        let (status, body) = app
            .signed(&a, "POST", &format!("/friends/request/{}", a.id), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "You cannot send a friend request to yourself");
    }

    #[tokio::test]
    async fn request_to_friend_is_bad_request() {
        let app = TestApp::new();
        let a = app.user("Alice").await;
        let b = app.user("Bob").await;
        befriend(&app, &a, &b).await;
        let (status, body) = app
            .signed(&b, "POST", &format!("/friends/request/{}", a.id), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "You are already friends with this user");
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() {
        let app = TestApp::new();
        let a = app.user("Alice").await;
        let (status, body) = app
            .signed(&a, "POST", "/friends/request/ghost", None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");

        let (status, _) = app.signed(&a, "DELETE", "/friends/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn accept_without_request_is_bad_request() {
        let app = TestApp::new();
        let a = app.user("Alice").await;
        let b = app.user("Bob").await;
        let (status, body) = app
            .signed(&a, "PUT", &format!("/friends/accept/{}", b.id), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No friend request from this user");

        let (status, _) = app
            .signed(&a, "PUT", &format!("/friends/reject/{}", b.id), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn remove_unfriends_both_sides() {
        let app = TestApp::new();
        let a = app.user("Alice").await;
        let b = app.user("Bob").await;
        befriend(&app, &a, &b).await;

        let (status, _) = app
            .signed(&a, "DELETE", &format!("/friends/{}", b.id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = app.signed(&b, "GET", "/friends", None).await;
        assert_eq!(body["count"], 0);

        let (status, body) = app
            .signed(&a, "DELETE", &format!("/friends/{}", b.id), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "This user is not your friend");
    }

    #[tokio::test]
    async fn status_tracks_lifecycle() {
        let app = TestApp::new();
        let a = app.user("Alice").await;
        let b = app.user("Bob").await;
        let path = format!("/friends/status/{}", b.id);
        let back = format!("/friends/status/{}", a.id);

        let (_, body) = app.signed(&a, "GET", &path, None).await;
        assert_eq!(body["data"]["relationship"], "none");

        app.signed(&a, "POST", &format!("/friends/request/{}", b.id), None)
            .await;
        let (_, body) = app.signed(&a, "GET", &path, None).await;
        assert_eq!(body["data"]["relationship"], "request_sent");
        let (_, body) = app.signed(&b, "GET", &back, None).await;
        assert_eq!(body["data"]["relationship"], "request_received");

        app.signed(&b, "PUT", &format!("/friends/accept/{}", a.id), None)
            .await;
        let (_, body) = app.signed(&a, "GET", &path, None).await;
        assert_eq!(body["data"]["relationship"], "friends");

        let (status, _) = app.signed(&a, "GET", "/friends/status/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_of_own_id_is_self() {
        let app = TestApp::new();
        let a = app.user("Alice").await;
        let (status, body) = app
            .signed(&a, "GET", &format!("/friends/status/{}", a.id), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"], a.id.as_str());
        assert_eq!(body["data"]["relationship"], "self");
    }

    #[tokio::test]
    async fn friend_endpoints_require_signature() {
        let app = TestApp::new();
        let (status, body) = app.get("/friends").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }
}
