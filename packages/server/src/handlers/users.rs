//! User directory handlers.
//!
//! - `POST /users`: register.
//! - `GET  /users`: search by name or email.
//! - `GET  /users/me`: the caller's own record.
//! - `GET  /users/{id}`: a user's public record.
//! - `PUT  /users/{id}`: update one's own profile.
//! - `GET  /users/{id}/posts`: posts by one author, newest first.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use hearth::{validate_user, Post, ProfileView, User};
use hearth_api::{Envelope, PostQuery, RegisterRequest, SearchQuery, UpdateProfileRequest};

use crate::{error::AppError, middleware::auth::RequireAuth, storage::PostFilter};

use super::{missing, non_empty, AppState};

/// `POST /users`: register a new user with their signing key.
///
/// Returns 201 with the stored record. Returns 400 if validation fails or the
/// email is already registered.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<User>>), AppError> {
    let Json(req) = payload?;

    let mut user = User::new(req.name.trim(), req.email.trim(), req.public_key.trim());
    user.bio = req.bio.and_then(non_empty);
    user.location = req.location.and_then(non_empty);
    user.profile_picture = req.profile_picture.and_then(non_empty);
    user.cover_picture = req.cover_picture.and_then(non_empty);
    validate_user(&user)?;

    state.storage.put_user(&user).await?;
    tracing::info!(user = %user.id, "registered user");

    Ok((StatusCode::CREATED, Json(Envelope::ok(user))))
}

/// `GET /users?q=&limit=`: search the directory.
pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<ProfileView>>>, AppError> {
    let Query(q) = query?;
    let needle = q.q.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let limit = state.config.page_limit(q.limit);
    let views = state.storage.search_users(needle, limit).await?;
    Ok(Json(Envelope::list(views)))
}

/// `GET /users/me`
pub async fn me(
    State(state): State<AppState>,
    auth: RequireAuth,
) -> Result<Json<Envelope<User>>, AppError> {
    get_by_id(State(state), Path(auth.user_id)).await
}

/// `GET /users/{id}`: includes the derived `friends` and `friend_requests`.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Envelope<User>>, AppError> {
    let user = state
        .storage
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(Envelope::ok(user)))
}

/// `PUT /users/{id}`: partial profile update.
///
/// Only the owner may update a profile; anyone else gets 401. An empty string
/// clears an optional field.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    auth: RequireAuth,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<Envelope<User>>, AppError> {
    if auth.user_id != id {
        return Err(AppError::Unauthorized(
            "You can only update your own profile".into(),
        ));
    }
    let Json(patch) = payload?;

    let mut user = state
        .storage
        .get_user(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if let Some(name) = patch.name {
        user.name = name.trim().to_string();
    }
    if let Some(bio) = patch.bio {
        user.bio = non_empty(bio);
    }
    if let Some(location) = patch.location {
        user.location = non_empty(location);
    }
    if let Some(url) = patch.profile_picture {
        user.profile_picture = non_empty(url);
    }
    if let Some(url) = patch.cover_picture {
        user.cover_picture = non_empty(url);
    }
    validate_user(&user)?;

    state
        .storage
        .update_user(&user)
        .await
        .map_err(missing("User"))?;
    Ok(Json(Envelope::ok(user)))
}

/// `GET /users/{id}/posts`: one author's posts, newest first.
pub async fn posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<PostQuery>, QueryRejection>,
) -> Result<Json<Envelope<Vec<Post>>>, AppError> {
    let Query(q) = query?;
    if state.storage.get_user(&id).await?.is_none() {
        return Err(AppError::NotFound("User not found".into()));
    }
    let filter = PostFilter {
        authors: vec![id],
        before: q.before,
        limit: state.config.page_limit(q.limit),
    };
    let posts = state.storage.list_posts(&filter).await?;
    Ok(Json(Envelope::list(posts)))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use hearth::Identity;
    use serde_json::json;

    use crate::handlers::test_support::{ids, TestApp};

    fn register_req(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn register_then_fetch() {
        let app = TestApp::new();
        let key = Identity::generate().public_key_multibase();
        let (status, body) = app
            .send(register_req(json!({
                "name": "Ada",
                "email": "ada@example.com",
                "public_key": key,
                "bio": "engines"
            })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, body) = app.get(&format!("/users/{id}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["bio"], "engines");
        assert_eq!(body["data"]["friends"], json!([]));
    }

    #[tokio::test]
    async fn duplicate_email_is_bad_request() {
        let app = TestApp::new();
        let body = json!({
            "name": "Ada",
            "email": "ada@example.com",
            "public_key": Identity::generate().public_key_multibase()
        });
        app.send(register_req(body.clone())).await;
        let (status, resp) = app.send(register_req(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["success"], false);
        assert_eq!(resp["error"], "user already exists");
    }

    #[tokio::test]
    async fn invalid_registration_rejected() {
        let app = TestApp::new();
        let (status, resp) = app
            .send(register_req(json!({
                "name": "Ada",
                "email": "not-an-email",
                "public_key": Identity::generate().public_key_multibase()
            })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(resp["error"].as_str().unwrap().contains("email"));

        let (status, resp) = app.send(register_req(json!({ "name": "Ada" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(resp["success"], false);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let app = TestApp::new();
        let (status, body) = app.get("/users/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
        assert_eq!(body["data"], json!({}));
    }

    #[tokio::test]
    async fn owner_can_update_profile() {
        let app = TestApp::new();
        let ada = app.user("Ada").await;
        let path = format!("/users/{}", ada.id);
        let (status, body) = app
            .signed(&ada, "PUT", &path, Some(json!({ "location": "London", "name": "Ada L." })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["location"], "London");
        assert_eq!(body["data"]["name"], "Ada L.");

        let (_, body) = app
            .signed(&ada, "PUT", &path, Some(json!({ "location": "" })))
            .await;
        assert!(body["data"].get("location").is_none());
    }

    #[tokio::test]
    async fn oversized_location_is_rejected() {
        let app = TestApp::new();
        let ada = app.user("Ada").await;
        let path = format!("/users/{}", ada.id);
        let location = "x".repeat(hearth::validation::MAX_LOCATION_LEN + 1);
        let (status, body) = app
            .signed(&ada, "PUT", &path, Some(json!({ "location": location })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (_, body) = app.get(&path).await;
        assert!(body["data"].get("location").is_none());
    }

    #[tokio::test]
    async fn updating_someone_else_is_unauthorized() {
        let app = TestApp::new();
        let ada = app.user("Ada").await;
        let bob = app.user("Bob").await;
        let (status, _) = app
            .signed(&bob, "PUT", &format!("/users/{}", ada.id), Some(json!({ "bio": "hacked" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_returns_caller() {
        let app = TestApp::new();
        let ada = app.user("Ada").await;
        let (status, body) = app.signed(&ada, "GET", "/users/me", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], ada.id.as_str());
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_limited() {
        let app = TestApp::new();
        let ada = app.user("Ada").await;
        app.user("Bob").await;
        app.user("Adam").await;

        let (status, body) = app.get("/users?q=ADA").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(ids(&body)[0], ada.id);

        let (_, body) = app.get("/users?limit=1").await;
        assert_eq!(body["count"], 1);

        let (status, _) = app.get("/users?limit=lots").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
