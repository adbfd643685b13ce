//! Assembles the Axum [`Router`] from all handler modules.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    config::ServerConfig,
    handlers::{comments, friends, posts, service, users, AppState},
    middleware::rate_limit::{rate_limit_middleware, RateLimiter},
    storage::Storage,
};

/// Build the complete application router with shared state.
pub fn build_router(storage: Arc<dyn Storage>, config: ServerConfig) -> Router {
    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute));
    let state = AppState { storage, config };

    Router::new()
        .route("/.well-known/hearth", get(service::well_known))
        // Users
        .route("/users", post(users::register).get(users::search))
        .route("/users/me", get(users::me))
        .route("/users/{id}", get(users::get_by_id).put(users::update))
        .route("/users/{id}/posts", get(users::posts))
        // Friends
        .route("/friends", get(friends::list))
        .route("/friends/requests", get(friends::requests))
        .route("/friends/status/{user_id}", get(friends::status))
        .route("/friends/request/{user_id}", post(friends::send_request))
        .route("/friends/accept/{user_id}", put(friends::accept))
        .route("/friends/reject/{user_id}", put(friends::reject))
        .route("/friends/{user_id}", delete(friends::remove))
        // Posts
        .route("/posts", get(posts::list).post(posts::create))
        .route("/posts/feed", get(posts::feed))
        .route(
            "/posts/{id}",
            get(posts::get_by_id).put(posts::update).delete(posts::delete),
        )
        .route("/posts/{id}/like", put(posts::like).delete(posts::unlike))
        .route(
            "/posts/{id}/comments",
            get(posts::comments).post(posts::add_comment),
        )
        // Comments
        .route(
            "/comments/{id}",
            put(comments::update).delete(comments::delete),
        )
        .route(
            "/comments/{id}/like",
            put(comments::like).delete(comments::unlike),
        )
        .with_state(state)
        .layer(axum::middleware::from_fn(move |req, next| {
            rate_limit_middleware(Arc::clone(&rate_limiter), req, next)
        }))
        .layer(TraceLayer::new_for_http())
}
