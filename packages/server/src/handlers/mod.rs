//! HTTP request handlers for all Hearth endpoints.
//!
//! Each submodule covers one resource. Handlers are async functions that
//! receive Axum extractors and return `Result<_, AppError>`; every body is an
//! [`Envelope`](hearth_api::Envelope). Ownership checks live here, not in
//! storage.

pub mod comments;
pub mod friends;
pub mod posts;
pub mod service;
pub mod users;

use std::sync::Arc;

use crate::{config::ServerConfig, error::AppError, storage::Storage, storage::StorageError};

/// Shared application state threaded through all Axum handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub config: ServerConfig,
}

/// Map a storage error, naming the missing entity on `NotFound`.
pub(crate) fn missing(what: &'static str) -> impl Fn(StorageError) -> AppError {
    move |e| match e {
        StorageError::NotFound => AppError::NotFound(format!("{what} not found")),
        other => other.into(),
    }
}

/// Treat an empty string in a patch as "clear this field".
pub(crate) fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Helpers for router-level tests: a memory-backed app, registered users
    //! with their signing identities, and signed request builders.

    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use http_body_util::BodyExt;
    use hearth::identity::sign_request;
    use hearth::{Identity, User};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{
        config::ServerConfig,
        router::build_router,
        storage::{memory::MemoryStorage, Storage},
    };

    pub struct TestApp {
        pub router: Router,
        pub storage: Arc<dyn Storage>,
    }

    pub struct TestUser {
        pub id: String,
        pub identity: Identity,
    }

    impl TestApp {
        pub fn new() -> Self {
            let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
            let config = ServerConfig {
                rate_limit_per_minute: 0,
                ..ServerConfig::default()
            };
            Self {
                router: build_router(Arc::clone(&storage), config),
                storage,
            }
        }

        /// Register a user directly in storage.
        pub async fn user(&self, name: &str) -> TestUser {
            let identity = Identity::generate();
            let user = User::new(
                name,
                format!("{}@example.com", name.to_lowercase()),
                identity.public_key_multibase(),
            );
            self.storage.put_user(&user).await.unwrap();
            TestUser {
                id: user.id,
                identity,
            }
        }

        pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
            let resp = self.router.clone().oneshot(req).await.unwrap();
            let status = resp.status();
            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, body)
        }

        /// Send a request signed by `user`, with an optional JSON body.
        pub async fn signed(
            &self,
            user: &TestUser,
            method: &str,
            path: &str,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let date = httpdate::fmt_http_date(std::time::SystemTime::now());
            let sig = sign_request(&user.identity, &user.id, method, path, "localhost", &date);
            let builder = Request::builder()
                .method(method)
                .uri(path)
                .header("host", "localhost")
                .header("date", date)
                .header("signature", sig);
            let req = match body {
                Some(json) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(json.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.send(req).await
        }

        pub async fn get(&self, path: &str) -> (StatusCode, Value) {
            let req = Request::builder().uri(path).body(Body::empty()).unwrap();
            self.send(req).await
        }
    }

    /// Ids in a list envelope's `data`, in response order.
    pub fn ids(body: &Value) -> Vec<String> {
        body["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }
}
