//! Shared helpers for the Hearth conformance test suite.
//!
//! [`spawn_node`] binds a `TcpListener` on an ephemeral port, serves an
//! in-process Hearth server backed by `MemoryStorage`, and returns the base
//! URL together with the storage handle so tests can inspect state directly.
//! [`Member`] is a registered user that signs its own requests.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use hearth::identity::sign_request;
use hearth::Identity;
use hearth_server::{build_router, MemoryStorage, ServerConfig, SqliteStorage, Storage};
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

/// Start an ephemeral in-memory server and return `(base_url, storage)`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound.
pub async fn spawn_node() -> (String, Arc<MemoryStorage>) {
    let mem_storage = Arc::new(MemoryStorage::new());
    let storage: Arc<dyn Storage> = Arc::clone(&mem_storage) as Arc<dyn Storage>;
    let base_url = serve(storage).await;
    (base_url, mem_storage)
}

/// Start an ephemeral server backed by an in-memory SQLite database.
pub async fn spawn_sqlite_node() -> String {
    let storage = SqliteStorage::open_in_memory().expect("open sqlite");
    serve(Arc::new(storage)).await
}

async fn serve(storage: Arc<dyn Storage>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");

    let config = ServerConfig {
        name: Some("conformance-node".into()),
        bind_addr: addr,
        rate_limit_per_minute: 0,
        ..ServerConfig::default()
    };
    let router = build_router(storage, config);

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance node error");
    });

    format!("http://{addr}")
}

pub fn make_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("build http client")
}

/// A user registered over HTTP, holding the key it signs requests with.
pub struct Member {
    pub id: String,
    pub identity: Identity,
    base: String,
    client: reqwest::Client,
}

impl Member {
    /// Register `name` with a fresh key via `POST /users`.
    ///
    /// The email is derived from the name, so names must be unique per node.
    pub async fn register(base: &str, name: &str) -> Self {
        let identity = Identity::generate();
        let client = make_client();
        let resp = client
            .post(format!("{base}/users"))
            .json(&json!({
                "name": name,
                "email": format!("{}@example.com", name.to_lowercase()),
                "public_key": identity.public_key_multibase(),
            }))
            .send()
            .await
            .expect("register request");
        assert_eq!(resp.status(), StatusCode::CREATED, "register {name}");
        let body: Value = resp.json().await.expect("register body");
        let id = body["data"]["id"].as_str().expect("user id").to_string();
        Self {
            id,
            identity,
            base: base.to_string(),
            client,
        }
    }

    /// Send a signed request and return `(status, body)`.
    pub async fn call(&self, method: Method, path: &str, body: Option<Value>) -> (StatusCode, Value) {
        let host = self.base.trim_start_matches("http://");
        let date = httpdate::fmt_http_date(SystemTime::now());
        let signature = sign_request(&self.identity, &self.id, method.as_str(), path, host, &date);

        let mut req = self
            .client
            .request(method, format!("{}{path}", self.base))
            .header("date", date)
            .header("signature", signature);
        if let Some(b) = body {
            req = req.json(&b);
        }
        let resp = req.send().await.expect("signed request");
        let status = resp.status();
        let body = resp.json().await.unwrap_or(Value::Null);
        (status, body)
    }
}
