//! Blocking HTTP client for a Hearth server.
//!
//! Authenticated calls are signed with the user's [`Identity`] using the
//! same signing string the server rebuilds, so the `host` and request-target
//! here must match what reqwest actually puts on the wire.

use std::time::SystemTime;

use hearth::identity::sign_request;
use hearth::Identity;
use hearth_api::Envelope;
use reqwest::blocking::{Client as HttpClient, RequestBuilder};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server URL: {0}")]
    BadUrl(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a failure envelope.
    #[error("{message} (HTTP {status})")]
    Api { status: u16, message: String },

    #[error("this command needs HEARTH_USER and HEARTH_SEED (see `hearth keygen`)")]
    NotSignedIn,
}

/// The signed-in user: their id and signing identity.
pub struct Credentials {
    pub user_id: String,
    pub identity: Identity,
}

pub struct Client {
    http: HttpClient,
    base: Url,
    credentials: Option<Credentials>,
}

impl Client {
    pub fn new(base: &str, credentials: Option<Credentials>) -> Result<Self, ClientError> {
        let base = Url::parse(base).map_err(|e| ClientError::BadUrl(format!("{base}: {e}")))?;
        Ok(Self {
            http: HttpClient::new(),
            base,
            credentials,
        })
    }

    /// Unsigned `GET`.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Envelope<T>, ClientError> {
        self.call(Method::GET, path, None::<&()>, None::<&Value>, false)
    }

    /// Unsigned `GET` with query parameters.
    pub fn get_query<T: DeserializeOwned, Q: Serialize>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<Envelope<T>, ClientError> {
        self.call(Method::GET, path, Some(query), None::<&Value>, false)
    }

    /// Signed request with an optional query and JSON body.
    pub fn signed<T, Q, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<Envelope<T>, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize,
        B: Serialize,
    {
        self.call(method, path, query, body, true)
    }

    /// Unsigned request with a JSON body (registration).
    pub fn post_unsigned<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>, ClientError> {
        self.call(Method::POST, path, None::<&()>, Some(body), false)
    }

    fn call<T, Q, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
        sign: bool,
    ) -> Result<Envelope<T>, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let url = self
            .base
            .join(path)
            .map_err(|e| ClientError::BadUrl(format!("{path}: {e}")))?;
        let mut builder: RequestBuilder = self.http.request(method.clone(), url);
        if let Some(q) = query {
            builder = builder.query(q);
        }
        if let Some(b) = body {
            builder = builder.json(b);
        }
        let mut request = builder.build()?;

        if sign {
            let creds = self.credentials.as_ref().ok_or(ClientError::NotSignedIn)?;
            let target = request_target(request.url());
            let host = host_header(request.url());
            let date = httpdate::fmt_http_date(SystemTime::now());
            let signature = sign_request(
                &creds.identity,
                &creds.user_id,
                method.as_str(),
                &target,
                &host,
                &date,
            );
            let headers = request.headers_mut();
            headers.insert("date", header_value(&date)?);
            headers.insert("signature", header_value(&signature)?);
        }

        let resp = self.http.execute(request)?;
        let status = resp.status();
        let text = resp.text()?;
        if !status.is_success() {
            let message = serde_json::from_str::<Envelope<Value>>(&text)
                .ok()
                .and_then(|env| env.error)
                .unwrap_or(text);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Api {
            status: status.as_u16(),
            message: format!("unexpected response body: {e}"),
        })
    }
}

fn header_value(s: &str) -> Result<reqwest::header::HeaderValue, ClientError> {
    reqwest::header::HeaderValue::from_str(s)
        .map_err(|e| ClientError::BadUrl(format!("header value {s:?}: {e}")))
}

/// Path plus query, as the server sees it in `(request-target)`.
fn request_target(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{q}", url.path()),
        None => url.path().to_string(),
    }
}

/// The `Host` header reqwest sends: host, plus port when not the default.
fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}
