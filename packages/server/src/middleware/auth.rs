//! HTTP Signature authentication (draft-cavage-http-signatures-12 subset).
//!
//! [`RequireAuth`] resolves the calling user from the `Signature` header:
//! the `keyId` names a registered user, whose stored public key must verify
//! the signature over `(request-target)`, `host`, and `date`. The `Date`
//! header must be within the configured skew of the server clock.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use hearth::identity::{decode_public_key, parse_signature_header, verify_signature};

use crate::{error::AppError, handlers::AppState};

/// Headers every accepted signature must cover.
const REQUIRED_HEADERS: [&str; 2] = ["(request-target)", "date"];

// ---------------------------------------------------------------------------
// RequireAuth extractor
// ---------------------------------------------------------------------------

/// Axum extractor that requires a valid HTTP Signature from a registered user.
///
/// Rejects with 401 if the `Signature` header is absent or does not verify.
#[derive(Debug, Clone)]
pub struct RequireAuth {
    /// The user id taken from `keyId` once the signature has verified.
    pub user_id: String,
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        match verify_http_signature(parts, &app_state).await {
            Ok(user_id) => Ok(RequireAuth { user_id }),
            Err(reason) => {
                tracing::debug!(%reason, path = %parts.uri.path(), "rejected signature");
                Err(AppError::Unauthorized(reason))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Parse and verify an HTTP Signature, returning the caller's user id.
async fn verify_http_signature(parts: &Parts, state: &AppState) -> Result<String, String> {
    let sig_header = parts
        .headers
        .get("signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing Signature header".to_string())?;

    let parsed = parse_signature_header(sig_header).map_err(|e| e.to_string())?;

    if parsed.algorithm != "ed25519" {
        return Err(format!("unsupported algorithm: {}", parsed.algorithm));
    }
    for required in REQUIRED_HEADERS {
        if !parsed.headers.iter().any(|h| h == required) {
            return Err(format!("signature must cover {required}"));
        }
    }

    let date_str = parts
        .headers
        .get("date")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| "missing Date header".to_string())?;
    validate_date(date_str, state.config.signature_max_skew_secs)
        .map_err(|e| format!("Date header invalid: {e}"))?;

    let user = state
        .storage
        .get_user(&parsed.key_id)
        .await
        .map_err(|e| format!("storage error: {e}"))?
        .ok_or_else(|| format!("user {} not registered", parsed.key_id))?;

    let key = decode_public_key(&user.public_key)
        .map_err(|e| format!("invalid public key for {}: {e}", parsed.key_id))?;

    let message = build_signing_string(parts, &parsed.headers)?;
    verify_signature(&key, message.as_bytes(), &parsed.signature).map_err(|e| e.to_string())?;

    Ok(parsed.key_id)
}

/// Rebuild the signed string from the request and the header list.
///
/// Must match [`hearth::identity::signing_string`] when the list is the
/// default `(request-target) host date`.
fn build_signing_string(parts: &Parts, headers: &[String]) -> Result<String, String> {
    let mut lines = Vec::with_capacity(headers.len());
    for name in headers {
        if name == "(request-target)" {
            let method = parts.method.as_str().to_lowercase();
            let path = parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            lines.push(format!("(request-target): {method} {path}"));
        } else {
            let value = parts
                .headers
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| format!("missing header: {name}"))?;
            lines.push(format!("{name}: {value}"));
        }
    }
    Ok(lines.join("\n"))
}

/// Accept HTTP-date or RFC 3339 values within `max_skew_secs` of now.
fn validate_date(date_str: &str, max_skew_secs: u64) -> Result<(), String> {
    let dt = httpdate::parse_http_date(date_str)
        .map(chrono::DateTime::<chrono::Utc>::from)
        .or_else(|_| {
            chrono::DateTime::parse_from_rfc3339(date_str).map(|d| d.with_timezone(&chrono::Utc))
        })
        .map_err(|_| format!("unparseable date: {date_str:?}"))?;

    let diff = (chrono::Utc::now() - dt).num_seconds().unsigned_abs();
    if diff > max_skew_secs {
        return Err(format!(
            "Date is {diff}s from server clock (max {max_skew_secs}s allowed)"
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use hearth::identity::sign_request;
    use hearth::{Identity, User};
    use tower::ServiceExt;

    use crate::{
        config::ServerConfig,
        router::build_router,
        storage::{memory::MemoryStorage, Storage},
    };

    fn http_date_now() -> String {
        httpdate::fmt_http_date(std::time::SystemTime::now())
    }

    async fn app_with_user() -> (Router, Identity, String) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let identity = Identity::generate();
        let user = User::new("Ada", "ada@example.com", identity.public_key_multibase());
        storage.put_user(&user).await.unwrap();
        let config = ServerConfig {
            rate_limit_per_minute: 0,
            ..ServerConfig::default()
        };
        (build_router(storage, config), identity, user.id)
    }

    fn signed_get(path: &str, signature: &str, date: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(path)
            .header("host", "localhost")
            .header("date", date)
            .header("signature", signature)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn valid_signature_accepted() {
        let (app, identity, id) = app_with_user().await;
        let date = http_date_now();
        let sig = sign_request(&identity, &id, "GET", "/users/me", "localhost", &date);
        let resp = app.oneshot(signed_get("/users/me", &sig, &date)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_signature_is_unauthorized() {
        let (app, _, _) = app_with_user().await;
        let req = Request::builder()
            .uri("/users/me")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signature_from_wrong_key_rejected() {
        let (app, _, id) = app_with_user().await;
        let impostor = Identity::generate();
        let date = http_date_now();
        let sig = sign_request(&impostor, &id, "GET", "/users/me", "localhost", &date);
        let resp = app.oneshot(signed_get("/users/me", &sig, &date)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn signature_for_other_path_rejected() {
        let (app, identity, id) = app_with_user().await;
        let date = http_date_now();
        let sig = sign_request(&identity, &id, "GET", "/friends", "localhost", &date);
        let resp = app.oneshot(signed_get("/users/me", &sig, &date)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_key_id_rejected() {
        let (app, identity, _) = app_with_user().await;
        let date = http_date_now();
        let sig = sign_request(&identity, "ghost", "GET", "/users/me", "localhost", &date);
        let resp = app.oneshot(signed_get("/users/me", &sig, &date)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn stale_and_future_dates_rejected() {
        assert!(validate_date("Thu, 01 Jan 2020 00:00:00 GMT", 300).is_err());
        assert!(validate_date("yesterday-ish", 300).is_err());
        assert!(validate_date("Fri, 01 Jan 2100 00:00:00 GMT", 300).is_err());
    }

    #[test]
    fn current_date_accepted() {
        assert_eq!(validate_date(&http_date_now(), 300), Ok(()));
        let rfc3339 = chrono::Utc::now().to_rfc3339();
        assert_eq!(validate_date(&rfc3339, 300), Ok(()));
    }

    #[test]
    fn signing_string_matches_client_construction() {
        let date = http_date_now();
        let req = Request::builder()
            .method("POST")
            .uri("/friends/request/u2?x=1")
            .header("host", "example.org")
            .header("date", &date)
            .body(())
            .unwrap();
        let (parts, _) = req.into_parts();
        let headers: Vec<String> = hearth::identity::SIGNED_HEADERS
            .split(' ')
            .map(String::from)
            .collect();
        assert_eq!(
            build_signing_string(&parts, &headers).unwrap(),
            hearth::identity::signing_string("POST", "/friends/request/u2?x=1", "example.org", &date)
        );
    }
}
