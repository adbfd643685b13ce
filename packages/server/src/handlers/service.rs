//! Service discovery: `GET /.well-known/hearth`.

use axum::{extract::State, Json};
use hearth::identity::SIGNED_HEADERS;
use hearth_api::{Envelope, ServiceInfo};

use super::AppState;

/// `GET /.well-known/hearth`
///
/// Tells clients which signature scheme and clock skew this server accepts.
pub async fn well_known(State(state): State<AppState>) -> Json<Envelope<ServiceInfo>> {
    let cfg = &state.config;
    Json(Envelope::ok(ServiceInfo {
        name: cfg.name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        contact: cfg.contact.clone(),
        signature_algorithm: "ed25519".into(),
        signed_headers: SIGNED_HEADERS.into(),
        max_clock_skew_secs: cfg.signature_max_skew_secs,
    }))
}
