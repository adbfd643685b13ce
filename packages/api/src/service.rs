//! Service discovery: `GET /.well-known/hearth`.

use serde::{Deserialize, Serialize};

/// Describes a running Hearth server so clients can check compatibility.
///
/// ```json
/// {
///   "name": "hearth-dev",
///   "version": "0.1.0",
///   "signature_algorithm": "ed25519",
///   "signed_headers": "(request-target) host date",
///   "max_clock_skew_secs": 300
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServiceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Server crate version.
    pub version: String,

    /// Operator contact (email or URL).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,

    pub signature_algorithm: String,

    /// Headers a request signature must cover, space separated.
    pub signed_headers: String,

    /// Largest accepted difference between the `Date` header and the server
    /// clock.
    pub max_clock_skew_secs: u64,
}
