//! The response envelope wrapping every Hearth API body.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON shape of every response, success or failure.
///
/// ```json
/// { "success": true, "count": 2, "data": [ ... ] }
/// { "success": false, "data": {}, "error": "User not found" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    pub success: bool,

    /// Number of items in `data`. Present on list responses only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,

    pub data: T,

    /// Human-readable failure reason. Present on errors only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// A successful single-object response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            count: None,
            data,
            error: None,
        }
    }
}

impl<T> Envelope<Vec<T>> {
    /// A successful list response; `count` is the list length.
    pub fn list(data: Vec<T>) -> Self {
        Self {
            success: true,
            count: Some(data.len()),
            data,
            error: None,
        }
    }
}

impl Envelope<Value> {
    /// A failure response with an empty `data` object.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            count: None,
            data: Value::Object(Default::default()),
            error: Some(message.into()),
        }
    }

    /// A success response with no payload (`data: {}`).
    pub fn empty() -> Self {
        Self::ok(Value::Object(Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_shape() {
        let json = serde_json::to_value(Envelope::error("User not found")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "success": false, "data": {}, "error": "User not found" })
        );
    }

    #[test]
    fn list_envelope_counts_items() {
        let json = serde_json::to_value(Envelope::list(vec![1, 2, 3])).unwrap();
        assert_eq!(json["count"], 3);
        assert_eq!(json["success"], true);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn single_envelope_omits_count() {
        let json = serde_json::to_string(&Envelope::ok("x")).unwrap();
        assert_eq!(json, r#"{"success":true,"data":"x"}"#);
    }

    #[test]
    fn error_envelope_parses_into_generic_value() {
        let env: Envelope<Value> =
            serde_json::from_str(r#"{"success":false,"data":{},"error":"nope"}"#).unwrap();
        assert!(!env.success);
        assert_eq!(env.error.as_deref(), Some("nope"));
    }
}
