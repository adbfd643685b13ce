//! Post and comment types: `/posts` and `/comments` endpoints.

use serde::{Deserialize, Serialize};

/// Request body for `POST /posts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatePostRequest {
    pub text: String,

    /// Image URL; upload happens outside Hearth.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Request body for `PUT /posts/{id}`. Absent fields are unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdatePostRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Request body for `POST /posts/{id}/comments` and `PUT /comments/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentRequest {
    pub text: String,
}

/// Query parameters for `GET /posts`, `GET /users/{id}/posts`, and
/// `GET /posts/feed`.
///
/// Posts are returned newest first. Pass the last post's `id` as `before`
/// to fetch the next page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PostQuery {
    /// Only posts by this user id. Ignored by the feed endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Keyset cursor: only posts with `id < before`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,

    /// Page size. Default 20.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_post_without_image() {
        let req: CreatePostRequest = serde_json::from_str(r#"{"text":"hello"}"#).unwrap();
        assert_eq!(req.text, "hello");
        assert!(req.image.is_none());
    }

    #[test]
    fn post_query_skips_absent_params() {
        let q = PostQuery {
            limit: Some(5),
            ..Default::default()
        };
        assert_eq!(serde_json::to_string(&q).unwrap(), r#"{"limit":5}"#);
    }
}
