//! User directory types: `POST/GET/PUT /users` and `GET /users/me`.

use serde::{Deserialize, Serialize};

/// Request body for `POST /users`: register a new user.
///
/// `public_key` is the multibase Ed25519 key the user will sign requests
/// with. The server assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub public_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_picture: Option<String>,
}

/// Request body for `PUT /users/{id}`: partial profile update.
///
/// Absent fields are left unchanged. Email and public key cannot be changed
/// through this endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateProfileRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_picture: Option<String>,
}

impl UpdateProfileRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.bio.is_none()
            && self.location.is_none()
            && self.profile_picture.is_none()
            && self.cover_picture.is_none()
    }
}

/// Query parameters for `GET /users`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchQuery {
    /// Case-insensitive substring matched against name and email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,

    /// Maximum results. Default 20.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}
