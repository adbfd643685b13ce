//! Core data types for Hearth.
//!
//! This module defines the records that make up the social network:
//! [`User`], [`ProfileView`], [`Post`], and [`Comment`]. All types serialise
//! to and from JSON exactly as they appear on the wire.
//!
//! Friend lists and pending requests are not stored on the user record; they
//! are derived from [`FriendshipEdge`](crate::graph::FriendshipEdge) and
//! [`FriendRequest`](crate::graph::FriendRequest) records and attached to a
//! [`User`] only when it is returned to a client.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A registered user.
///
/// `friends` and `friend_requests` are semantically sets. They are filled in
/// by the store from the graph records when the user is read, and ignored on
/// write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// UUIDv7 identifier, immutable once assigned.
    pub id: String,

    /// Display name. Must be non-empty.
    pub name: String,

    /// Contact email, unique across the directory (case-insensitive).
    pub email: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// URL of the profile picture. Upload happens elsewhere; Hearth only
    /// stores the link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_picture: Option<String>,

    /// Multibase (`z`-prefixed base58btc) Ed25519 public key used to verify
    /// this user's request signatures.
    pub public_key: String,

    /// RFC 3339 timestamp of registration.
    pub created_at: String,

    /// Ids of confirmed friends.
    #[serde(default)]
    pub friends: BTreeSet<String>,

    /// Ids of users with a pending request addressed to this user.
    #[serde(default)]
    pub friend_requests: BTreeSet<String>,
}

impl User {
    /// Create a new user with auto-generated UUIDv7 `id` and current UTC
    /// `created_at`. Optional profile fields start empty.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        public_key: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            name: name.into(),
            email: email.into(),
            bio: None,
            location: None,
            profile_picture: None,
            cover_picture: None,
            public_key: public_key.into(),
            created_at: now_rfc3339(),
            friends: BTreeSet::new(),
            friend_requests: BTreeSet::new(),
        }
    }

    /// The lightweight projection shown in friend and request lists.
    pub fn profile_view(&self) -> ProfileView {
        ProfileView {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            profile_picture: self.profile_picture.clone(),
        }
    }
}

/// Lightweight user projection returned by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileView {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
}

/// Orders profile views by name, then id, so list output is stable.
pub fn sort_profiles(profiles: &mut [ProfileView]) {
    profiles.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
}

/// A post authored by a user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// UUIDv7 identifier. Ids sort in creation order.
    pub id: String,

    /// Id of the authoring user.
    pub author: String,

    pub text: String,

    /// Optional image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Ids of users who liked this post.
    #[serde(default)]
    pub likes: BTreeSet<String>,

    pub created_at: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Post {
    pub fn new(author: impl Into<String>, text: impl Into<String>, image: Option<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            author: author.into(),
            text: text.into(),
            image,
            likes: BTreeSet::new(),
            created_at: now_rfc3339(),
            updated_at: None,
        }
    }
}

/// A comment on a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,

    /// Id of the post this comment belongs to.
    pub post: String,

    pub author: String,

    pub text: String,

    #[serde(default)]
    pub likes: BTreeSet<String>,

    pub created_at: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Comment {
    pub fn new(post: impl Into<String>, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            post: post.into(),
            author: author.into(),
            text: text.into(),
            likes: BTreeSet::new(),
            created_at: now_rfc3339(),
            updated_at: None,
        }
    }
}

/// Current UTC time as an RFC 3339 string with second precision.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
