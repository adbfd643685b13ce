//! Friendship types: `/friends` endpoints.
//!
//! Friend and request lists are returned as
//! [`Envelope<Vec<ProfileView>>`](crate::Envelope); this module only adds the
//! relationship status body.

use hearth::Relationship;
use serde::{Deserialize, Serialize};

/// Response body for `GET /friends/status/{userId}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipResponse {
    /// The other user's id.
    pub user: String,
    pub relationship: Relationship,
}
