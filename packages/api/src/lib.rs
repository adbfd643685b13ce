//! Request and response types for the Hearth HTTP API.
//!
//! Every response body is wrapped in an [`Envelope`]. Payloads reuse the
//! record types from the `hearth` core crate.
//!
//! # Endpoints covered
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | GET | `/.well-known/hearth` | → [`ServiceInfo`] |
//! | POST | `/users` | [`RegisterRequest`] → [`hearth::User`] |
//! | GET | `/users` | [`SearchQuery`] → `[ProfileView]` |
//! | GET | `/users/me`, `/users/{id}` | → [`hearth::User`] |
//! | PUT | `/users/{id}` | [`UpdateProfileRequest`] → [`hearth::User`] |
//! | GET | `/friends`, `/friends/requests` | → `[ProfileView]` |
//! | GET | `/friends/status/{userId}` | → [`RelationshipResponse`] |
//! | POST | `/friends/request/{userId}` | → `{}` |
//! | PUT | `/friends/accept/{userId}`, `/friends/reject/{userId}` | → `{}` |
//! | DELETE | `/friends/{userId}` | → `{}` |
//! | GET | `/posts`, `/posts/feed`, `/users/{id}/posts` | [`PostQuery`] → `[Post]` |
//! | POST | `/posts` | [`CreatePostRequest`] → [`hearth::Post`] |
//! | PUT | `/posts/{id}` | [`UpdatePostRequest`] → [`hearth::Post`] |
//! | PUT/DELETE | `/posts/{id}/like` | → [`hearth::Post`] |
//! | GET/POST | `/posts/{id}/comments` | [`CommentRequest`] → [`hearth::Comment`] |
//! | PUT | `/comments/{id}` | [`CommentRequest`] → [`hearth::Comment`] |
//! | PUT/DELETE | `/comments/{id}/like` | → [`hearth::Comment`] |

pub mod envelope;
pub mod friends;
pub mod post;
pub mod service;
pub mod user;

pub use envelope::Envelope;
pub use friends::RelationshipResponse;
pub use post::{CommentRequest, CreatePostRequest, PostQuery, UpdatePostRequest};
pub use service::ServiceInfo;
pub use user::{RegisterRequest, SearchQuery, UpdateProfileRequest};
