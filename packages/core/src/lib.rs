//! Core domain logic for Hearth, a social-networking backend.
//!
//! This crate has no I/O. It provides the types, the friendship state
//! machine, validation, request signing, and text rendering shared by the
//! `hearth-server` node and the `hearth` CLI.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Records: [`User`], [`ProfileView`], [`Post`], [`Comment`] |
//! | [`graph`] | Friendship state machine: [`plan`], [`SocialGraph`], [`GraphError`] |
//! | [`validation`] | Input checks via [`validate_user`], [`validate_post`], [`validate_comment`] |
//! | [`identity`] | Ed25519 keys and HTTP Signature headers |
//! | [`render`] | Plain-text rendering for terminals |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use hearth::{GraphAction, SocialGraph};
//!
//! let mut graph = SocialGraph::new();
//! graph.transition(GraphAction::SendRequest, "alice", "bob", true)?;
//! graph.transition(GraphAction::AcceptRequest, "bob", "alice", true)?;
//! assert!(graph.are_friends("alice", "bob"));
//! ```

pub mod graph;
pub mod identity;
pub mod render;
pub mod types;
pub mod validation;

pub use graph::{
    plan, relationship, FriendRequest, FriendshipEdge, GraphAction, GraphError, GraphOp,
    PairState, Relationship, SocialGraph,
};
pub use identity::{Identity, IdentityError};
pub use types::{Comment, Post, ProfileView, User};
pub use validation::{validate_comment, validate_post, validate_user, ValidationError};
