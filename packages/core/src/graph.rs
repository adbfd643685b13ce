//! The friendship state machine.
//!
//! A friendship is a single [`FriendshipEdge`] whose endpoints are stored in
//! canonical order, so one record represents both directions and the
//! symmetry of friend lists holds by construction. A pending request is a
//! one-directional [`FriendRequest`] from sender to recipient.
//!
//! Every mutation goes through [`plan`]: given a snapshot of the two users'
//! [`PairState`], it either rejects the action with a [`GraphError`] or
//! returns the list of [`GraphOp`]s that carry it out. Storage backends read
//! the snapshot and apply the ops inside one critical section, so a
//! transition is never half-applied.
//!
//! ```text
//!               send(A→B)                 accept(B, A)
//!   (none) ───────────────▶ pending A→B ───────────────▶ friends{A,B}
//!      ▲                        │                             │
//!      │      reject(B, A)      │                             │
//!      ├────────────────────────┘                             │
//!      │                 remove(A, B) / remove(B, A)          │
//!      └──────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A confirmed friendship between two users.
///
/// Endpoints are kept in canonical order (`a < b`), so the same friendship
/// always produces the same edge regardless of who accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FriendshipEdge {
    pub a: String,
    pub b: String,
}

impl FriendshipEdge {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        let (x, y) = (x.into(), y.into());
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    /// The endpoint opposite `id`, or `None` if `id` is not on this edge.
    pub fn other(&self, id: &str) -> Option<&str> {
        if self.a == id {
            Some(&self.b)
        } else if self.b == id {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// A pending request from `sender`, recorded against `recipient`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FriendRequest {
    pub sender: String,
    pub recipient: String,
}

impl FriendRequest {
    pub fn new(sender: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            recipient: recipient.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Actions, snapshot, ops
// ---------------------------------------------------------------------------

/// A state-changing operation performed by an actor on another user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphAction {
    /// Actor asks `other` to become friends.
    SendRequest,
    /// Actor accepts a pending request from `other`.
    AcceptRequest,
    /// Actor declines a pending request from `other`.
    RejectRequest,
    /// Actor ends an existing friendship with `other`.
    RemoveFriend,
}

impl std::fmt::Display for GraphAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphAction::SendRequest => write!(f, "send-request"),
            GraphAction::AcceptRequest => write!(f, "accept-request"),
            GraphAction::RejectRequest => write!(f, "reject-request"),
            GraphAction::RemoveFriend => write!(f, "remove-friend"),
        }
    }
}

/// Everything [`plan`] needs to know about an (actor, other) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairState {
    /// Whether `other` is a registered user.
    pub other_exists: bool,
    /// Whether a friendship edge joins the pair.
    pub friends: bool,
    /// Whether actor has a pending request addressed to `other`.
    pub request_sent: bool,
    /// Whether `other` has a pending request addressed to actor.
    pub request_received: bool,
}

/// A single storage mutation produced by [`plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphOp {
    InsertRequest(FriendRequest),
    DeleteRequest(FriendRequest),
    InsertFriendship(FriendshipEdge),
    DeleteFriendship(FriendshipEdge),
}

/// Reasons a graph action is refused. All are caller-correctable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    /// The referenced user does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A set-membership precondition does not hold.
    #[error("{0}")]
    InvalidOperation(String),

    /// The action would duplicate an existing request or friendship.
    #[error("{0}")]
    Conflict(String),
}

/// How `actor` currently relates to `other`, for display purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// Actor and other are the same user.
    #[serde(rename = "self")]
    Myself,
    None,
    Friends,
    /// Actor has a pending request addressed to other.
    RequestSent,
    /// Other has a pending request addressed to actor.
    RequestReceived,
}

/// Classify a pair snapshot.
pub fn relationship(actor: &str, other: &str, state: &PairState) -> Relationship {
    if actor == other {
        Relationship::Myself
    } else if state.friends {
        Relationship::Friends
    } else if state.request_received {
        Relationship::RequestReceived
    } else if state.request_sent {
        Relationship::RequestSent
    } else {
        Relationship::None
    }
}

/// Decide whether `action` may run and which ops carry it out.
///
/// Checks run in a fixed order: existence, self-targeting, then membership.
/// A rejected action returns no ops, so callers mutate nothing.
pub fn plan(
    action: GraphAction,
    actor: &str,
    other: &str,
    state: &PairState,
) -> Result<Vec<GraphOp>, GraphError> {
    match action {
        GraphAction::SendRequest => {
            if !state.other_exists {
                return Err(GraphError::NotFound("User not found".into()));
            }
            if actor == other {
                return Err(GraphError::InvalidOperation(
                    "You cannot send a friend request to yourself".into(),
                ));
            }
            if state.friends {
                return Err(GraphError::Conflict(
                    "You are already friends with this user".into(),
                ));
            }
            if state.request_sent {
                return Err(GraphError::Conflict("Friend request already sent".into()));
            }
            Ok(vec![GraphOp::InsertRequest(FriendRequest::new(actor, other))])
        }

        GraphAction::AcceptRequest => {
            if !state.other_exists {
                return Err(GraphError::NotFound("User not found".into()));
            }
            if actor == other || !state.request_received {
                return Err(GraphError::InvalidOperation(
                    "No friend request from this user".into(),
                ));
            }
            let mut ops = vec![
                GraphOp::DeleteRequest(FriendRequest::new(other, actor)),
                GraphOp::InsertFriendship(FriendshipEdge::new(actor, other)),
            ];
            // A crossing request in the other direction is resolved too.
            if state.request_sent {
                ops.push(GraphOp::DeleteRequest(FriendRequest::new(actor, other)));
            }
            Ok(ops)
        }

        GraphAction::RejectRequest => {
            if actor == other || !state.request_received {
                return Err(GraphError::InvalidOperation(
                    "No friend request from this user".into(),
                ));
            }
            Ok(vec![GraphOp::DeleteRequest(FriendRequest::new(other, actor))])
        }

        GraphAction::RemoveFriend => {
            if !state.other_exists {
                return Err(GraphError::NotFound("User not found".into()));
            }
            if actor == other || !state.friends {
                return Err(GraphError::InvalidOperation(
                    "This user is not your friend".into(),
                ));
            }
            Ok(vec![GraphOp::DeleteFriendship(FriendshipEdge::new(actor, other))])
        }
    }
}

// ---------------------------------------------------------------------------
// SocialGraph
// ---------------------------------------------------------------------------

/// An in-memory set of friendship edges and pending requests.
///
/// This is the reference model for the state machine: the in-memory store
/// keeps one of these behind its lock, and tests use it to check invariants
/// over arbitrary action sequences. User existence lives elsewhere, so
/// callers pass `other_exists` explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialGraph {
    friendships: BTreeSet<FriendshipEdge>,
    requests: BTreeSet<FriendRequest>,
}

impl SocialGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the pair for [`plan`].
    pub fn pair_state(&self, actor: &str, other: &str, other_exists: bool) -> PairState {
        PairState {
            other_exists,
            friends: self.are_friends(actor, other),
            request_sent: self.has_request(actor, other),
            request_received: self.has_request(other, actor),
        }
    }

    /// Plan `action` against the current state and apply it.
    ///
    /// Returns the ops that were applied. On error the graph is unchanged.
    pub fn transition(
        &mut self,
        action: GraphAction,
        actor: &str,
        other: &str,
        other_exists: bool,
    ) -> Result<Vec<GraphOp>, GraphError> {
        let state = self.pair_state(actor, other, other_exists);
        let ops = plan(action, actor, other, &state)?;
        self.apply(&ops);
        Ok(ops)
    }

    pub fn apply(&mut self, ops: &[GraphOp]) {
        for op in ops {
            match op {
                GraphOp::InsertRequest(r) => {
                    self.requests.insert(r.clone());
                }
                GraphOp::DeleteRequest(r) => {
                    self.requests.remove(r);
                }
                GraphOp::InsertFriendship(e) => {
                    self.friendships.insert(e.clone());
                }
                GraphOp::DeleteFriendship(e) => {
                    self.friendships.remove(e);
                }
            }
        }
    }

    pub fn are_friends(&self, x: &str, y: &str) -> bool {
        self.friendships.contains(&FriendshipEdge::new(x, y))
    }

    /// Whether `sender` has a pending request addressed to `recipient`.
    pub fn has_request(&self, sender: &str, recipient: &str) -> bool {
        self.requests.contains(&FriendRequest::new(sender, recipient))
    }

    /// Ids of `id`'s friends, ascending.
    pub fn friends_of(&self, id: &str) -> BTreeSet<String> {
        self.friendships
            .iter()
            .filter_map(|e| e.other(id))
            .map(str::to_string)
            .collect()
    }

    /// Ids of users with a pending request addressed to `id`, ascending.
    pub fn requests_for(&self, id: &str) -> BTreeSet<String> {
        self.requests
            .iter()
            .filter(|r| r.recipient == id)
            .map(|r| r.sender.clone())
            .collect()
    }

    pub fn friendship_count(&self) -> usize {
        self.friendships.len()
    }

    pub fn request_count(&self) -> usize {
        self.requests.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const A: &str = "019526b2-f68a-7c3e-a0b4-00000000000a";
    const B: &str = "019526b2-f68a-7c3e-a0b4-00000000000b";
    const C: &str = "019526b2-f68a-7c3e-a0b4-00000000000c";

    fn friends(g: &mut SocialGraph, x: &str, y: &str) {
        g.transition(GraphAction::SendRequest, x, y, true).unwrap();
        g.transition(GraphAction::AcceptRequest, y, x, true).unwrap();
    }

    #[test]
    fn edge_is_canonical() {
        assert_eq!(FriendshipEdge::new(B, A), FriendshipEdge::new(A, B));
        let e = FriendshipEdge::new(B, A);
        assert_eq!(e.a, A);
        assert_eq!(e.other(A), Some(B));
        assert_eq!(e.other(C), None);
    }

    #[test]
    fn send_request_records_on_recipient_only() {
        let mut g = SocialGraph::new();
        g.transition(GraphAction::SendRequest, A, B, true).unwrap();
        assert_eq!(g.requests_for(B), BTreeSet::from([A.to_string()]));
        assert!(g.requests_for(A).is_empty());
        assert!(g.friends_of(A).is_empty());
        assert!(g.friends_of(B).is_empty());
    }

    #[test]
    fn accept_creates_symmetric_friendship_and_consumes_request() {
        let mut g = SocialGraph::new();
        g.transition(GraphAction::SendRequest, A, B, true).unwrap();
        g.transition(GraphAction::AcceptRequest, B, A, true).unwrap();
        assert!(g.friends_of(A).contains(B));
        assert!(g.friends_of(B).contains(A));
        assert!(g.requests_for(B).is_empty());
    }

    #[test]
    fn duplicate_request_conflicts_and_keeps_single_entry() {
        let mut g = SocialGraph::new();
        g.transition(GraphAction::SendRequest, A, B, true).unwrap();
        let err = g.transition(GraphAction::SendRequest, A, B, true).unwrap_err();
        assert!(matches!(err, GraphError::Conflict(_)));
        assert_eq!(g.request_count(), 1);
    }

    #[test]
    fn request_to_friend_conflicts() {
        let mut g = SocialGraph::new();
        friends(&mut g, A, B);
        let err = g.transition(GraphAction::SendRequest, B, A, true).unwrap_err();
        assert_eq!(
            err,
            GraphError::Conflict("You are already friends with this user".into())
        );
    }

    #[test]
    fn self_request_is_invalid() {
        let mut g = SocialGraph::new();
        let err = g.transition(GraphAction::SendRequest, A, A, true).unwrap_err();
        assert!(matches!(err, GraphError::InvalidOperation(_)));
        assert_eq!(g, SocialGraph::new());
    }

    #[test]
    fn missing_target_is_not_found_before_other_checks() {
        let state = PairState::default();
        for action in [
            GraphAction::SendRequest,
            GraphAction::AcceptRequest,
            GraphAction::RemoveFriend,
        ] {
            let err = plan(action, A, B, &state).unwrap_err();
            assert!(matches!(err, GraphError::NotFound(_)), "{action}");
        }
    }

    #[test]
    fn reject_without_request_is_invalid_even_for_unknown_user() {
        let err = plan(GraphAction::RejectRequest, A, C, &PairState::default()).unwrap_err();
        assert!(matches!(err, GraphError::InvalidOperation(_)));
    }

    #[test]
    fn reject_only_touches_recipient_side() {
        let mut g = SocialGraph::new();
        g.transition(GraphAction::SendRequest, A, B, true).unwrap();
        g.transition(GraphAction::SendRequest, A, C, true).unwrap();
        g.transition(GraphAction::RejectRequest, B, A, true).unwrap();
        assert!(g.requests_for(B).is_empty());
        assert!(g.has_request(A, C));
        assert!(g.friends_of(A).is_empty());
    }

    #[test]
    fn accept_without_request_is_invalid() {
        let mut g = SocialGraph::new();
        let err = g.transition(GraphAction::AcceptRequest, B, A, true).unwrap_err();
        assert!(matches!(err, GraphError::InvalidOperation(_)));
    }

    #[test]
    fn accept_clears_crossing_requests() {
        let mut g = SocialGraph::new();
        g.transition(GraphAction::SendRequest, A, B, true).unwrap();
        g.transition(GraphAction::SendRequest, B, A, true).unwrap();
        g.transition(GraphAction::AcceptRequest, B, A, true).unwrap();
        assert!(g.are_friends(A, B));
        assert_eq!(g.request_count(), 0);
    }

    #[test]
    fn remove_friend_deletes_both_sides() {
        let mut g = SocialGraph::new();
        friends(&mut g, A, B);
        g.transition(GraphAction::RemoveFriend, A, B, true).unwrap();
        assert!(!g.friends_of(A).contains(B));
        assert!(!g.friends_of(B).contains(A));
        let err = g.transition(GraphAction::RemoveFriend, B, A, true).unwrap_err();
        assert!(matches!(err, GraphError::InvalidOperation(_)));
    }

    #[test]
    fn relationship_classification() {
        let mut g = SocialGraph::new();
        assert_eq!(relationship(A, A, &g.pair_state(A, A, true)), Relationship::Myself);
        assert_eq!(relationship(A, B, &g.pair_state(A, B, true)), Relationship::None);
        g.transition(GraphAction::SendRequest, A, B, true).unwrap();
        assert_eq!(relationship(A, B, &g.pair_state(A, B, true)), Relationship::RequestSent);
        assert_eq!(relationship(B, A, &g.pair_state(B, A, true)), Relationship::RequestReceived);
        g.transition(GraphAction::AcceptRequest, B, A, true).unwrap();
        assert_eq!(relationship(A, B, &g.pair_state(A, B, true)), Relationship::Friends);
    }

    /// Drive random actions over a small population and check the graph
    /// invariants after every step.
    #[test]
    fn invariants_hold_over_random_sequences() {
        let users = [A, B, C, "019526b2-f68a-7c3e-a0b4-00000000000d"];
        let actions = [
            GraphAction::SendRequest,
            GraphAction::AcceptRequest,
            GraphAction::RejectRequest,
            GraphAction::RemoveFriend,
        ];

        for seed in 0..32u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut g = SocialGraph::new();

            for _ in 0..200 {
                let actor = users[rng.gen_range(0..users.len())];
                let other = users[rng.gen_range(0..users.len())];
                let action = actions[rng.gen_range(0..actions.len())];

                let before = g.clone();
                let result = g.transition(action, actor, other, true);
                if result.is_err() {
                    assert_eq!(g, before, "failed {action} mutated the graph");
                }
                if result.is_ok() && matches!(action, GraphAction::AcceptRequest | GraphAction::RejectRequest) {
                    assert!(!g.has_request(other, actor), "request not consumed");
                }

                for x in users {
                    assert!(!g.friends_of(x).contains(x), "self friendship");
                    assert!(!g.requests_for(x).contains(x), "self request");
                    for y in users {
                        assert_eq!(
                            g.friends_of(x).contains(y),
                            g.friends_of(y).contains(x),
                            "asymmetric friendship"
                        );
                        if g.are_friends(x, y) {
                            assert!(!g.has_request(x, y) && !g.has_request(y, x));
                        }
                    }
                }
            }
        }
    }
}
