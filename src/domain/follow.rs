//! Follow relation: the (follower, author) edge and an in-memory adjacency over it.

use std::collections::{BTreeSet, HashMap};

use uuid::Uuid;

use super::error::DomainError;

/// A directed follow edge. Construction rejects self-follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FollowEdge {
    follower: Uuid,
    author: Uuid,
}

impl FollowEdge {
    pub fn new(follower: Uuid, author: Uuid) -> Result<Self, DomainError> {
        if follower == author {
            return Err(DomainError::SelfFollow { user_id: follower });
        }
        Ok(Self { follower, author })
    }

    pub fn follower(&self) -> Uuid {
        self.follower
    }

    pub fn author(&self) -> Uuid {
        self.author
    }
}

/// Adjacency from follower to followed authors.
///
/// Each ordered pair is stored at most once; a self edge can never be inserted
/// because `FollowEdge` cannot represent one.
#[derive(Debug, Default, Clone)]
pub struct FollowGraph {
    following: HashMap<Uuid, BTreeSet<Uuid>>,
}

impl FollowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when the edge did not exist before.
    pub fn insert(&mut self, edge: FollowEdge) -> bool {
        self.following
            .entry(edge.follower)
            .or_default()
            .insert(edge.author)
    }

    /// Returns `true` when an edge was removed.
    pub fn remove(&mut self, follower: Uuid, author: Uuid) -> bool {
        let Some(authors) = self.following.get_mut(&follower) else {
            return false;
        };
        let removed = authors.remove(&author);
        if authors.is_empty() {
            self.following.remove(&follower);
        }
        removed
    }

    pub fn is_following(&self, follower: Uuid, author: Uuid) -> bool {
        self.following
            .get(&follower)
            .is_some_and(|authors| authors.contains(&author))
    }

    /// Authors followed by `follower`, in a stable order.
    pub fn followees(&self, follower: Uuid) -> Vec<Uuid> {
        self.following
            .get(&follower)
            .map(|authors| authors.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop every edge touching `user`, in either direction.
    pub fn remove_user(&mut self, user: Uuid) {
        self.following.remove(&user);
        self.following.retain(|_, authors| {
            authors.remove(&user);
            !authors.is_empty()
        });
    }

    pub fn edge_count(&self) -> usize {
        self.following.values().map(BTreeSet::len).sum()
    }
}
