//! Follow and unfollow actions.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::application::repos::{FollowsRepo, RepoError, UsersRepo};
use crate::application::viewer::{Unauthorized, Viewer};
use crate::domain::entities::UserRecord;
use crate::domain::follow::FollowEdge;

#[derive(Debug, Error)]
pub enum FollowError {
    #[error(transparent)]
    Unauthorized(#[from] Unauthorized),
    #[error("author not found")]
    AuthorNotFound,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// What a follow action did. Both no-op outcomes are successes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    SelfFollowIgnored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Removed,
    NotFollowing,
}

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
}

impl FollowService {
    pub fn new(users: Arc<dyn UsersRepo>, follows: Arc<dyn FollowsRepo>) -> Self {
        Self { users, follows }
    }

    pub async fn follow(
        &self,
        viewer: Viewer,
        username: &str,
    ) -> Result<FollowOutcome, FollowError> {
        let follower = viewer.require_authenticated()?;
        let author = self.author(username).await?;

        let Ok(edge) = FollowEdge::new(follower, author.id) else {
            debug!(target = "tidings::follow", user_id = %follower, "self-follow ignored");
            return Ok(FollowOutcome::SelfFollowIgnored);
        };

        let created = self.follows.follow(edge.follower(), edge.author()).await?;
        if created {
            info!(
                target = "tidings::follow",
                follower = %follower,
                author = %author.id,
                "follow edge created"
            );
            Ok(FollowOutcome::Created)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    pub async fn unfollow(
        &self,
        viewer: Viewer,
        username: &str,
    ) -> Result<UnfollowOutcome, FollowError> {
        let follower = viewer.require_authenticated()?;
        let author = self.author(username).await?;

        if self.follows.unfollow(follower, author.id).await? {
            info!(
                target = "tidings::follow",
                follower = %follower,
                author = %author.id,
                "follow edge removed"
            );
            Ok(UnfollowOutcome::Removed)
        } else {
            Ok(UnfollowOutcome::NotFollowing)
        }
    }

    async fn author(&self, username: &str) -> Result<UserRecord, FollowError> {
        self.users
            .find_user_by_username(username)
            .await?
            .ok_or(FollowError::AuthorNotFound)
    }
}
