//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{CommentRecord, GroupRecord, PostRecord, UserRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Which posts a listing query ranges over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostScope {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts whose author is followed by the given user.
    FollowedBy(Uuid),
}

/// Offset/limit window over an ordered post range. `limit: None` reads to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostWindow {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl PostWindow {
    pub const ALL: Self = Self {
        offset: 0,
        limit: None,
    };

    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub author_id: Uuid,
    pub text: String,
    pub image: Option<String>,
    pub group_id: Option<Uuid>,
}

/// Editable post fields. Edits never touch the creation timestamp.
#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: Uuid,
    pub text: String,
    pub image: Option<String>,
    pub group_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
}

/// Range queries return posts newest-first (`created_at DESC, id DESC`)
/// with author and group joined.
#[async_trait]
pub trait PostsRepo: Send + Sync {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError>;

    async fn list_posts(
        &self,
        scope: PostScope,
        window: PostWindow,
    ) -> Result<Vec<PostRecord>, RepoError>;

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, RepoError>;
}

/// Follow edges. Implementations enforce uniqueness and the no-self-follow
/// check atomically at the storage boundary.
#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Returns `true` when a new edge was created.
    async fn follow(&self, follower: Uuid, author: Uuid) -> Result<bool, RepoError>;

    /// Returns `true` when an edge was removed.
    async fn unfollow(&self, follower: Uuid, author: Uuid) -> Result<bool, RepoError>;

    async fn is_following(&self, follower: Uuid, author: Uuid) -> Result<bool, RepoError>;

    async fn list_followed(&self, follower: Uuid) -> Result<Vec<Uuid>, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments on `post_id`, oldest first.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;
}

#[async_trait]
pub trait CommentsWriteRepo: Send + Sync {
    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;
}

/// Liveness check for the backing store, used by the admin health route.
#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}

/// Every repository a running server needs, implemented by one backing store.
pub trait Store:
    PostsRepo
    + PostsWriteRepo
    + GroupsRepo
    + UsersRepo
    + FollowsRepo
    + CommentsRepo
    + CommentsWriteRepo
    + HealthRepo
{
}

impl<T> Store for T where
    T: PostsRepo
        + PostsWriteRepo
        + GroupsRepo
        + UsersRepo
        + FollowsRepo
        + CommentsRepo
        + CommentsWriteRepo
        + HealthRepo
{
}
