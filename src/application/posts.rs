//! Single-post view and the post/comment write actions.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::repos::{
    CommentsRepo, CommentsWriteRepo, CreateCommentParams, CreatePostParams, GroupsRepo, PostScope,
    PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::application::viewer::{Unauthorized, Viewer};
use crate::domain::entities::{CommentRecord, PostRecord};
use crate::domain::error::{DomainError, require_text};

#[derive(Debug, Error)]
pub enum PostActionError {
    #[error(transparent)]
    Unauthorized(#[from] Unauthorized),
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("only the author may edit post {post_id}")]
    Forbidden { post_id: Uuid },
    #[error(transparent)]
    Invalid(#[from] DomainError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Fields submitted when writing a post. Blank optional fields mean "none".
#[derive(Debug, Clone, Default)]
pub struct PostDraft {
    pub text: String,
    pub group_slug: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    pub post: PostRecord,
    pub comments: Vec<CommentRecord>,
    pub author_post_count: u64,
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostsRepo>,
    posts_write: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    comments: Arc<dyn CommentsRepo>,
    comments_write: Arc<dyn CommentsWriteRepo>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        posts_write: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        comments: Arc<dyn CommentsRepo>,
        comments_write: Arc<dyn CommentsWriteRepo>,
    ) -> Self {
        Self {
            posts,
            posts_write,
            groups,
            comments,
            comments_write,
        }
    }

    pub async fn detail(&self, post_id: Uuid) -> Result<PostDetail, PostActionError> {
        let post = self.load_post(post_id).await?;
        let comments = self.comments.list_comments(post_id).await?;
        let author_post_count = self
            .posts
            .count_posts(PostScope::Author(post.author.id))
            .await?;

        Ok(PostDetail {
            post,
            comments,
            author_post_count,
        })
    }

    pub async fn create(
        &self,
        viewer: Viewer,
        draft: PostDraft,
    ) -> Result<PostRecord, PostActionError> {
        let author_id = viewer.require_authenticated()?;
        let text = require_text("text", &draft.text)?;
        let group_id = self.resolve_group(draft.group_slug.as_deref()).await?;

        let post = self
            .posts_write
            .create_post(CreatePostParams {
                author_id,
                text,
                image: normalize_optional(draft.image.as_deref()),
                group_id,
            })
            .await?;

        info!(
            target = "tidings::posts",
            post_id = %post.id,
            author_id = %author_id,
            group_id = ?group_id,
            "post created"
        );
        Ok(post)
    }

    /// Edit a post. A viewer who is not the author gets `Forbidden` and the
    /// post is left untouched.
    pub async fn edit(
        &self,
        viewer: Viewer,
        post_id: Uuid,
        draft: PostDraft,
    ) -> Result<PostRecord, PostActionError> {
        let editor = viewer.require_authenticated()?;
        let existing = self.load_post(post_id).await?;

        if !existing.is_authored_by(editor) {
            warn!(
                target = "tidings::posts",
                post_id = %post_id,
                editor = %editor,
                "edit refused for non-author"
            );
            return Err(PostActionError::Forbidden { post_id });
        }

        let text = require_text("text", &draft.text)?;
        let group_id = self.resolve_group(draft.group_slug.as_deref()).await?;

        let post = self
            .posts_write
            .update_post(UpdatePostParams {
                id: post_id,
                text,
                image: normalize_optional(draft.image.as_deref()),
                group_id,
            })
            .await?;

        info!(target = "tidings::posts", post_id = %post_id, "post edited");
        Ok(post)
    }

    /// Add a comment. Blank text is ignored and yields `None`.
    pub async fn add_comment(
        &self,
        viewer: Viewer,
        post_id: Uuid,
        text: &str,
    ) -> Result<Option<CommentRecord>, PostActionError> {
        let author_id = viewer.require_authenticated()?;
        self.load_post(post_id).await?;

        let Ok(text) = require_text("text", text) else {
            return Ok(None);
        };

        let comment = self
            .comments_write
            .create_comment(CreateCommentParams {
                post_id,
                author_id,
                text,
            })
            .await?;

        info!(
            target = "tidings::posts",
            post_id = %post_id,
            comment_id = %comment.id,
            "comment added"
        );
        Ok(Some(comment))
    }

    async fn load_post(&self, post_id: Uuid) -> Result<PostRecord, PostActionError> {
        self.posts
            .find_post(post_id)
            .await?
            .ok_or(PostActionError::NotFound { entity: "post" })
    }

    async fn resolve_group(&self, slug: Option<&str>) -> Result<Option<Uuid>, PostActionError> {
        let Some(slug) = normalize_optional(slug) else {
            return Ok(None);
        };
        let group = self
            .groups
            .find_group_by_slug(&slug)
            .await?
            .ok_or(PostActionError::NotFound { entity: "group" })?;
        Ok(Some(group.id))
    }
}

fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
