//! JSON shapes handed to the rendering layer.

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::application::{
    listing::{ListingMeta, ListingPage},
    pagination::Page,
    posts::PostDetail,
};
use crate::domain::entities::{
    AuthorRef, CommentRecord, GroupRecord, GroupRef, PostRecord, UserRecord,
};

fn timestamp(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or_else(|_| value.unix_timestamp().to_string())
}

#[derive(Debug, Serialize)]
pub(super) struct PostView {
    id: Uuid,
    text: String,
    image: Option<String>,
    created_at: String,
    author: AuthorRef,
    group: Option<GroupRef>,
}

impl From<PostRecord> for PostView {
    fn from(post: PostRecord) -> Self {
        Self {
            id: post.id,
            text: post.text,
            image: post.image,
            created_at: timestamp(post.created_at),
            author: post.author,
            group: post.group,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct CommentView {
    id: Uuid,
    author: AuthorRef,
    text: String,
    created_at: String,
}

impl From<CommentRecord> for CommentView {
    fn from(comment: CommentRecord) -> Self {
        Self {
            id: comment.id,
            author: comment.author,
            text: comment.text,
            created_at: timestamp(comment.created_at),
        }
    }
}

/// One page of a timeline: the page fields at top level plus the view context.
#[derive(Debug, Serialize)]
pub(super) struct ListingView {
    view: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<GroupRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<UserRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_post_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    following: Option<bool>,
    #[serde(flatten)]
    page: Page<PostView>,
}

impl From<ListingPage> for ListingView {
    fn from(listing: ListingPage) -> Self {
        let page = listing.page.map(PostView::from);
        let mut view = Self {
            view: "global",
            group: None,
            author: None,
            author_post_count: None,
            following: None,
            page,
        };
        match listing.meta {
            ListingMeta::Global => {}
            ListingMeta::Group { group } => {
                view.view = "group";
                view.group = Some(group);
            }
            ListingMeta::Author {
                author,
                author_post_count,
                following,
            } => {
                view.view = "author";
                view.author = Some(author);
                view.author_post_count = Some(author_post_count);
                view.following = Some(following);
            }
            ListingMeta::FollowFeed => view.view = "follow_feed",
        }
        view
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PostDetailView {
    post: PostView,
    comments: Vec<CommentView>,
    author_post_count: u64,
}

impl From<PostDetail> for PostDetailView {
    fn from(detail: PostDetail) -> Self {
        Self {
            post: PostView::from(detail.post),
            comments: detail.comments.into_iter().map(CommentView::from).collect(),
            author_post_count: detail.author_post_count,
        }
    }
}
