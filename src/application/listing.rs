//! Listing selection: which posts a timeline shows, in what order, and which page.

use std::{num::NonZeroUsize, sync::Arc};

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::application::pagination::{
    DEFAULT_NAVIGATION_HALF_WIDTH, Page, PaginationError, Paginator, RequestedPage,
};
use crate::application::repos::{
    FollowsRepo, GroupsRepo, PostScope, PostWindow, PostsRepo, RepoError, UsersRepo,
};
use crate::application::viewer::{Unauthorized, Viewer};
use crate::cache::{Fingerprint, ViewKind, ViewerVariant};
use crate::domain::entities::{GroupRecord, PostRecord, UserRecord};

const DEFAULT_PAGE_SIZE: NonZeroUsize = NonZeroUsize::MIN.saturating_add(9);

/// The timeline being requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingKind {
    Global,
    /// Group timeline, addressed by group slug.
    ByGroup(String),
    /// Author timeline, addressed by username.
    ByAuthor(String),
    /// Posts by authors the viewer follows.
    FollowFeed,
}

impl ListingKind {
    pub fn view_kind(&self) -> ViewKind {
        match self {
            ListingKind::Global => ViewKind::Global,
            ListingKind::ByGroup(_) => ViewKind::Group,
            ListingKind::ByAuthor(_) => ViewKind::Author,
            ListingKind::FollowFeed => ViewKind::FollowFeed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingContext {
    pub kind: ListingKind,
    pub page: RequestedPage,
    pub viewer: Viewer,
}

impl ListingContext {
    pub fn new(kind: ListingKind, page: RequestedPage, viewer: Viewer) -> Self {
        Self { kind, page, viewer }
    }

    /// Fingerprint for cache-eligible listings; `None` for everything else.
    ///
    /// Only the global timeline is eligible. Its render carries no
    /// viewer-specific fields, so `variant` only partitions entries when the
    /// deployment asks for it.
    pub fn fingerprint(&self, variant: ViewerVariant) -> Option<Fingerprint> {
        match self.kind {
            ListingKind::Global => {
                Some(Fingerprint::new(ViewKind::Global, "global", self.page).with_variant(variant))
            }
            _ => None,
        }
    }
}

/// Page sizes per timeline plus the navigation half-width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingLimits {
    pub global_page_size: NonZeroUsize,
    pub group_page_size: NonZeroUsize,
    pub author_page_size: NonZeroUsize,
    pub navigation_half_width: usize,
}

impl Default for ListingLimits {
    fn default() -> Self {
        Self {
            global_page_size: DEFAULT_PAGE_SIZE,
            group_page_size: DEFAULT_PAGE_SIZE,
            author_page_size: DEFAULT_PAGE_SIZE,
            navigation_half_width: DEFAULT_NAVIGATION_HALF_WIDTH,
        }
    }
}

impl From<&crate::config::ListingSettings> for ListingLimits {
    fn from(settings: &crate::config::ListingSettings) -> Self {
        Self {
            global_page_size: settings.global_page_size,
            group_page_size: settings.group_page_size,
            author_page_size: settings.author_page_size,
            navigation_half_width: settings.navigation_half_width.get(),
        }
    }
}

impl ListingLimits {
    fn paginator(&self, kind: &ListingKind) -> Paginator {
        let page_size = match kind {
            ListingKind::Global | ListingKind::FollowFeed => self.global_page_size,
            ListingKind::ByGroup(_) => self.group_page_size,
            ListingKind::ByAuthor(_) => self.author_page_size,
        };
        Paginator::new(page_size, self.navigation_half_width)
    }
}

/// Context rendered alongside a page of posts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ListingMeta {
    Global,
    Group {
        group: GroupRecord,
    },
    Author {
        author: UserRecord,
        author_post_count: u64,
        following: bool,
    },
    FollowFeed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPage {
    pub meta: ListingMeta,
    pub page: Page<PostRecord>,
}

#[derive(Debug, Error)]
pub enum ListingError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error(transparent)]
    Unauthorized(#[from] Unauthorized),
    #[error(transparent)]
    InvalidPage(#[from] PaginationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("failed to render listing: {0}")]
    Render(String),
}

#[derive(Clone)]
pub struct ListingService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    limits: ListingLimits,
}

impl ListingService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        limits: ListingLimits,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            limits,
        }
    }

    /// Every post in the listing, newest first, unpaged.
    pub async fn select(&self, context: &ListingContext) -> Result<Vec<PostRecord>, ListingError> {
        let (scope, _) = self.resolve(context).await?;
        Ok(self.posts.list_posts(scope, PostWindow::ALL).await?)
    }

    /// One page of the listing plus the context the view renders around it.
    pub async fn page(&self, context: &ListingContext) -> Result<ListingPage, ListingError> {
        let (scope, meta) = self.resolve(context).await?;
        let paginator = self.limits.paginator(&context.kind);

        let count = match &meta {
            ListingMeta::Author {
                author_post_count, ..
            } => *author_post_count,
            _ => self.posts.count_posts(scope).await?,
        };
        let total = usize::try_from(count)
            .map_err(|_| RepoError::from_persistence("post count exceeds supported range"))?;
        let plan = paginator.plan(total, context.page);
        let items = self
            .posts
            .list_posts(scope, PostWindow::new(plan.offset, plan.limit))
            .await?;

        debug!(
            target = "tidings::listing",
            view = context.kind.view_kind().as_str(),
            requested = context.page.get(),
            resolved = plan.number,
            total,
            "listing page resolved"
        );

        Ok(ListingPage {
            meta,
            page: paginator.assemble(plan, items, total),
        })
    }

    async fn resolve(
        &self,
        context: &ListingContext,
    ) -> Result<(PostScope, ListingMeta), ListingError> {
        match &context.kind {
            ListingKind::Global => Ok((PostScope::All, ListingMeta::Global)),
            ListingKind::ByGroup(slug) => {
                let group = self
                    .groups
                    .find_group_by_slug(slug)
                    .await?
                    .ok_or(ListingError::NotFound { entity: "group" })?;
                Ok((PostScope::Group(group.id), ListingMeta::Group { group }))
            }
            ListingKind::ByAuthor(username) => {
                let author = self
                    .users
                    .find_user_by_username(username)
                    .await?
                    .ok_or(ListingError::NotFound { entity: "author" })?;
                let scope = PostScope::Author(author.id);
                let author_post_count = self.posts.count_posts(scope).await?;
                let following = match context.viewer.user_id() {
                    Some(viewer) if viewer != author.id => {
                        self.follows.is_following(viewer, author.id).await?
                    }
                    _ => false,
                };
                Ok((
                    scope,
                    ListingMeta::Author {
                        author,
                        author_post_count,
                        following,
                    },
                ))
            }
            ListingKind::FollowFeed => {
                let viewer = context.viewer.require_authenticated()?;
                Ok((PostScope::FollowedBy(viewer), ListingMeta::FollowFeed))
            }
        }
    }
}
