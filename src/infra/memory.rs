//! Process-local store used when no database URL is configured, and by tests.

use std::{collections::HashMap, sync::RwLock, time::Duration};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    application::repos::{
        CommentsRepo, CommentsWriteRepo, CreateCommentParams, CreatePostParams, FollowsRepo,
        GroupsRepo, HealthRepo, PostScope, PostWindow, PostsRepo, PostsWriteRepo, RepoError,
        UpdatePostParams, UsersRepo,
    },
    cache::lock::{rw_read, rw_write},
    domain::{
        entities::{AuthorRef, CommentRecord, GroupRecord, GroupRef, PostRecord, UserRecord},
        follow::{FollowEdge, FollowGraph},
    },
};

const SOURCE: &str = "infra::memory";

#[derive(Debug, Clone)]
struct StoredPost {
    id: Uuid,
    author_id: Uuid,
    group_id: Option<Uuid>,
    text: String,
    image: Option<String>,
    created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
struct StoredComment {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    text: String,
    created_at: OffsetDateTime,
}

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, UserRecord>,
    groups: HashMap<Uuid, GroupRecord>,
    posts: HashMap<Uuid, StoredPost>,
    comments: HashMap<Uuid, StoredComment>,
    follows: FollowGraph,
    last_stamp: Option<OffsetDateTime>,
}

impl State {
    /// Wall-clock time, nudged forward so successive rows never share a timestamp.
    fn next_stamp(&mut self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + Duration::from_nanos(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn author_ref(&self, id: Uuid) -> Result<AuthorRef, RepoError> {
        self.users
            .get(&id)
            .map(AuthorRef::from)
            .ok_or_else(|| RepoError::Integrity {
                message: format!("user {id} does not exist"),
            })
    }

    fn group_ref(&self, id: Option<Uuid>) -> Result<Option<GroupRef>, RepoError> {
        match id {
            None => Ok(None),
            Some(id) => self
                .groups
                .get(&id)
                .map(|group| Some(GroupRef::from(group)))
                .ok_or_else(|| RepoError::Integrity {
                    message: format!("group {id} does not exist"),
                }),
        }
    }

    fn join_post(&self, post: &StoredPost) -> Result<PostRecord, RepoError> {
        Ok(PostRecord {
            id: post.id,
            text: post.text.clone(),
            image: post.image.clone(),
            created_at: post.created_at,
            author: self.author_ref(post.author_id)?,
            group: self.group_ref(post.group_id)?,
        })
    }

    fn join_comment(&self, comment: &StoredComment) -> Result<CommentRecord, RepoError> {
        Ok(CommentRecord {
            id: comment.id,
            post_id: comment.post_id,
            author: self.author_ref(comment.author_id)?,
            text: comment.text.clone(),
            created_at: comment.created_at,
        })
    }

    /// Posts in scope, newest first with id as the tie-breaker.
    fn scoped_posts(&self, scope: PostScope) -> Vec<&StoredPost> {
        let followed = match scope {
            PostScope::FollowedBy(user) => self.follows.followees(user),
            _ => Vec::new(),
        };

        let mut posts: Vec<&StoredPost> = self
            .posts
            .values()
            .filter(|post| match scope {
                PostScope::All => true,
                PostScope::Group(group) => post.group_id == Some(group),
                PostScope::Author(author) => post.author_id == author,
                PostScope::FollowedBy(_) => followed.contains(&post.author_id),
            })
            .collect();
        posts.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        posts
    }
}

/// All records live behind one lock so follow uniqueness and cascades are atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, username: &str, display_name: Option<&str>) -> UserRecord {
        let user = UserRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: display_name.map(str::to_string),
        };
        rw_write(&self.state, SOURCE, "insert_user")
            .users
            .insert(user.id, user.clone());
        user
    }

    pub fn insert_group(&self, title: &str, slug: &str, description: &str) -> GroupRecord {
        let group = GroupRecord {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
        };
        rw_write(&self.state, SOURCE, "insert_group")
            .groups
            .insert(group.id, group.clone());
        group
    }

    /// Seed a post with an explicit creation time.
    pub fn insert_post_at(
        &self,
        params: CreatePostParams,
        created_at: OffsetDateTime,
    ) -> Result<PostRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "insert_post_at");
        Self::store_post(&mut state, params, created_at)
    }

    /// Delete a post and its comments.
    pub fn delete_post(&self, id: Uuid) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "delete_post");
        if state.posts.remove(&id).is_none() {
            return false;
        }
        state.comments.retain(|_, comment| comment.post_id != id);
        true
    }

    /// Delete a group; its posts survive without a group.
    pub fn delete_group(&self, id: Uuid) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "delete_group");
        if state.groups.remove(&id).is_none() {
            return false;
        }
        for post in state.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        true
    }

    /// Delete a user with their posts, comments and follow edges in both directions.
    pub fn delete_user(&self, id: Uuid) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "delete_user");
        if state.users.remove(&id).is_none() {
            return false;
        }
        state.posts.retain(|_, post| post.author_id != id);
        let State {
            posts, comments, ..
        } = &mut *state;
        comments.retain(|_, comment| {
            comment.author_id != id && posts.contains_key(&comment.post_id)
        });
        state.follows.remove_user(id);
        true
    }

    fn store_post(
        state: &mut State,
        params: CreatePostParams,
        created_at: OffsetDateTime,
    ) -> Result<PostRecord, RepoError> {
        let post = StoredPost {
            id: Uuid::new_v4(),
            author_id: params.author_id,
            group_id: params.group_id,
            text: params.text,
            image: params.image,
            created_at,
        };
        let record = state.join_post(&post)?;
        state.posts.insert(post.id, post);
        Ok(record)
    }
}

#[async_trait]
impl PostsRepo for InMemoryStore {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        let state = rw_read(&self.state, SOURCE, "count_posts");
        Ok(state.scoped_posts(scope).len() as u64)
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        window: PostWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "list_posts");
        let posts = state.scoped_posts(scope);
        let limit = window.limit.unwrap_or(usize::MAX);
        posts
            .into_iter()
            .skip(window.offset)
            .take(limit)
            .map(|post| state.join_post(post))
            .collect()
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "find_post");
        state.posts.get(&id).map(|post| state.join_post(post)).transpose()
    }
}

#[async_trait]
impl PostsWriteRepo for InMemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "create_post");
        let created_at = state.next_stamp();
        Self::store_post(&mut state, params, created_at)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "update_post");
        state.group_ref(params.group_id)?;

        let post = state.posts.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.image = params.image;
        post.group_id = params.group_id;
        let post = post.clone();
        state.join_post(&post)
    }
}

#[async_trait]
impl GroupsRepo for InMemoryStore {
    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "find_group_by_slug");
        Ok(state.groups.values().find(|group| group.slug == slug).cloned())
    }
}

#[async_trait]
impl UsersRepo for InMemoryStore {
    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "find_user_by_username");
        Ok(state
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl FollowsRepo for InMemoryStore {
    async fn follow(&self, follower: Uuid, author: Uuid) -> Result<bool, RepoError> {
        let edge = FollowEdge::new(follower, author).map_err(|err| RepoError::Integrity {
            message: err.to_string(),
        })?;

        let mut state = rw_write(&self.state, SOURCE, "follow");
        state.author_ref(follower)?;
        state.author_ref(author)?;
        Ok(state.follows.insert(edge))
    }

    async fn unfollow(&self, follower: Uuid, author: Uuid) -> Result<bool, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "unfollow");
        Ok(state.follows.remove(follower, author))
    }

    async fn is_following(&self, follower: Uuid, author: Uuid) -> Result<bool, RepoError> {
        let state = rw_read(&self.state, SOURCE, "is_following");
        Ok(state.follows.is_following(follower, author))
    }

    async fn list_followed(&self, follower: Uuid) -> Result<Vec<Uuid>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "list_followed");
        Ok(state.follows.followees(follower))
    }
}

#[async_trait]
impl CommentsRepo for InMemoryStore {
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "list_comments");
        let mut comments: Vec<&StoredComment> = state
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        comments
            .into_iter()
            .map(|comment| state.join_comment(comment))
            .collect()
    }
}

#[async_trait]
impl CommentsWriteRepo for InMemoryStore {
    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut state = rw_write(&self.state, SOURCE, "create_comment");
        if !state.posts.contains_key(&params.post_id) {
            return Err(RepoError::Integrity {
                message: format!("post {} does not exist", params.post_id),
            });
        }
        let comment = StoredComment {
            id: Uuid::new_v4(),
            post_id: params.post_id,
            author_id: params.author_id,
            text: params.text,
            created_at: state.next_stamp(),
        };
        let record = state.join_comment(&comment)?;
        state.comments.insert(comment.id, comment);
        Ok(record)
    }
}

#[async_trait]
impl HealthRepo for InMemoryStore {
    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}
