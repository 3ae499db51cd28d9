//! Post, comment and follow actions against the in-memory store.

use std::sync::Arc;

use tidings::application::{
    follow::{FollowError, FollowOutcome, FollowService, UnfollowOutcome},
    posts::{PostActionError, PostDraft, PostService},
    repos::{FollowsRepo, PostsRepo},
    viewer::Viewer,
};
use tidings::domain::{entities::UserRecord, error::DomainError};
use tidings::infra::memory::InMemoryStore;

struct Fixture {
    store: Arc<InMemoryStore>,
    alice: UserRecord,
    bob: UserRecord,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let alice = store.insert_user("alice", None);
        let bob = store.insert_user("bob", None);
        store.insert_group("Rust", "rust", "");
        Self { store, alice, bob }
    }

    fn posts(&self) -> PostService {
        PostService::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
        )
    }

    fn follows(&self) -> FollowService {
        FollowService::new(self.store.clone(), self.store.clone())
    }
}

fn draft(text: &str) -> PostDraft {
    PostDraft {
        text: text.to_string(),
        ..PostDraft::default()
    }
}

#[tokio::test]
async fn anonymous_viewers_cannot_write() {
    let fx = Fixture::new();
    let posts = fx.posts();

    assert!(matches!(
        posts.create(Viewer::Anonymous, draft("hi")).await,
        Err(PostActionError::Unauthorized(_))
    ));
    assert!(matches!(
        fx.follows().follow(Viewer::Anonymous, "bob").await,
        Err(FollowError::Unauthorized(_))
    ));
}

#[tokio::test]
async fn create_trims_text_and_resolves_the_group() {
    let fx = Fixture::new();
    let post = fx
        .posts()
        .create(
            Viewer::Authenticated(fx.alice.id),
            PostDraft {
                text: "  hello world \n".into(),
                group_slug: Some("rust".into()),
                image: Some("   ".into()),
            },
        )
        .await
        .expect("create");

    assert_eq!(post.text, "hello world");
    assert_eq!(post.author.username, "alice");
    assert_eq!(post.group.map(|group| group.slug).as_deref(), Some("rust"));
    assert_eq!(post.image, None);
}

#[tokio::test]
async fn create_rejects_blank_text_and_unknown_groups() {
    let fx = Fixture::new();
    let posts = fx.posts();
    let viewer = Viewer::Authenticated(fx.alice.id);

    assert!(matches!(
        posts.create(viewer, draft("   ")).await,
        Err(PostActionError::Invalid(DomainError::BlankText { field: "text" }))
    ));

    let unknown_group = PostDraft {
        text: "hello".into(),
        group_slug: Some("go".into()),
        image: None,
    };
    assert!(matches!(
        posts.create(viewer, unknown_group).await,
        Err(PostActionError::NotFound { entity: "group" })
    ));
}

#[tokio::test]
async fn only_the_author_may_edit() {
    let fx = Fixture::new();
    let posts = fx.posts();
    let original = posts
        .create(Viewer::Authenticated(fx.alice.id), draft("first"))
        .await
        .expect("create");

    let refused = posts
        .edit(Viewer::Authenticated(fx.bob.id), original.id, draft("hijack"))
        .await;
    assert!(matches!(
        refused,
        Err(PostActionError::Forbidden { post_id }) if post_id == original.id
    ));
    let untouched = fx
        .store
        .find_post(original.id)
        .await
        .expect("lookup")
        .expect("post");
    assert_eq!(untouched.text, "first");

    let edited = posts
        .edit(
            Viewer::Authenticated(fx.alice.id),
            original.id,
            draft("second"),
        )
        .await
        .expect("edit");
    assert_eq!(edited.text, "second");
    assert_eq!(edited.created_at, original.created_at);
}

#[tokio::test]
async fn comments_are_listed_oldest_first_and_blank_ones_ignored() {
    let fx = Fixture::new();
    let posts = fx.posts();
    let post = posts
        .create(Viewer::Authenticated(fx.alice.id), draft("post"))
        .await
        .expect("create");

    posts
        .add_comment(Viewer::Authenticated(fx.bob.id), post.id, "first!")
        .await
        .expect("comment");
    posts
        .add_comment(Viewer::Authenticated(fx.alice.id), post.id, "thanks")
        .await
        .expect("comment");
    let ignored = posts
        .add_comment(Viewer::Authenticated(fx.bob.id), post.id, "  ")
        .await
        .expect("blank comment");
    assert!(ignored.is_none());

    let detail = posts.detail(post.id).await.expect("detail");
    let texts: Vec<&str> = detail
        .comments
        .iter()
        .map(|comment| comment.text.as_str())
        .collect();
    assert_eq!(texts, vec!["first!", "thanks"]);
    assert_eq!(detail.comments[0].author.username, "bob");
    assert_eq!(detail.author_post_count, 1);
}

#[tokio::test]
async fn follow_is_idempotent_and_self_follow_is_a_no_op() {
    let fx = Fixture::new();
    let follows = fx.follows();
    let alice = Viewer::Authenticated(fx.alice.id);

    assert_eq!(
        follows.follow(alice, "bob").await.expect("follow"),
        FollowOutcome::Created
    );
    assert_eq!(
        follows.follow(alice, "bob").await.expect("follow"),
        FollowOutcome::AlreadyFollowing
    );
    assert_eq!(
        follows.follow(alice, "alice").await.expect("follow"),
        FollowOutcome::SelfFollowIgnored
    );
    assert_eq!(
        fx.store.list_followed(fx.alice.id).await.expect("list"),
        vec![fx.bob.id]
    );

    assert_eq!(
        follows.unfollow(alice, "bob").await.expect("unfollow"),
        UnfollowOutcome::Removed
    );
    assert_eq!(
        follows.unfollow(alice, "bob").await.expect("unfollow"),
        UnfollowOutcome::NotFollowing
    );
}

#[tokio::test]
async fn following_an_unknown_author_is_not_found() {
    let fx = Fixture::new();
    let result = fx
        .follows()
        .follow(Viewer::Authenticated(fx.alice.id), "nobody")
        .await;
    assert!(matches!(result, Err(FollowError::AuthorNotFound)));
}
