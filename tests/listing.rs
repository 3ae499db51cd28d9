//! Listing selection and pagination over the in-memory store.

use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tidings::application::{
    listing::{
        ListingContext, ListingError, ListingKind, ListingLimits, ListingMeta, ListingService,
    },
    pagination::{PaginationError, RequestedPage},
    repos::{
        CreatePostParams, FollowsRepo, PostScope, PostWindow, PostsRepo, RepoError,
    },
    viewer::Viewer,
};
use tidings::domain::entities::{GroupRecord, PostRecord, UserRecord};
use tidings::infra::memory::InMemoryStore;
use time::{OffsetDateTime, macros::datetime};
use uuid::Uuid;

const EPOCH: OffsetDateTime = datetime!(2024-05-01 08:00 UTC);

struct Fixture {
    store: Arc<InMemoryStore>,
    alice: UserRecord,
    bob: UserRecord,
    carol: UserRecord,
    rust: GroupRecord,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let alice = store.insert_user("alice", Some("Alice"));
        let bob = store.insert_user("bob", None);
        let carol = store.insert_user("carol", None);
        let rust = store.insert_group("Rust", "rust", "All things Rust");
        Self {
            store,
            alice,
            bob,
            carol,
            rust,
        }
    }

    /// Seed a post `minutes` after the fixture epoch.
    fn post(&self, author: &UserRecord, minutes: u64, group: Option<&GroupRecord>) -> PostRecord {
        self.store
            .insert_post_at(
                CreatePostParams {
                    author_id: author.id,
                    text: format!("{} at {minutes}", author.username),
                    image: None,
                    group_id: group.map(|group| group.id),
                },
                EPOCH + Duration::from_secs(minutes * 60),
            )
            .expect("seed post")
    }

    fn service(&self) -> ListingService {
        self.service_with(ListingLimits::default())
    }

    fn service_with(&self, limits: ListingLimits) -> ListingService {
        ListingService::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
            limits,
        )
    }
}

fn context(kind: ListingKind, page: usize, viewer: Viewer) -> ListingContext {
    ListingContext::new(kind, RequestedPage::new(page), viewer)
}

fn texts(posts: &[PostRecord]) -> Vec<String> {
    posts.iter().map(|post| post.text.clone()).collect()
}

#[tokio::test]
async fn global_timeline_third_page_holds_the_oldest_posts() {
    let fx = Fixture::new();
    for minute in 1..=23 {
        fx.post(&fx.alice, minute, None);
    }

    let listing = fx
        .service()
        .page(&context(ListingKind::Global, 3, Viewer::Anonymous))
        .await
        .expect("page");

    assert_eq!(listing.meta, ListingMeta::Global);
    let page = listing.page;
    assert_eq!(page.total, 23);
    assert_eq!(page.number, 3);
    assert_eq!(page.last_page, 3);
    assert!(page.has_previous);
    assert!(!page.has_next);
    assert_eq!(page.window, vec![1, 2, 3]);
    assert_eq!(
        texts(&page.items),
        vec!["alice at 3", "alice at 2", "alice at 1"]
    );
}

#[tokio::test]
async fn first_page_is_newest_first() {
    let fx = Fixture::new();
    fx.post(&fx.alice, 1, None);
    fx.post(&fx.bob, 5, None);
    fx.post(&fx.carol, 3, Some(&fx.rust));

    let listing = fx
        .service()
        .page(&context(ListingKind::Global, 1, Viewer::Anonymous))
        .await
        .expect("page");

    assert_eq!(
        texts(&listing.page.items),
        vec!["bob at 5", "carol at 3", "alice at 1"]
    );
    assert!(!listing.page.has_previous);
    assert!(!listing.page.has_next);
}

#[tokio::test]
async fn page_past_the_end_clamps_to_last_page() {
    let fx = Fixture::new();
    for minute in 1..=12 {
        fx.post(&fx.bob, minute, None);
    }

    let listing = fx
        .service()
        .page(&context(ListingKind::Global, 999, Viewer::Anonymous))
        .await
        .expect("page");

    assert_eq!(listing.page.number, 2);
    assert_eq!(listing.page.items.len(), 2);
}

#[tokio::test]
async fn empty_listing_yields_one_empty_page() {
    let fx = Fixture::new();

    let listing = fx
        .service()
        .page(&context(ListingKind::Global, 4, Viewer::Anonymous))
        .await
        .expect("page");

    assert!(listing.page.items.is_empty());
    assert_eq!(listing.page.total, 0);
    assert_eq!(listing.page.number, 1);
    assert_eq!(listing.page.last_page, 1);
    assert_eq!(listing.page.window, vec![1]);
}

#[test]
fn non_numeric_page_tokens_are_rejected() {
    assert_eq!(
        RequestedPage::parse(Some("abc")),
        Err(PaginationError::InvalidPageToken("abc".to_string()))
    );
    assert_eq!(RequestedPage::parse(Some("-4")), Ok(RequestedPage::FIRST));
    assert_eq!(RequestedPage::parse(None), Ok(RequestedPage::FIRST));
}

#[tokio::test]
async fn navigation_window_slides_on_long_listings() {
    let fx = Fixture::new();
    for minute in 1..=30 {
        fx.post(&fx.alice, minute, None);
    }
    let limits = ListingLimits {
        global_page_size: NonZeroUsize::new(2).expect("non-zero"),
        ..ListingLimits::default()
    };

    let listing = fx
        .service_with(limits)
        .page(&context(ListingKind::Global, 8, Viewer::Anonymous))
        .await
        .expect("page");

    assert_eq!(listing.page.last_page, 15);
    assert_eq!(listing.page.window, vec![5, 6, 7, 8, 9, 10, 11]);
}

#[tokio::test]
async fn group_timeline_is_restricted_to_the_group() {
    let fx = Fixture::new();
    fx.post(&fx.alice, 1, Some(&fx.rust));
    fx.post(&fx.bob, 2, None);
    fx.post(&fx.carol, 3, Some(&fx.rust));

    let listing = fx
        .service()
        .page(&context(
            ListingKind::ByGroup("rust".into()),
            1,
            Viewer::Anonymous,
        ))
        .await
        .expect("page");

    assert_eq!(
        listing.meta,
        ListingMeta::Group {
            group: fx.rust.clone()
        }
    );
    assert_eq!(texts(&listing.page.items), vec!["carol at 3", "alice at 1"]);
}

#[tokio::test]
async fn unknown_group_or_author_is_not_found() {
    let fx = Fixture::new();
    let service = fx.service();

    let group = service
        .page(&context(
            ListingKind::ByGroup("nope".into()),
            1,
            Viewer::Anonymous,
        ))
        .await;
    assert!(matches!(
        group,
        Err(ListingError::NotFound { entity: "group" })
    ));

    let author = service
        .page(&context(
            ListingKind::ByAuthor("nobody".into()),
            1,
            Viewer::Anonymous,
        ))
        .await;
    assert!(matches!(
        author,
        Err(ListingError::NotFound { entity: "author" })
    ));
}

#[tokio::test]
async fn author_timeline_reports_count_and_follow_state() {
    let fx = Fixture::new();
    fx.post(&fx.alice, 1, None);
    fx.post(&fx.alice, 2, None);
    fx.post(&fx.bob, 3, None);
    fx.store
        .follow(fx.bob.id, fx.alice.id)
        .await
        .expect("follow");
    let service = fx.service();
    let kind = ListingKind::ByAuthor("alice".into());

    let as_follower = service
        .page(&context(kind.clone(), 1, Viewer::Authenticated(fx.bob.id)))
        .await
        .expect("page");
    assert_eq!(
        as_follower.meta,
        ListingMeta::Author {
            author: fx.alice.clone(),
            author_post_count: 2,
            following: true,
        }
    );
    assert_eq!(
        texts(&as_follower.page.items),
        vec!["alice at 2", "alice at 1"]
    );

    for viewer in [
        Viewer::Anonymous,
        Viewer::Authenticated(fx.alice.id),
        Viewer::Authenticated(fx.carol.id),
    ] {
        let listing = service
            .page(&context(kind.clone(), 1, viewer))
            .await
            .expect("page");
        assert!(matches!(
            listing.meta,
            ListingMeta::Author {
                following: false,
                ..
            }
        ));
    }
}

/// Posts repository that records how many times the listing counts.
struct CountingPosts {
    inner: Arc<InMemoryStore>,
    counts: AtomicUsize,
}

#[async_trait]
impl PostsRepo for CountingPosts {
    async fn count_posts(&self, scope: PostScope) -> Result<u64, RepoError> {
        self.counts.fetch_add(1, Ordering::SeqCst);
        self.inner.count_posts(scope).await
    }

    async fn list_posts(
        &self,
        scope: PostScope,
        window: PostWindow,
    ) -> Result<Vec<PostRecord>, RepoError> {
        self.inner.list_posts(scope, window).await
    }

    async fn find_post(&self, id: Uuid) -> Result<Option<PostRecord>, RepoError> {
        self.inner.find_post(id).await
    }
}

#[tokio::test]
async fn author_timeline_counts_posts_once() {
    let fx = Fixture::new();
    for minute in 1..=12 {
        fx.post(&fx.alice, minute, None);
    }
    fx.post(&fx.bob, 20, None);

    let posts = Arc::new(CountingPosts {
        inner: fx.store.clone(),
        counts: AtomicUsize::new(0),
    });
    let service = ListingService::new(
        posts.clone(),
        fx.store.clone(),
        fx.store.clone(),
        fx.store.clone(),
        ListingLimits::default(),
    );

    let listing = service
        .page(&context(ListingKind::ByAuthor("alice".into()), 2, Viewer::Anonymous))
        .await
        .expect("page");

    assert_eq!(posts.counts.load(Ordering::SeqCst), 1);
    assert_eq!(listing.page.total, 12);
    assert!(matches!(
        listing.meta,
        ListingMeta::Author {
            author_post_count: 12,
            ..
        }
    ));
    assert_eq!(texts(&listing.page.items), vec!["alice at 2", "alice at 1"]);

    service
        .page(&context(ListingKind::Global, 1, Viewer::Anonymous))
        .await
        .expect("global page");
    assert_eq!(posts.counts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn follow_feed_requires_authentication() {
    let fx = Fixture::new();
    let result = fx
        .service()
        .page(&context(ListingKind::FollowFeed, 1, Viewer::Anonymous))
        .await;
    assert!(matches!(result, Err(ListingError::Unauthorized(_))));
}

#[tokio::test]
async fn follow_feed_shows_only_followed_authors() {
    let fx = Fixture::new();
    fx.post(&fx.alice, 1, None);
    fx.post(&fx.bob, 2, None);
    fx.post(&fx.carol, 3, None);
    fx.post(&fx.bob, 4, Some(&fx.rust));
    fx.store
        .follow(fx.alice.id, fx.bob.id)
        .await
        .expect("follow");

    let listing = fx
        .service()
        .page(&context(
            ListingKind::FollowFeed,
            1,
            Viewer::Authenticated(fx.alice.id),
        ))
        .await
        .expect("page");

    assert_eq!(listing.meta, ListingMeta::FollowFeed);
    assert_eq!(texts(&listing.page.items), vec!["bob at 4", "bob at 2"]);
}

#[tokio::test]
async fn follow_feed_is_empty_without_follows() {
    let fx = Fixture::new();
    fx.post(&fx.bob, 1, None);

    let listing = fx
        .service()
        .page(&context(
            ListingKind::FollowFeed,
            1,
            Viewer::Authenticated(fx.carol.id),
        ))
        .await
        .expect("page");

    assert!(listing.page.items.is_empty());
    assert_eq!(listing.page.last_page, 1);
}

#[tokio::test]
async fn select_returns_the_whole_ordered_listing() {
    let fx = Fixture::new();
    for minute in 1..=15 {
        fx.post(&fx.carol, minute, None);
    }

    let all = fx
        .service()
        .select(&context(ListingKind::Global, 1, Viewer::Anonymous))
        .await
        .expect("select");

    assert_eq!(all.len(), 15);
    assert!(
        all.windows(2)
            .all(|pair| pair[0].created_at >= pair[1].created_at)
    );
}
