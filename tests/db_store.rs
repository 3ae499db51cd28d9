use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tidings::application::listing::{ListingContext, ListingKind, ListingLimits, ListingService};
use tidings::application::pagination::RequestedPage;
use tidings::application::repos::{
    CommentsRepo, CommentsWriteRepo, CreateCommentParams, CreatePostParams, FollowsRepo,
    PostScope, PostWindow, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use tidings::application::viewer::Viewer;
use tidings::infra::db::PostgresRepositories;
use time::{OffsetDateTime, macros::datetime};
use uuid::Uuid;

const EPOCH: OffsetDateTime = datetime!(2024-05-01 08:00 UTC);

async fn insert_user(pool: &PgPool, username: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, username) VALUES ($1, $2)")
        .bind(id)
        .bind(username)
        .execute(pool)
        .await
        .expect("insert user");
    id
}

async fn insert_group(pool: &PgPool, title: &str, slug: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO groups (id, title, slug) VALUES ($1, $2, $3)")
        .bind(id)
        .bind(title)
        .bind(slug)
        .execute(pool)
        .await
        .expect("insert group");
    id
}

async fn insert_post_at(
    pool: &PgPool,
    author: Uuid,
    text: &str,
    created_at: OffsetDateTime,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO posts (id, author_id, text, created_at) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(author)
        .bind(text)
        .bind(created_at)
        .execute(pool)
        .await
        .expect("insert post");
    id
}

async fn count_rows(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .expect("count rows")
}

fn listings(repos: &Arc<PostgresRepositories>) -> ListingService {
    ListingService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        ListingLimits::default(),
    )
}

fn minutes(n: u64) -> OffsetDateTime {
    EPOCH + Duration::from_secs(n * 60)
}

#[sqlx::test(migrations = "./migrations")]
async fn follow_feed_only_shows_followed_authors(pool: PgPool) {
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    let carol = insert_user(&pool, "carol").await;
    insert_post_at(&pool, alice, "alice 1", minutes(1)).await;
    insert_post_at(&pool, bob, "bob 2", minutes(2)).await;
    insert_post_at(&pool, carol, "carol 3", minutes(3)).await;
    insert_post_at(&pool, bob, "bob 4", minutes(4)).await;

    let repos = Arc::new(PostgresRepositories::new(pool));
    assert!(repos.follow(alice, bob).await.expect("follow"));

    let scope = PostScope::FollowedBy(alice);
    assert_eq!(repos.count_posts(scope).await.expect("count"), 2);

    let listing = listings(&repos)
        .page(&ListingContext::new(
            ListingKind::FollowFeed,
            RequestedPage::FIRST,
            Viewer::Authenticated(alice),
        ))
        .await
        .expect("follow feed");
    let texts: Vec<&str> = listing
        .page
        .items
        .iter()
        .map(|post| post.text.as_str())
        .collect();
    assert_eq!(texts, vec!["bob 4", "bob 2"]);
    assert!(listing.page.items.iter().all(|post| post.author.id == bob));

    let carol_feed = repos
        .list_posts(PostScope::FollowedBy(carol), PostWindow::ALL)
        .await
        .expect("empty feed");
    assert!(carol_feed.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
async fn following_twice_keeps_a_single_edge(pool: PgPool) {
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    let repos = PostgresRepositories::new(pool.clone());

    assert!(repos.follow(alice, bob).await.expect("first follow"));
    assert!(!repos.follow(alice, bob).await.expect("second follow"));

    assert_eq!(count_rows(&pool, "follows").await, 1);
    assert_eq!(repos.list_followed(alice).await.expect("list"), vec![bob]);
    assert!(repos.is_following(alice, bob).await.expect("is following"));
    assert!(!repos.is_following(bob, alice).await.expect("reverse"));

    assert!(repos.unfollow(alice, bob).await.expect("unfollow"));
    assert!(!repos.unfollow(alice, bob).await.expect("unfollow again"));
    assert_eq!(count_rows(&pool, "follows").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn self_follow_is_rejected_by_the_table(pool: PgPool) {
    let alice = insert_user(&pool, "alice").await;
    let repos = PostgresRepositories::new(pool.clone());

    let result = repos.follow(alice, alice).await;
    assert!(matches!(result, Err(RepoError::Integrity { .. })));

    let raw = sqlx::query("INSERT INTO follows (user_id, author_id) VALUES ($1, $1)")
        .bind(alice)
        .execute(&pool)
        .await
        .expect_err("check constraint");
    let constraint = raw
        .as_database_error()
        .and_then(|err| err.constraint())
        .map(str::to_string);
    assert_eq!(constraint.as_deref(), Some("follows_no_self"));
    assert_eq!(count_rows(&pool, "follows").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn global_timeline_third_page_of_twenty_three(pool: PgPool) {
    let alice = insert_user(&pool, "alice").await;
    for minute in 1..=23 {
        insert_post_at(&pool, alice, &format!("post {minute}"), minutes(minute)).await;
    }

    let repos = Arc::new(PostgresRepositories::new(pool));
    let listing = listings(&repos)
        .page(&ListingContext::new(
            ListingKind::Global,
            RequestedPage::new(3),
            Viewer::Anonymous,
        ))
        .await
        .expect("page");

    assert_eq!(listing.page.total, 23);
    assert_eq!(listing.page.number, 3);
    assert_eq!(listing.page.last_page, 3);
    assert_eq!(listing.page.window, vec![1, 2, 3]);
    let texts: Vec<&str> = listing
        .page
        .items
        .iter()
        .map(|post| post.text.as_str())
        .collect();
    assert_eq!(texts, vec!["post 3", "post 2", "post 1"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn equal_timestamps_fall_back_to_id_order(pool: PgPool) {
    let alice = insert_user(&pool, "alice").await;
    let first = insert_post_at(&pool, alice, "a", minutes(5)).await;
    let second = insert_post_at(&pool, alice, "b", minutes(5)).await;

    let repos = PostgresRepositories::new(pool);
    let posts = repos
        .list_posts(PostScope::All, PostWindow::ALL)
        .await
        .expect("list");

    let mut expected = vec![first, second];
    expected.sort_by(|a, b| b.cmp(a));
    let ids: Vec<Uuid> = posts.iter().map(|post| post.id).collect();
    assert_eq!(ids, expected);

    let paged = repos
        .list_posts(PostScope::All, PostWindow::new(1, 1))
        .await
        .expect("window");
    assert_eq!(paged.len(), 1);
    assert_eq!(paged[0].id, expected[1]);
}

#[sqlx::test(migrations = "./migrations")]
async fn writes_return_joined_records_and_keep_created_at(pool: PgPool) {
    let alice = insert_user(&pool, "alice").await;
    let rust = insert_group(&pool, "Rust", "rust").await;
    let repos = PostgresRepositories::new(pool);

    let created = repos
        .create_post(CreatePostParams {
            author_id: alice,
            text: "hello".into(),
            image: None,
            group_id: Some(rust),
        })
        .await
        .expect("create");
    assert_eq!(created.author.username, "alice");
    assert_eq!(created.group.as_ref().map(|group| group.slug.as_str()), Some("rust"));

    let updated = repos
        .update_post(UpdatePostParams {
            id: created.id,
            text: "edited".into(),
            image: Some("cat.png".into()),
            group_id: None,
        })
        .await
        .expect("update");
    assert_eq!(updated.text, "edited");
    assert_eq!(updated.group, None);
    assert_eq!(updated.created_at, created.created_at);

    let missing = repos
        .update_post(UpdatePostParams {
            id: Uuid::new_v4(),
            text: "ghost".into(),
            image: None,
            group_id: None,
        })
        .await;
    assert!(matches!(missing, Err(RepoError::NotFound)));
}

#[sqlx::test(migrations = "./migrations")]
async fn deletes_cascade_or_detach(pool: PgPool) {
    let alice = insert_user(&pool, "alice").await;
    let bob = insert_user(&pool, "bob").await;
    let rust = insert_group(&pool, "Rust", "rust").await;
    let repos = PostgresRepositories::new(pool.clone());

    let grouped = repos
        .create_post(CreatePostParams {
            author_id: alice,
            text: "grouped".into(),
            image: None,
            group_id: Some(rust),
        })
        .await
        .expect("create grouped");
    let commented = repos
        .create_post(CreatePostParams {
            author_id: alice,
            text: "commented".into(),
            image: None,
            group_id: None,
        })
        .await
        .expect("create commented");
    repos
        .create_comment(CreateCommentParams {
            post_id: commented.id,
            author_id: bob,
            text: "nice".into(),
        })
        .await
        .expect("comment");
    repos.follow(bob, alice).await.expect("follow");

    // Group deletion detaches posts.
    sqlx::query("DELETE FROM groups WHERE id = $1")
        .bind(rust)
        .execute(&pool)
        .await
        .expect("delete group");
    let detached = repos
        .find_post(grouped.id)
        .await
        .expect("find")
        .expect("post survives");
    assert_eq!(detached.group, None);

    // Post deletion drops its comments.
    sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(commented.id)
        .execute(&pool)
        .await
        .expect("delete post");
    assert!(
        repos
            .list_comments(commented.id)
            .await
            .expect("comments")
            .is_empty()
    );

    // User deletion drops their posts and every follow edge touching them.
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(alice)
        .execute(&pool)
        .await
        .expect("delete user");
    assert!(repos.find_post(grouped.id).await.expect("find").is_none());
    assert_eq!(count_rows(&pool, "posts").await, 0);
    assert_eq!(count_rows(&pool, "follows").await, 0);
}
