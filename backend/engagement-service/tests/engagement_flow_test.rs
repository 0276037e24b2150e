//! Integration tests: engagement flows against a real database
//!
//! Coverage:
//! - View counting vs watch-history independence
//! - Like/subscription toggle semantics
//! - Channel profile with zero videos
//! - Cascade delete of a video's likes, views and comments, including
//!   rollback when a cascade step fails partway
//! - Playlist duplicate membership conflict
//! - Pagination windowing
//!
//! Requires TEST_DATABASE_URL pointing at a PostgreSQL instance; each test
//! skips cleanly when it is unset so the suite can run without infra.

use std::str::FromStr;
use std::sync::Arc;

use engagement_service::domain::LikeTarget;
use engagement_service::error::AppError;
use engagement_service::services::{
    ChannelService, CommentService, DashboardService, EngagementService, EventPublisher,
    PlaylistService, PostService, VideoService, WatchHistoryService,
};
use engagement_service::storage::NoopStorage;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

async fn test_pool() -> Option<PgPool> {
    let url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) if !url.trim().is_empty() => url,
        _ => {
            eprintln!("TEST_DATABASE_URL not set; skipping integration test");
            return None;
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect to test database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    Some(pool)
}

async fn create_user(pool: &PgPool, prefix: &str) -> Uuid {
    let suffix = Uuid::new_v4().simple().to_string();
    let username = format!("{}_{}", prefix, &suffix[..12]);
    sqlx::query_scalar(
        r#"
        INSERT INTO users (username, email, full_name)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(&username)
    .bind(format!("{}@test.local", username))
    .bind(format!("Test {}", prefix))
    .fetch_one(pool)
    .await
    .expect("failed to create test user")
}

async fn create_video(pool: &PgPool, owner_id: Uuid, title: &str) -> Uuid {
    sqlx::query_scalar(
        r#"
        INSERT INTO videos (owner_id, video_url, thumbnail_url, title, description, duration)
        VALUES ($1, 'https://cdn.test/v.mp4', 'https://cdn.test/t.jpg', $2,
                'a description long enough', 120.0)
        RETURNING id
        "#,
    )
    .bind(owner_id)
    .bind(title)
    .fetch_one(pool)
    .await
    .expect("failed to create test video")
}

fn video_service(pool: &PgPool) -> VideoService {
    VideoService::new(pool.clone(), Arc::new(NoopStorage))
}

fn engagement_service(pool: &PgPool) -> EngagementService {
    EngagementService::new(pool.clone(), EventPublisher::disabled())
}

async fn count_views(pool: &PgPool, video_id: Uuid, viewer_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM views WHERE video_id = $1 AND viewer_id = $2")
        .bind(video_id)
        .bind(viewer_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn count_likes(pool: &PgPool, user_id: Uuid, target_id: Uuid, kind: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM likes WHERE user_id = $1 AND target_id = $2 AND target_kind = $3",
    )
    .bind(user_id)
    .bind(target_id)
    .bind(kind)
    .fetch_one(pool)
    .await
    .unwrap()
}

#[tokio::test]
async fn repeat_video_detail_counts_one_view() {
    let Some(pool) = test_pool().await else { return };
    let videos = video_service(&pool);

    let owner = create_user(&pool, "owner").await;
    let viewer = create_user(&pool, "viewer").await;
    let video = create_video(&pool, owner, "repeat view test").await;

    let first = videos.video_detail(video, viewer).await.unwrap();
    let second = videos.video_detail(video, viewer).await.unwrap();

    // The second call must not create a duplicate view row
    assert_eq!(first.views, 1);
    assert_eq!(second.views, 1);
    assert_eq!(count_views(&pool, video, viewer).await, 1);

    // But watch-history membership is always ensured
    let history = WatchHistoryService::new(pool.clone())
        .watch_history(viewer)
        .await
        .unwrap();
    assert!(history.iter().any(|v| v.id == video));
}

#[tokio::test]
async fn watch_history_removal_is_idempotent_and_keeps_views() {
    let Some(pool) = test_pool().await else { return };
    let videos = video_service(&pool);
    let history = WatchHistoryService::new(pool.clone());

    let owner = create_user(&pool, "owner").await;
    let viewer = create_user(&pool, "viewer").await;
    let video = create_video(&pool, owner, "history removal test").await;

    videos.video_detail(video, viewer).await.unwrap();
    history.remove_from_history(viewer, video).await.unwrap();
    // Removing again is a successful no-op
    history.remove_from_history(viewer, video).await.unwrap();

    assert!(history.watch_history(viewer).await.unwrap().is_empty());
    // The view record survives bookmark removal
    assert_eq!(count_views(&pool, video, viewer).await, 1);
}

#[tokio::test]
async fn like_toggle_flips_and_is_per_user() {
    let Some(pool) = test_pool().await else { return };
    let engagement = engagement_service(&pool);

    let owner = create_user(&pool, "owner").await;
    let user_a = create_user(&pool, "alice").await;
    let user_b = create_user(&pool, "bob").await;
    let video = create_video(&pool, owner, "toggle test").await;

    let added = engagement
        .toggle_like(user_a, LikeTarget::Video, video)
        .await
        .unwrap();
    assert!(added.was_added());

    let removed = engagement
        .toggle_like(user_a, LikeTarget::Video, video)
        .await
        .unwrap();
    assert!(!removed.was_added());
    assert_eq!(count_likes(&pool, user_a, video, "video").await, 0);

    // B's toggle is unaffected by A's history
    let b_added = engagement
        .toggle_like(user_b, LikeTarget::Video, video)
        .await
        .unwrap();
    assert!(b_added.was_added());
    assert_eq!(count_likes(&pool, user_b, video, "video").await, 1);
}

#[tokio::test]
async fn like_toggle_rejects_missing_target() {
    let Some(pool) = test_pool().await else { return };
    let engagement = engagement_service(&pool);
    let user = create_user(&pool, "liker").await;

    let err = engagement
        .toggle_like(user, LikeTarget::Video, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    // Kind parsing is a typed whitelist
    assert!(LikeTarget::from_str("channel").is_err());
}

#[tokio::test]
async fn subscription_toggle_validates_target_channel() {
    let Some(pool) = test_pool().await else { return };
    let engagement = engagement_service(&pool);

    let subscriber = create_user(&pool, "sub").await;
    let channel = create_user(&pool, "chan").await;

    // The target channel, not the caller, is what must exist
    let err = engagement
        .toggle_subscription(subscriber, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let added = engagement
        .toggle_subscription(subscriber, channel)
        .await
        .unwrap();
    assert!(added.was_added());

    // The new subscription shows up as a channel identity card
    let subs = ChannelService::new(pool.clone())
        .subscribed_channels(subscriber)
        .await
        .unwrap();
    assert_eq!(subs.total, 1);
    assert_eq!(subs.channels[0].id, channel);
    assert!(!subs.channels[0].username.is_empty());

    let removed = engagement
        .toggle_subscription(subscriber, channel)
        .await
        .unwrap();
    assert!(!removed.was_added());
}

#[tokio::test]
async fn empty_channel_profile_reports_zero_counts() {
    let Some(pool) = test_pool().await else { return };
    let channels = ChannelService::new(pool.clone());

    let viewer = create_user(&pool, "viewer").await;
    let channel = create_user(&pool, "empty_chan").await;

    let username: String = sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
        .bind(channel)
        .fetch_one(&pool)
        .await
        .unwrap();

    let profile = channels.channel_profile(&username, viewer).await.unwrap();
    assert_eq!(profile.total_videos, 0);
    assert_eq!(profile.subscribers_count, 0);
    assert!(!profile.is_subscribed);

    let missing = channels.channel_profile("no_such_channel_xyz", viewer).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn video_delete_cascades_to_relations() {
    let Some(pool) = test_pool().await else { return };
    let videos = video_service(&pool);
    let engagement = engagement_service(&pool);
    let comments = CommentService::new(pool.clone());

    let owner = create_user(&pool, "owner").await;
    let fan = create_user(&pool, "fan").await;
    let video = create_video(&pool, owner, "cascade test").await;

    videos.video_detail(video, fan).await.unwrap();
    engagement
        .toggle_like(fan, LikeTarget::Video, video)
        .await
        .unwrap();
    comments.add_comment(video, fan, "nice video").await.unwrap();

    videos.delete_video(owner, video).await.unwrap();

    let likes: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE target_id = $1 AND target_kind = 'video'")
            .bind(video)
            .fetch_one(&pool)
            .await
            .unwrap();
    let views: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM views WHERE video_id = $1")
        .bind(video)
        .fetch_one(&pool)
        .await
        .unwrap();
    let comment_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE video_id = $1")
            .bind(video)
            .fetch_one(&pool)
            .await
            .unwrap();

    assert_eq!(likes, 0);
    assert_eq!(views, 0);
    assert_eq!(comment_count, 0);

    // Only the owner can delete; a stranger's attempt is NotFound
    let other_video = create_video(&pool, owner, "still here").await;
    let err = videos.delete_video(fan, other_video).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn interrupted_video_delete_leaves_no_partial_state() {
    let Some(pool) = test_pool().await else { return };
    let videos = video_service(&pool);
    let engagement = engagement_service(&pool);
    let comments = CommentService::new(pool.clone());

    let owner = create_user(&pool, "owner").await;
    let fan = create_user(&pool, "fan").await;
    let video = create_video(&pool, owner, "interrupted cascade").await;

    videos.video_detail(video, fan).await.unwrap();
    engagement
        .toggle_like(fan, LikeTarget::Video, video)
        .await
        .unwrap();
    comments.add_comment(video, fan, "still here").await.unwrap();

    // Force the comments step of the cascade to fail, for this video only
    sqlx::query(
        r#"
        CREATE OR REPLACE FUNCTION refuse_comment_delete() RETURNS trigger AS $fn$
        BEGIN
            RAISE EXCEPTION 'comment delete refused';
        END;
        $fn$ LANGUAGE plpgsql
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let trigger = format!("refuse_comment_delete_{}", video.simple());
    sqlx::query(&format!(
        "CREATE TRIGGER {} BEFORE DELETE ON comments FOR EACH ROW \
         WHEN (OLD.video_id = '{}') EXECUTE FUNCTION refuse_comment_delete()",
        trigger, video
    ))
    .execute(&pool)
    .await
    .unwrap();

    let err = videos.delete_video(owner, video).await.unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));

    // The earlier like and view deletions rolled back with the failure
    assert_eq!(count_likes(&pool, fan, video, "video").await, 1);
    assert_eq!(count_views(&pool, video, fan).await, 1);
    let comment_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE video_id = $1")
        .bind(video)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(comment_count, 1);
    let video_survives: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM videos WHERE id = $1)")
            .bind(video)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert!(video_survives);

    sqlx::query(&format!("DROP TRIGGER {} ON comments", trigger))
        .execute(&pool)
        .await
        .unwrap();

    // With the fault gone the same delete completes
    videos.delete_video(owner, video).await.unwrap();
}

#[tokio::test]
async fn post_feed_is_newest_first_and_updates_are_owner_scoped() {
    let Some(pool) = test_pool().await else { return };
    let posts = PostService::new(pool.clone());

    let author = create_user(&pool, "author").await;
    let stranger = create_user(&pool, "stranger").await;

    let older = posts
        .create_post(author, "first lynk", vec![], None)
        .await
        .unwrap();
    let newer = posts
        .create_post(author, "second lynk", vec![], None)
        .await
        .unwrap();

    let feed = posts.feed(Some(1), Some(50)).await.unwrap();
    let idx_older = feed.items.iter().position(|p| p.id == older.id).unwrap();
    let idx_newer = feed.items.iter().position(|p| p.id == newer.id).unwrap();
    assert!(idx_newer < idx_older);

    let fetched = posts.post_by_id(older.id).await.unwrap();
    assert_eq!(fetched.content, "first lynk");
    assert_eq!(fetched.likes, 0);

    let missing = posts.post_by_id(Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    // Content rewrites by anyone but the author are NotFound
    let err = posts
        .update_post(stranger, older.id, "hijacked")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let updated = posts
        .update_post(author, older.id, "first lynk, edited")
        .await
        .unwrap();
    assert_eq!(updated.content, "first lynk, edited");
}

#[tokio::test]
async fn playlist_rejects_duplicate_video() {
    let Some(pool) = test_pool().await else { return };
    let playlists = PlaylistService::new(pool.clone());

    let owner = create_user(&pool, "curator").await;
    let video = create_video(&pool, owner, "playlist test").await;

    let playlist = playlists
        .create_playlist(owner, "favorites", "", "public")
        .await
        .unwrap();

    playlists.add_video(owner, playlist.id, video).await.unwrap();

    let err = playlists
        .add_video(owner, playlist.id, video)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Membership unchanged
    let detail = playlists.playlist_detail(playlist.id).await.unwrap();
    assert_eq!(detail.videos.len(), 1);
}

#[tokio::test]
async fn listing_pages_window_correctly() {
    let Some(pool) = test_pool().await else { return };
    let dashboard = DashboardService::new(pool.clone());

    let owner = create_user(&pool, "paging").await;
    for i in 0..25 {
        create_video(&pool, owner, &format!("paging video {:02}", i)).await;
    }

    // Scoped to this owner so parallel tests cannot skew totals
    let page = dashboard
        .channel_videos(owner, Some(2), Some(10), Some("created_at"), Some("desc"), None)
        .await
        .unwrap();

    assert_eq!(page.items.len(), 10);
    assert_eq!(page.total_items, 25);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.current_page, 2);

    let search = dashboard
        .channel_videos(owner, None, None, None, None, Some("PAGING VIDEO 0"))
        .await
        .unwrap();
    // Case-insensitive substring match: 00..09
    assert_eq!(search.total_items, 10);
}

#[tokio::test]
async fn dashboard_engagement_rate_defined_without_views() {
    let Some(pool) = test_pool().await else { return };
    let dashboard = DashboardService::new(pool.clone());
    let engagement = engagement_service(&pool);
    let comments = CommentService::new(pool.clone());

    let owner = create_user(&pool, "zeroview").await;
    let fan = create_user(&pool, "fan").await;
    let video = create_video(&pool, owner, "never watched").await;

    // Likes and comments without any view rows
    engagement
        .toggle_like(fan, LikeTarget::Video, video)
        .await
        .unwrap();
    comments.add_comment(video, fan, "first!").await.unwrap();

    let report = dashboard.channel_stats(owner).await.unwrap();
    assert_eq!(report.overview.total_views, 0);
    assert!(report.overview.total_likes >= 1);
    assert_eq!(report.overview.engagement_rate, 0.0);
    assert!(!report.overview.engagement_rate.is_nan());
}
