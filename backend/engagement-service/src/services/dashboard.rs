//! Channel analytics dashboard
//!
//! Composes independent aggregation queries into one report. Sub-queries
//! are not snapshot-consistent with each other: each observes its own
//! point-in-time view of the store. That trade-off favors freshness over
//! consistency and is intentional; a stronger guarantee would require a
//! combined query per metric family, not locking.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::pagination::{PageParams, Paginated};
use crate::sorting::{SortDirection, VideoSortField};

/// Leaderboard and performance-list length
const TOP_N: i64 = 5;
/// Trend series keep the most recent buckets that actually have data
const TREND_BUCKETS: i64 = 30;

/// Headline counters for the channel
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChannelOverview {
    pub total_videos: i64,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub total_subscribers: i64,
    pub engagement_rate: f64,
    pub average_video_length: f64,
}

/// Per-video row in performance lists and leaderboards
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VideoPerformance {
    pub id: Uuid,
    pub title: String,
    pub thumbnail_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
}

/// One calendar-day (or month) bucket
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TrendPoint {
    pub bucket: NaiveDate,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendSeries {
    pub views: Vec<TrendPoint>,
    pub likes: Vec<TrendPoint>,
    pub comments: Vec<TrendPoint>,
    pub subscribers: Vec<TrendPoint>,
    pub uploads: Vec<TrendPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelDashboard {
    pub overview: ChannelOverview,
    pub top_videos_by_views: Vec<VideoPerformance>,
    pub recent_videos: Vec<VideoPerformance>,
    pub most_liked: Vec<VideoPerformance>,
    pub most_commented: Vec<VideoPerformance>,
    pub trends: TrendSeries,
}

/// Row in the owner's searchable video console
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChannelVideoRow {
    pub id: Uuid,
    pub title: String,
    pub thumbnail_url: String,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub views: i64,
    pub likes_count: i64,
    pub comments_count: i64,
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BucketCount {
    pub bucket: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudienceInsights {
    pub by_age_bracket: Vec<BucketCount>,
    pub by_gender: Vec<BucketCount>,
    pub by_location: Vec<BucketCount>,
    pub monthly_growth: Vec<TrendPoint>,
}

/// (likes + comments) / views * 100, defined as 0 at zero views
pub fn engagement_rate(likes: i64, comments: i64, views: i64) -> f64 {
    if views <= 0 {
        0.0
    } else {
        (likes + comments) as f64 / views as f64 * 100.0
    }
}

#[derive(Clone)]
pub struct DashboardService {
    pool: PgPool,
}

impl DashboardService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The full multi-metric report for a channel owner
    pub async fn channel_stats(&self, owner_id: Uuid) -> Result<ChannelDashboard> {
        let overview = self.overview(owner_id).await?;

        let top_videos_by_views = self
            .performance_list(owner_id, "views DESC, v.created_at DESC")
            .await?;
        let recent_videos = self
            .performance_list(owner_id, "v.created_at DESC")
            .await?;
        let most_liked = self
            .performance_list(owner_id, "likes DESC, v.created_at DESC")
            .await?;
        let most_commented = self
            .performance_list(owner_id, "comments DESC, v.created_at DESC")
            .await?;

        let trends = TrendSeries {
            views: self
                .daily_trend(
                    owner_id,
                    r#"
                    SELECT date_trunc('day', vw.created_at)::date AS bucket, COUNT(*) AS count
                    FROM views vw
                    JOIN videos v ON v.id = vw.video_id
                    WHERE v.owner_id = $1
                    GROUP BY 1 ORDER BY 1 DESC LIMIT $2
                    "#,
                )
                .await?,
            likes: self
                .daily_trend(
                    owner_id,
                    r#"
                    SELECT date_trunc('day', l.created_at)::date AS bucket, COUNT(*) AS count
                    FROM likes l
                    JOIN videos v ON v.id = l.target_id AND l.target_kind = 'video'
                    WHERE v.owner_id = $1
                    GROUP BY 1 ORDER BY 1 DESC LIMIT $2
                    "#,
                )
                .await?,
            comments: self
                .daily_trend(
                    owner_id,
                    r#"
                    SELECT date_trunc('day', c.created_at)::date AS bucket, COUNT(*) AS count
                    FROM comments c
                    JOIN videos v ON v.id = c.video_id
                    WHERE v.owner_id = $1
                    GROUP BY 1 ORDER BY 1 DESC LIMIT $2
                    "#,
                )
                .await?,
            subscribers: self
                .daily_trend(
                    owner_id,
                    r#"
                    SELECT date_trunc('day', s.created_at)::date AS bucket, COUNT(*) AS count
                    FROM subscriptions s
                    WHERE s.channel_id = $1
                    GROUP BY 1 ORDER BY 1 DESC LIMIT $2
                    "#,
                )
                .await?,
            uploads: self
                .daily_trend(
                    owner_id,
                    r#"
                    SELECT date_trunc('day', v.created_at)::date AS bucket, COUNT(*) AS count
                    FROM videos v
                    WHERE v.owner_id = $1
                    GROUP BY 1 ORDER BY 1 DESC LIMIT $2
                    "#,
                )
                .await?,
        };

        Ok(ChannelDashboard {
            overview,
            top_videos_by_views,
            recent_videos,
            most_liked,
            most_commented,
            trends,
        })
    }

    async fn overview(&self, owner_id: Uuid) -> Result<ChannelOverview> {
        let row = sqlx::query_as::<_, (i64, i64, i64, i64, i64, f64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM videos v WHERE v.owner_id = $1),
                (SELECT COUNT(*) FROM views vw
                   JOIN videos v ON v.id = vw.video_id WHERE v.owner_id = $1),
                (SELECT COUNT(*) FROM likes l
                   JOIN videos v ON v.id = l.target_id AND l.target_kind = 'video'
                   WHERE v.owner_id = $1),
                (SELECT COUNT(*) FROM comments c
                   JOIN videos v ON v.id = c.video_id WHERE v.owner_id = $1),
                (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = $1),
                (SELECT COALESCE(AVG(v.duration), 0) FROM videos v WHERE v.owner_id = $1)
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        let (total_videos, total_views, total_likes, total_comments, total_subscribers, avg_len) =
            row;

        Ok(ChannelOverview {
            total_videos,
            total_views,
            total_likes,
            total_comments,
            total_subscribers,
            engagement_rate: engagement_rate(total_likes, total_comments, total_views),
            average_video_length: avg_len,
        })
    }

    /// Shared projection for performance lists; the ORDER BY clause comes
    /// from a fixed set of strings above, never caller input.
    async fn performance_list(
        &self,
        owner_id: Uuid,
        order_by: &str,
    ) -> Result<Vec<VideoPerformance>> {
        let sql = format!(
            r#"
            SELECT v.id, v.title, v.thumbnail_url, v.created_at,
                   (SELECT COUNT(*) FROM views vw WHERE vw.video_id = v.id) AS views,
                   (SELECT COUNT(*) FROM likes l
                     WHERE l.target_id = v.id AND l.target_kind = 'video') AS likes,
                   (SELECT COUNT(*) FROM comments c WHERE c.video_id = v.id) AS comments
            FROM videos v
            WHERE v.owner_id = $1
            ORDER BY {}
            LIMIT $2
            "#,
            order_by
        );

        let rows = sqlx::query_as::<_, VideoPerformance>(&sql)
            .bind(owner_id)
            .bind(TOP_N)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Runs a day-bucketed count query and returns buckets oldest-first
    async fn daily_trend(&self, owner_id: Uuid, sql: &str) -> Result<Vec<TrendPoint>> {
        let mut points = sqlx::query_as::<_, TrendPoint>(sql)
            .bind(owner_id)
            .bind(TREND_BUCKETS)
            .fetch_all(&self.pool)
            .await?;

        points.reverse();
        Ok(points)
    }

    /// Paged, searchable video console for the channel owner
    pub async fn channel_videos(
        &self,
        owner_id: Uuid,
        page: Option<i64>,
        limit: Option<i64>,
        sort_field: Option<&str>,
        sort_direction: Option<&str>,
        search: Option<&str>,
    ) -> Result<Paginated<ChannelVideoRow>> {
        let params = PageParams::or_default(page, limit);
        let field = match sort_field {
            Some(_) => VideoSortField::parse_required(sort_field)?,
            None => VideoSortField::CreatedAt,
        };
        let direction = match sort_direction {
            Some(_) => SortDirection::parse_required(sort_direction)?,
            None => SortDirection::Desc,
        };

        let pattern = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM videos
            WHERE owner_id = $1 AND ($2::text IS NULL OR title ILIKE $2)
            "#,
        )
        .bind(owner_id)
        .bind(pattern.as_deref())
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT v.id, v.title, v.thumbnail_url, v.is_published, v.created_at,
                   (SELECT COUNT(*) FROM views vw WHERE vw.video_id = v.id) AS views,
                   (SELECT COUNT(*) FROM likes l
                     WHERE l.target_id = v.id AND l.target_kind = 'video') AS likes_count,
                   (SELECT COUNT(*) FROM comments c WHERE c.video_id = v.id) AS comments_count,
                   0::float8 AS engagement_rate
            FROM videos v
            WHERE v.owner_id = $1 AND ($2::text IS NULL OR v.title ILIKE $2)
            ORDER BY {} {}
            LIMIT $3 OFFSET $4
            "#,
            field.as_sql(),
            direction.as_sql()
        );

        let mut rows = sqlx::query_as::<_, ChannelVideoRow>(&sql)
            .bind(owner_id)
            .bind(pattern.as_deref())
            .bind(params.limit)
            .bind(params.offset())
            .fetch_all(&self.pool)
            .await?;

        for row in &mut rows {
            row.engagement_rate = engagement_rate(row.likes_count, row.comments_count, row.views);
        }

        Ok(Paginated::new(rows, total, params))
    }

    /// Subscriber demographics and month-bucketed growth
    pub async fn audience_insights(&self, owner_id: Uuid) -> Result<AudienceInsights> {
        let by_age_bracket = self.subscriber_breakdown(owner_id, "age_bracket").await?;
        let by_gender = self.subscriber_breakdown(owner_id, "gender").await?;
        let by_location = self.subscriber_breakdown(owner_id, "location").await?;

        let monthly_growth = sqlx::query_as::<_, TrendPoint>(
            r#"
            SELECT date_trunc('month', s.created_at)::date AS bucket, COUNT(*) AS count
            FROM subscriptions s
            WHERE s.channel_id = $1
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(AudienceInsights {
            by_age_bracket,
            by_gender,
            by_location,
            monthly_growth,
        })
    }

    /// Count subscribers grouped by one demographic column; NULLs bucket
    /// as "unknown". Column names are fixed literals from the callers.
    async fn subscriber_breakdown(&self, owner_id: Uuid, column: &str) -> Result<Vec<BucketCount>> {
        let sql = format!(
            r#"
            SELECT COALESCE(u.{}, 'unknown') AS bucket, COUNT(*) AS count
            FROM subscriptions s
            JOIN users u ON u.id = s.subscriber_id
            WHERE s.channel_id = $1
            GROUP BY 1
            ORDER BY count DESC, bucket ASC
            "#,
            column
        );

        let rows = sqlx::query_as::<_, BucketCount>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
