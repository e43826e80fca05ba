//! Channel, video, and analytics persistence.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tracing::debug;

use tuberank_models::{shorts_percentage, Channel, ChannelAnalytics, Video};

use crate::error::StorageResult;

/// Internal row type for sqlx mapping.
#[derive(sqlx::FromRow)]
struct ChannelRow {
    channel_id: String,
    title: String,
    description: String,
    custom_url: Option<String>,
    thumbnail_url: Option<String>,
    banner_url: Option<String>,
    subscriber_count: i64,
    video_count: i64,
    view_count: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ChannelRow> for Channel {
    fn from(r: ChannelRow) -> Self {
        Self {
            channel_id: r.channel_id,
            title: r.title,
            description: r.description,
            custom_url: r.custom_url,
            thumbnail_url: r.thumbnail_url,
            banner_url: r.banner_url,
            subscriber_count: r.subscriber_count,
            video_count: r.video_count,
            view_count: r.view_count,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct VideoRow {
    video_id: String,
    channel_id: String,
    title: String,
    description: String,
    published_at: Option<DateTime<Utc>>,
    duration_seconds: i64,
    view_count: i64,
    like_count: i64,
    comment_count: i64,
    thumbnail_url: Option<String>,
    is_short: bool,
    category_id: Option<String>,
    tags: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<VideoRow> for Video {
    type Error = crate::StorageError;

    fn try_from(r: VideoRow) -> StorageResult<Self> {
        Ok(Self {
            video_id: r.video_id,
            channel_id: r.channel_id,
            title: r.title,
            description: r.description,
            published_at: r.published_at,
            duration_seconds: r.duration_seconds,
            view_count: r.view_count,
            like_count: r.like_count,
            comment_count: r.comment_count,
            thumbnail_url: r.thumbnail_url,
            is_short: r.is_short,
            category_id: r.category_id,
            tags: serde_json::from_str(&r.tags)?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct AnalyticsRow {
    channel_id: String,
    total_videos: i64,
    total_shorts: i64,
    shorts_percentage: f64,
    total_views: i64,
    average_view_count: f64,
    calculated_at: DateTime<Utc>,
}

impl From<AnalyticsRow> for ChannelAnalytics {
    fn from(r: AnalyticsRow) -> Self {
        Self {
            channel_id: r.channel_id,
            total_videos: r.total_videos,
            total_shorts: r.total_shorts,
            shorts_percentage: r.shorts_percentage,
            total_views: r.total_views,
            average_view_count: r.average_view_count,
            calculated_at: r.calculated_at,
        }
    }
}

/// Aggregate scan result over one channel's videos.
#[derive(sqlx::FromRow)]
struct VideoAggregates {
    total_videos: i64,
    total_shorts: i64,
    total_views: i64,
}

/// SQLite-backed store.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the database named by `DATABASE_URL`.
    pub async fn from_env() -> StorageResult<Self> {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://tuberank.db?mode=rwc".to_string());
        let pool = SqlitePoolOptions::new().connect(&url).await?;
        let store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    /// In-memory store for tests.
    ///
    /// A single connection keeps every query on the same in-memory
    /// database.
    pub async fn in_memory() -> StorageResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self::new(pool);
        store.init().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the schema if it does not exist.
    pub async fn init(&self) -> StorageResult<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS channels (
                channel_id       TEXT PRIMARY KEY,
                title            TEXT NOT NULL,
                description      TEXT NOT NULL DEFAULT '',
                custom_url       TEXT,
                thumbnail_url    TEXT,
                banner_url       TEXT,
                subscriber_count INTEGER NOT NULL DEFAULT 0,
                video_count      INTEGER NOT NULL DEFAULT 0,
                view_count       INTEGER NOT NULL DEFAULT 0,
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        // No enforced FK to channels: a video fetch may legally land
        // before its channel fetch.
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS videos (
                video_id         TEXT PRIMARY KEY,
                channel_id       TEXT NOT NULL,
                title            TEXT NOT NULL,
                description      TEXT NOT NULL DEFAULT '',
                published_at     TEXT,
                duration_seconds INTEGER NOT NULL DEFAULT 0,
                view_count       INTEGER NOT NULL DEFAULT 0,
                like_count       INTEGER NOT NULL DEFAULT 0,
                comment_count    INTEGER NOT NULL DEFAULT 0,
                thumbnail_url    TEXT,
                is_short         INTEGER NOT NULL DEFAULT 0,
                category_id      TEXT,
                tags             TEXT NOT NULL DEFAULT '[]',
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_videos_channel
               ON videos(channel_id, published_at DESC)"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS channel_analytics (
                channel_id         TEXT PRIMARY KEY,
                total_videos       INTEGER NOT NULL DEFAULT 0,
                total_shorts       INTEGER NOT NULL DEFAULT 0,
                shorts_percentage  REAL NOT NULL DEFAULT 0,
                total_views        INTEGER NOT NULL DEFAULT 0,
                average_view_count REAL NOT NULL DEFAULT 0,
                calculated_at      TEXT NOT NULL
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS job_queue (
                id            TEXT PRIMARY KEY,
                job_type      TEXT NOT NULL,
                channel_id    TEXT NOT NULL,
                status        TEXT NOT NULL DEFAULT 'pending',
                priority      INTEGER NOT NULL DEFAULT 0,
                progress      INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL,
                started_at    TEXT,
                completed_at  TEXT,
                error_message TEXT
            )"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert-or-update a channel keyed on its external ID.
    ///
    /// `updated_at` is bumped on every call whether or not values changed;
    /// `created_at` of an existing row is preserved.
    pub async fn upsert_channel(&self, channel: &Channel) -> StorageResult<Channel> {
        let now = Utc::now();
        sqlx::query(
            r#"INSERT INTO channels (
                 channel_id, title, description, custom_url, thumbnail_url,
                 banner_url, subscriber_count, video_count, view_count,
                 created_at, updated_at
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(channel_id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 custom_url = excluded.custom_url,
                 thumbnail_url = excluded.thumbnail_url,
                 banner_url = excluded.banner_url,
                 subscriber_count = excluded.subscriber_count,
                 video_count = excluded.video_count,
                 view_count = excluded.view_count,
                 updated_at = excluded.updated_at"#,
        )
        .bind(&channel.channel_id)
        .bind(&channel.title)
        .bind(&channel.description)
        .bind(&channel.custom_url)
        .bind(&channel.thumbnail_url)
        .bind(&channel.banner_url)
        .bind(channel.subscriber_count)
        .bind(channel.video_count)
        .bind(channel.view_count)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(channel_id = %channel.channel_id, "Upserted channel");

        self.get_channel(&channel.channel_id)
            .await?
            .ok_or_else(|| crate::StorageError::not_found(channel.channel_id.clone()))
    }

    pub async fn get_channel(&self, channel_id: &str) -> StorageResult<Option<Channel>> {
        let row =
            sqlx::query_as::<_, ChannelRow>("SELECT * FROM channels WHERE channel_id = ?")
                .bind(channel_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(Channel::from))
    }

    /// Insert-or-update a video keyed on its external ID.
    pub async fn upsert_video(&self, video: &Video) -> StorageResult<Video> {
        let now = Utc::now();
        let tags_json = serde_json::to_string(&video.tags)?;
        sqlx::query(
            r#"INSERT INTO videos (
                 video_id, channel_id, title, description, published_at,
                 duration_seconds, view_count, like_count, comment_count,
                 thumbnail_url, is_short, category_id, tags,
                 created_at, updated_at
               ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(video_id) DO UPDATE SET
                 channel_id = excluded.channel_id,
                 title = excluded.title,
                 description = excluded.description,
                 published_at = excluded.published_at,
                 duration_seconds = excluded.duration_seconds,
                 view_count = excluded.view_count,
                 like_count = excluded.like_count,
                 comment_count = excluded.comment_count,
                 thumbnail_url = excluded.thumbnail_url,
                 is_short = excluded.is_short,
                 category_id = excluded.category_id,
                 tags = excluded.tags,
                 updated_at = excluded.updated_at"#,
        )
        .bind(&video.video_id)
        .bind(&video.channel_id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(video.published_at)
        .bind(video.duration_seconds)
        .bind(video.view_count)
        .bind(video.like_count)
        .bind(video.comment_count)
        .bind(&video.thumbnail_url)
        .bind(video.is_short)
        .bind(&video.category_id)
        .bind(&tags_json)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, VideoRow>("SELECT * FROM videos WHERE video_id = ?")
            .bind(&video.video_id)
            .fetch_one(&self.pool)
            .await?;
        Video::try_from(row)
    }

    /// Page through one channel's videos, newest first.
    pub async fn list_videos(
        &self,
        channel_id: &str,
        limit: i64,
        offset: i64,
        include_shorts: bool,
    ) -> StorageResult<Vec<Video>> {
        let sql = if include_shorts {
            r#"SELECT * FROM videos WHERE channel_id = ?
               ORDER BY published_at DESC LIMIT ? OFFSET ?"#
        } else {
            r#"SELECT * FROM videos WHERE channel_id = ? AND is_short = 0
               ORDER BY published_at DESC LIMIT ? OFFSET ?"#
        };

        let rows = sqlx::query_as::<_, VideoRow>(sql)
            .bind(channel_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Video::try_from).collect()
    }

    /// Recompute the derived aggregate for a channel from a full scan of
    /// its video set, replacing any prior row.
    ///
    /// Never incremental: a full scan cannot drift from missed events.
    pub async fn recompute_channel_analytics(
        &self,
        channel_id: &str,
    ) -> StorageResult<ChannelAnalytics> {
        let aggregates = sqlx::query_as::<_, VideoAggregates>(
            r#"SELECT
                 COUNT(*) AS total_videos,
                 COALESCE(SUM(is_short), 0) AS total_shorts,
                 COALESCE(SUM(view_count), 0) AS total_views
               FROM videos WHERE channel_id = ?"#,
        )
        .bind(channel_id)
        .fetch_one(&self.pool)
        .await?;

        let average = if aggregates.total_videos > 0 {
            aggregates.total_views as f64 / aggregates.total_videos as f64
        } else {
            0.0
        };
        let analytics = ChannelAnalytics {
            channel_id: channel_id.to_string(),
            total_videos: aggregates.total_videos,
            total_shorts: aggregates.total_shorts,
            shorts_percentage: shorts_percentage(aggregates.total_videos, aggregates.total_shorts),
            total_views: aggregates.total_views,
            average_view_count: average,
            calculated_at: Utc::now(),
        };

        sqlx::query(
            r#"INSERT INTO channel_analytics (
                 channel_id, total_videos, total_shorts, shorts_percentage,
                 total_views, average_view_count, calculated_at
               ) VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT(channel_id) DO UPDATE SET
                 total_videos = excluded.total_videos,
                 total_shorts = excluded.total_shorts,
                 shorts_percentage = excluded.shorts_percentage,
                 total_views = excluded.total_views,
                 average_view_count = excluded.average_view_count,
                 calculated_at = excluded.calculated_at"#,
        )
        .bind(&analytics.channel_id)
        .bind(analytics.total_videos)
        .bind(analytics.total_shorts)
        .bind(analytics.shorts_percentage)
        .bind(analytics.total_views)
        .bind(analytics.average_view_count)
        .bind(analytics.calculated_at)
        .execute(&self.pool)
        .await?;

        debug!(
            channel_id,
            total_videos = analytics.total_videos,
            shorts_percentage = analytics.shorts_percentage,
            "Recomputed channel analytics"
        );
        Ok(analytics)
    }

    pub async fn get_channel_analytics(
        &self,
        channel_id: &str,
    ) -> StorageResult<Option<ChannelAnalytics>> {
        let row = sqlx::query_as::<_, AnalyticsRow>(
            "SELECT * FROM channel_analytics WHERE channel_id = ?",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(ChannelAnalytics::from))
    }

    /// Check connectivity, for the readiness probe.
    pub async fn ping(&self) -> StorageResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(id: &str) -> Channel {
        let mut c = Channel::new(id, "A Channel");
        c.subscriber_count = 100;
        c
    }

    fn video(id: &str, channel_id: &str, views: i64, short: bool) -> Video {
        let mut v = Video::new(id, channel_id, format!("Video {id}"));
        v.view_count = views;
        v.is_short = short;
        v.duration_seconds = if short { 30 } else { 300 };
        v.tags = vec!["tag-a".to_string()];
        v
    }

    #[tokio::test]
    async fn test_channel_upsert_is_idempotent_and_bumps_updated_at() {
        let store = Store::in_memory().await.expect("store");

        let first = store.upsert_channel(&channel("UC1")).await.expect("first");
        let second = store.upsert_channel(&channel("UC1")).await.expect("second");

        assert_eq!(first.channel_id, second.channel_id);
        assert_eq!(first.created_at, second.created_at);
        assert!(second.updated_at > first.updated_at);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM channels")
            .fetch_one(store.pool())
            .await
            .expect("count");
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_video_upsert_roundtrips_tags() {
        let store = Store::in_memory().await.expect("store");
        store.upsert_channel(&channel("UC1")).await.expect("channel");

        let stored = store
            .upsert_video(&video("v1", "UC1", 10, false))
            .await
            .expect("video");
        assert_eq!(stored.tags, vec!["tag-a".to_string()]);
        assert_eq!(stored.view_count, 10);
    }

    #[tokio::test]
    async fn test_list_videos_shorts_filter() {
        let store = Store::in_memory().await.expect("store");
        store.upsert_channel(&channel("UC1")).await.expect("channel");

        store.upsert_video(&video("v1", "UC1", 10, false)).await.unwrap();
        store.upsert_video(&video("v2", "UC1", 20, true)).await.unwrap();
        store.upsert_video(&video("v3", "UC1", 30, false)).await.unwrap();

        let all = store.list_videos("UC1", 50, 0, true).await.unwrap();
        assert_eq!(all.len(), 3);

        let long_form = store.list_videos("UC1", 50, 0, false).await.unwrap();
        assert_eq!(long_form.len(), 2);
        assert!(long_form.iter().all(|v| !v.is_short));
    }

    #[tokio::test]
    async fn test_recompute_analytics_full_scan() {
        let store = Store::in_memory().await.expect("store");
        store.upsert_channel(&channel("UC1")).await.expect("channel");

        for i in 0..10 {
            let short = i < 3;
            store
                .upsert_video(&video(&format!("v{i}"), "UC1", 100, short))
                .await
                .unwrap();
        }

        let analytics = store.recompute_channel_analytics("UC1").await.unwrap();
        assert_eq!(analytics.total_videos, 10);
        assert_eq!(analytics.total_shorts, 3);
        assert_eq!(analytics.shorts_percentage, 30.0);
        assert_eq!(analytics.total_views, 1000);
        assert_eq!(analytics.average_view_count, 100.0);

        // Replaces, never accumulates.
        let again = store.recompute_channel_analytics("UC1").await.unwrap();
        assert_eq!(again.total_videos, 10);
    }

    #[tokio::test]
    async fn test_recompute_analytics_empty_channel() {
        let store = Store::in_memory().await.expect("store");
        store.upsert_channel(&channel("UC2")).await.expect("channel");

        let analytics = store.recompute_channel_analytics("UC2").await.unwrap();
        assert_eq!(analytics.total_videos, 0);
        assert_eq!(analytics.shorts_percentage, 0.0);
        assert_eq!(analytics.average_view_count, 0.0);
    }
}
