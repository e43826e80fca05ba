//! Derived per-channel aggregates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Periodically recomputed aggregate over one channel's video set.
///
/// This is a cache, not a source of truth: it is always replaced by a full
/// scan over the channel's videos, never updated incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAnalytics {
    /// External ID of the channel this row aggregates
    pub channel_id: String,
    /// Total videos counted in the scan
    pub total_videos: i64,
    /// Videos classified as Shorts
    pub total_shorts: i64,
    /// Shorts share of all videos, 0-100 with two-decimal precision
    pub shorts_percentage: f64,
    /// Sum of view counts
    pub total_views: i64,
    /// Mean view count (0 for empty channels)
    pub average_view_count: f64,
    /// When the scan ran
    pub calculated_at: DateTime<Utc>,
}

/// Shorts share of a video set, rounded to two decimals.
///
/// Returns 0 for an empty set rather than dividing by zero.
pub fn shorts_percentage(total_videos: i64, total_shorts: i64) -> f64 {
    if total_videos <= 0 {
        return 0.0;
    }
    let raw = total_shorts as f64 / total_videos as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shorts_percentage_rounding() {
        assert_eq!(shorts_percentage(10, 3), 30.0);
        assert_eq!(shorts_percentage(3, 1), 33.33);
        assert_eq!(shorts_percentage(3, 2), 66.67);
        assert_eq!(shorts_percentage(7, 7), 100.0);
    }

    #[test]
    fn test_shorts_percentage_empty_channel() {
        assert_eq!(shorts_percentage(0, 0), 0.0);
    }
}
