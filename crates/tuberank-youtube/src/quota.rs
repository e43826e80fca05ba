//! Process-wide quota tracking.
//!
//! The upstream service meters two independent budgets: abstract daily
//! quota units and raw per-minute request counts. Both are modeled here as
//! rolling windows under a single mutex so a consumption attempt passes
//! both checks atomically or consumes nothing.
//!
//! State is in-memory only. A process restart resets the windows, which is
//! acceptable drift: the upstream enforces its own hard quota regardless.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{YouTubeError, YouTubeResult};

/// Rolling window for the daily unit budget.
const DAILY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Rolling window for the per-minute request budget.
const MINUTE_WINDOW: Duration = Duration::from_secs(60);

/// Point-in-time view of quota consumption, reported by `/health`.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaSnapshot {
    /// Daily budget in quota units
    pub daily_limit: u64,
    /// Units consumed inside the rolling 24-hour window
    pub daily_used: u64,
    /// Units still available
    pub daily_remaining: u64,
    /// Per-minute request budget
    pub minute_limit: u32,
    /// Requests made inside the rolling 60-second window
    pub minute_used: u32,
}

#[derive(Debug, Default)]
struct Windows {
    /// (consumed-at, cost) pairs inside the daily window
    daily: VecDeque<(Instant, u64)>,
    /// Running sum of `daily` costs
    daily_used: u64,
    /// Request instants inside the minute window
    minute: VecDeque<Instant>,
}

impl Windows {
    fn prune(&mut self, now: Instant) {
        while let Some(&(at, cost)) = self.daily.front() {
            if now.duration_since(at) < DAILY_WINDOW {
                break;
            }
            self.daily.pop_front();
            self.daily_used -= cost;
        }
        while let Some(&at) = self.minute.front() {
            if now.duration_since(at) < MINUTE_WINDOW {
                break;
            }
            self.minute.pop_front();
        }
    }
}

/// Shared quota tracker.
///
/// One instance per process, handed to every client via `Arc`: the budget
/// models a resource shared with the upstream service, so split trackers
/// would under-report consumption.
#[derive(Debug)]
pub struct QuotaTracker {
    daily_limit: u64,
    minute_limit: u32,
    windows: Mutex<Windows>,
}

impl QuotaTracker {
    /// Create a tracker with the given budgets.
    pub fn new(daily_limit: u64, minute_limit: u32) -> Self {
        Self {
            daily_limit,
            minute_limit,
            windows: Mutex::new(Windows::default()),
        }
    }

    /// Consume `cost` units and one request slot, atomically.
    ///
    /// Fails with `QuotaExceeded` when either budget cannot cover the
    /// call, without decrementing anything.
    pub fn try_consume(&self, cost: u64) -> YouTubeResult<()> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.prune(now);

        if windows.daily_used.saturating_add(cost) > self.daily_limit {
            return Err(YouTubeError::quota_exceeded(format!(
                "daily budget exhausted ({}/{} units used, {} requested)",
                windows.daily_used, self.daily_limit, cost
            )));
        }
        if windows.minute.len() as u32 >= self.minute_limit {
            return Err(YouTubeError::quota_exceeded(format!(
                "per-minute budget exhausted ({} requests in window)",
                windows.minute.len()
            )));
        }

        windows.daily.push_back((now, cost));
        windows.daily_used += cost;
        windows.minute.push_back(now);

        debug!(
            cost,
            daily_used = windows.daily_used,
            "Consumed quota units"
        );
        Ok(())
    }

    /// Current consumption, for the health endpoint.
    pub fn snapshot(&self) -> QuotaSnapshot {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.prune(now);

        QuotaSnapshot {
            daily_limit: self.daily_limit,
            daily_used: windows.daily_used,
            daily_remaining: self.daily_limit.saturating_sub(windows.daily_used),
            minute_limit: self.minute_limit,
            minute_used: windows.minute.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_consume_within_budget() {
        let tracker = QuotaTracker::new(100, 10);
        assert!(tracker.try_consume(50).is_ok());
        assert!(tracker.try_consume(50).is_ok());

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.daily_used, 100);
        assert_eq!(snapshot.daily_remaining, 0);
        assert_eq!(snapshot.minute_used, 2);
    }

    #[tokio::test]
    async fn test_overconsumption_is_atomic() {
        let tracker = QuotaTracker::new(100, 10);
        assert!(tracker.try_consume(80).is_ok());

        // Exceeds the daily budget: must fail without partial decrement.
        assert!(tracker.try_consume(30).is_err());
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.daily_used, 80);
        assert_eq!(snapshot.minute_used, 1);

        // A smaller call still fits.
        assert!(tracker.try_consume(20).is_ok());
    }

    #[tokio::test]
    async fn test_minute_budget_blocks_independently() {
        let tracker = QuotaTracker::new(1_000_000, 2);
        assert!(tracker.try_consume(1).is_ok());
        assert!(tracker.try_consume(1).is_ok());
        // Daily budget is nowhere near exhausted, minute budget is.
        assert!(tracker.try_consume(1).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_minute_window_rolls_over() {
        let tracker = QuotaTracker::new(1_000_000, 1);
        assert!(tracker.try_consume(1).is_ok());
        assert!(tracker.try_consume(1).is_err());

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(tracker.try_consume(1).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_daily_window_rolls_over() {
        let tracker = QuotaTracker::new(10, 100);
        assert!(tracker.try_consume(10).is_ok());
        assert!(tracker.try_consume(1).is_err());

        tokio::time::advance(Duration::from_secs(24 * 60 * 60 + 1)).await;
        assert!(tracker.try_consume(10).is_ok());
    }
}
