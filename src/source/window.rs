//! Time window computation.

use serde::Serialize;

use crate::config::TuningConfig;

/// Source of the current wall-clock time.
pub trait Clock: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now_secs(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_secs(&self) -> i64 {
        self.0
    }
}

/// Request range for one run, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
    /// Start was clamped to the lookback boundary rather than derived from
    /// the watermark.
    pub from_lookback: bool,
}

/// Lookback and safety margin applied when computing a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPolicy {
    pub lookback_secs: i64,
    pub safety_margin_secs: i64,
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::from(&TuningConfig::default())
    }
}

impl From<&TuningConfig> for WindowPolicy {
    fn from(tuning: &TuningConfig) -> Self {
        Self {
            lookback_secs: tuning.lookback_secs,
            safety_margin_secs: tuning.safety_margin_secs,
        }
    }
}

impl WindowPolicy {
    /// Compute the window for a run at `now_secs`.
    ///
    /// A watermark older than the lookback boundary, or no watermark at all,
    /// starts the window at the boundary; otherwise the window starts one
    /// millisecond after the watermark.
    #[must_use]
    pub fn compute(&self, watermark: Option<i64>, now_secs: i64) -> TimeWindow {
        let lookback_start = (now_secs - self.lookback_secs) * 1000;
        let end_ms = (now_secs - self.safety_margin_secs) * 1000;

        match watermark {
            Some(w) if w >= lookback_start => TimeWindow {
                start_ms: w.saturating_add(1),
                end_ms,
                from_lookback: false,
            },
            _ => TimeWindow {
                start_ms: lookback_start,
                end_ms,
                from_lookback: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn test_no_watermark_uses_lookback() {
        let window = WindowPolicy::default().compute(None, NOW);
        assert_eq!(window.start_ms, (NOW - 21_600) * 1000);
        assert_eq!(window.end_ms, (NOW - 10) * 1000);
        assert!(window.from_lookback);
    }

    #[test]
    fn test_max_watermark_does_not_overflow() {
        let window = WindowPolicy::default().compute(Some(i64::MAX), NOW);
        assert_eq!(window.start_ms, i64::MAX);
        assert!(!window.from_lookback);
    }

    #[test]
    fn test_recent_watermark_resumes_after_it() {
        let watermark = 1_699_999_999_000;
        let window = WindowPolicy::default().compute(Some(watermark), NOW);
        assert_eq!(window.start_ms, watermark + 1);
        assert!(!window.from_lookback);
    }

    #[test]
    fn test_stale_watermark_uses_lookback() {
        let stale = (NOW - 21_601) * 1000;
        let window = WindowPolicy::default().compute(Some(stale), NOW);
        assert_eq!(window.start_ms, (NOW - 21_600) * 1000);
        assert!(window.from_lookback);
    }

    #[test]
    fn test_watermark_on_boundary_is_kept() {
        let boundary = (NOW - 21_600) * 1000;
        let window = WindowPolicy::default().compute(Some(boundary), NOW);
        assert_eq!(window.start_ms, boundary + 1);
        assert!(!window.from_lookback);
    }

    #[test]
    fn test_custom_policy() {
        let policy = WindowPolicy {
            lookback_secs: 60,
            safety_margin_secs: 0,
        };
        let window = policy.compute(None, NOW);
        assert_eq!(window.start_ms, (NOW - 60) * 1000);
        assert_eq!(window.end_ms, NOW * 1000);
    }

    #[test]
    fn test_fixed_clock() {
        assert_eq!(FixedClock(NOW).now_secs(), NOW);
        assert!(SystemClock.now_secs() > NOW);
    }
}
