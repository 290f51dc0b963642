//! Fail-fast gate for a rate-limited service.
//!
//! Once a service answers 429, every further request to it in the same
//! process fails immediately with a synthesized 429 until the reset time,
//! instead of hammering the API from every concurrent project.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use crate::error::ServiceError;
use crate::model::now_ms;

/// Wait applied when a 429 carries no usable reset hint.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(60);

/// Shared "limited until" timestamp, owned by one client.
#[derive(Debug, Default)]
pub struct RateLimitGate {
    /// Milliseconds since epoch; 0 when never tripped
    until_ms: AtomicI64,
}

impl RateLimitGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail fast while the limit is active.
    ///
    /// # Errors
    ///
    /// Returns a rate-limited [`ServiceError`] until the reset time passes.
    pub fn check(&self) -> Result<(), ServiceError> {
        self.check_at(now_ms())
    }

    fn check_at(&self, now: i64) -> Result<(), ServiceError> {
        let until = self.until_ms.load(Ordering::Acquire);
        if now < until {
            return Err(ServiceError::rate_limited(format!(
                "API rate limit reached, retry after {}",
                format_ms(until)
            )));
        }
        Ok(())
    }

    /// Close the gate for `retry_after` from now.
    pub fn trip(&self, retry_after: Duration) {
        let wait = i64::try_from(retry_after.as_millis()).unwrap_or(i64::MAX);
        self.trip_until(now_ms().saturating_add(wait));
    }

    /// Close the gate until `until_ms`. An earlier reset never shortens
    /// a later one.
    pub fn trip_until(&self, until_ms: i64) {
        let previous = self.until_ms.fetch_max(until_ms, Ordering::AcqRel);
        if until_ms > previous {
            tracing::warn!(until = %format_ms(until_ms), "rate limit reached");
        }
    }

    /// Latest reset time seen, if the gate was ever tripped.
    #[must_use]
    pub fn reached_until(&self) -> Option<i64> {
        match self.until_ms.load(Ordering::Acquire) {
            0 => None,
            until => Some(until),
        }
    }
}

/// RFC 3339 rendering of a millisecond timestamp.
#[must_use]
pub fn format_ms(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map_or_else(|| ms.to_string(), |dt| dt.to_rfc3339())
}

/// Parse a `Retry-After` header given in seconds.
#[must_use]
pub fn parse_retry_after(value: Option<&str>) -> Duration {
    value
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs)
}
