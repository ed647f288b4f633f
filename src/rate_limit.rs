//! Attempt limiter for sensitive operations (connection requests,
//! emergency alerts). Explicitly constructed and injected, never a
//! process global. Keyed by (actor, operation) over a sliding window.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

use crate::config::{RATE_LIMIT_MAX_ATTEMPTS, RATE_LIMIT_WINDOW_SECONDS};
use crate::error::CareError;

pub struct RateLimiter {
    window: Duration,
    max_attempts: u32,
    attempts: HashMap<(Uuid, String), Vec<NaiveDateTime>>,
}

impl RateLimiter {
    pub fn new(window_seconds: i64, max_attempts: u32) -> Self {
        Self {
            window: Duration::seconds(window_seconds),
            max_attempts,
            attempts: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(RATE_LIMIT_WINDOW_SECONDS, RATE_LIMIT_MAX_ATTEMPTS)
    }

    /// Record an attempt, failing with `RateLimited` when the actor has
    /// exhausted the window. Entries outside the window are swept on the
    /// way in, so the map stays bounded by recent activity.
    pub fn check(
        &mut self,
        actor_id: Uuid,
        operation: &str,
        now: NaiveDateTime,
    ) -> Result<(), CareError> {
        let key = (actor_id, operation.to_string());
        let window = self.window;
        let entries = self.attempts.entry(key).or_default();
        entries.retain(|&at| now - at < window);

        if entries.len() as u32 >= self.max_attempts {
            let oldest = entries.iter().min().copied().unwrap_or(now);
            let retry_after_seconds = (window - (now - oldest)).num_seconds().max(0);
            return Err(CareError::RateLimited { retry_after_seconds });
        }
        entries.push(now);
        Ok(())
    }
}
