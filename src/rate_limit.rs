use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::{
    error::{AppError, AppResult},
    models::RateLimitRecord,
    store::RateLimitRepository,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow(RateLimitOutcome),
    Deny,
}

/// What to persist after an allowed submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitOutcome {
    pub submission_count: i32,
    pub window_start: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct WindowPolicy {
    pub max: i32,
    pub window: Duration,
}

impl WindowPolicy {
    pub fn new(max: u32, window_secs: i64) -> Self {
        Self {
            max: i32::try_from(max).unwrap_or(i32::MAX),
            window: Duration::seconds(window_secs),
        }
    }

    /// Fixed-window counter: reset once the window has elapsed, deny at `max`.
    pub fn decide(&self, existing: Option<&RateLimitRecord>, now: DateTime<Utc>) -> Decision {
        let fresh = Decision::Allow(RateLimitOutcome {
            submission_count: 1,
            window_start: now,
        });
        let Some(record) = existing else {
            return fresh;
        };
        if now - record.window_start >= self.window {
            return fresh;
        }
        if record.submission_count >= self.max {
            return Decision::Deny;
        }
        Decision::Allow(RateLimitOutcome {
            submission_count: record.submission_count + 1,
            window_start: record.window_start,
        })
    }
}

impl Default for WindowPolicy {
    fn default() -> Self {
        Self::new(5, 60 * 60)
    }
}

/// Per-identifier submission limiter backed by the store.
///
/// The read and the write are separate calls, so concurrent submissions for
/// one identifier can both pass. That is acceptable for a courtesy limit.
#[derive(Clone)]
pub struct RateLimiter {
    repo: Arc<dyn RateLimitRepository>,
    policy: WindowPolicy,
}

impl RateLimiter {
    pub fn new(repo: Arc<dyn RateLimitRepository>, policy: WindowPolicy) -> Self {
        Self { repo, policy }
    }

    pub async fn check_and_record(&self, identifier: &str, now: DateTime<Utc>) -> AppResult<()> {
        let existing = self.repo.find_rate_limit(identifier).await?;
        match self.policy.decide(existing.as_ref(), now) {
            Decision::Deny => {
                warn!(identifier = %identifier, "rate limit exceeded");
                Err(AppError::RateLimited)
            }
            Decision::Allow(outcome) => {
                self.repo
                    .save_rate_limit(RateLimitRecord {
                        identifier: identifier.to_string(),
                        submission_count: outcome.submission_count,
                        window_start: outcome.window_start,
                    })
                    .await
            }
        }
    }
}
