//! Rate limiting ports and application service.
//!
//! Implements a sliding-window rate limiter over composite keys built from
//! the client IP, institution, login scope, and normalized identifier. This
//! guards request volume independently of the OTP engine's own resend
//! cooldown — defense in depth against SMS-bombing and code brute force.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use shikkha_core::{AppError, AppResult};
use shikkha_domain::LoginScope;

/// Repository port for rate limit persistence.
#[async_trait]
pub trait RateLimitRepository: Send + Sync {
    /// Records an attempt for the given key.
    ///
    /// Uses an UPSERT pattern: if the current window has expired, resets the
    /// counter. Returns the updated attempt count within the active window.
    async fn record_attempt(
        &self,
        key: &str,
        window_duration_seconds: i64,
    ) -> AppResult<AttemptInfo>;

    /// Removes expired entries older than the given cutoff.
    async fn cleanup_expired(&self, before: DateTime<Utc>) -> AppResult<u64>;
}

/// Information about the current rate limit window for a key.
#[derive(Debug, Clone)]
pub struct AttemptInfo {
    /// Number of attempts in the current window (including this one).
    pub attempt_count: i32,
    /// When the current window started.
    pub window_started_at: DateTime<Utc>,
}

/// Configuration for a rate limit rule.
#[derive(Debug, Clone)]
pub struct RateLimitRule {
    /// The route prefix or category name (e.g., "otp_send", "otp_verify").
    pub category: String,
    /// Maximum number of attempts allowed in the window.
    pub max_attempts: i32,
    /// Window duration in seconds.
    pub window_seconds: i64,
}

impl RateLimitRule {
    /// Creates a new rate limit rule.
    #[must_use]
    pub fn new(category: impl Into<String>, max_attempts: i32, window_seconds: i64) -> Self {
        Self {
            category: category.into(),
            max_attempts,
            window_seconds,
        }
    }
}

/// Application service for rate limiting.
#[derive(Clone)]
pub struct RateLimitService {
    repository: Arc<dyn RateLimitRepository>,
}

impl RateLimitService {
    /// Creates a new rate limit service.
    #[must_use]
    pub fn new(repository: Arc<dyn RateLimitRepository>) -> Self {
        Self { repository }
    }

    /// Builds the composite throttle key for an OTP endpoint request.
    ///
    /// Requests without a resolvable client IP share one bucket rather than
    /// escaping the limiter.
    #[must_use]
    pub fn throttle_key(
        client_ip: Option<&str>,
        institution_slug: &str,
        scope: LoginScope,
        identifier: &str,
    ) -> String {
        format!(
            "{}:{institution_slug}:{}:{identifier}",
            client_ip.unwrap_or("unknown"),
            scope.as_str()
        )
    }

    /// Checks whether the given key is within the rate limit.
    ///
    /// Records the attempt and returns `Ok(())` if allowed, or
    /// `Err(AppError::RateLimited)` carrying the seconds until the window
    /// resets when the limit has been exceeded.
    pub async fn check_rate_limit(&self, rule: &RateLimitRule, key: &str) -> AppResult<()> {
        let composite_key = format!("{}:{key}", rule.category);
        let info = self
            .repository
            .record_attempt(&composite_key, rule.window_seconds)
            .await?;

        if info.attempt_count > rule.max_attempts {
            let window_ends_at = info.window_started_at + Duration::seconds(rule.window_seconds);
            let retry_after_seconds = (window_ends_at - Utc::now()).num_seconds().max(1);
            return Err(AppError::RateLimited {
                retry_after_seconds,
            });
        }

        Ok(())
    }

    /// Removes expired rate limit entries. Intended for periodic cleanup.
    pub async fn cleanup(&self) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::hours(24);
        self.repository.cleanup_expired(cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use shikkha_core::{AppError, AppResult};
    use shikkha_domain::LoginScope;

    use super::{AttemptInfo, RateLimitRepository, RateLimitRule, RateLimitService};

    #[derive(Default)]
    struct TestRateLimitRepo {
        counts: Mutex<std::collections::HashMap<String, i32>>,
    }

    #[async_trait]
    impl RateLimitRepository for TestRateLimitRepo {
        async fn record_attempt(
            &self,
            key: &str,
            _window_duration_seconds: i64,
        ) -> AppResult<AttemptInfo> {
            let mut counts = self.counts.lock().map_err(|error| {
                AppError::Internal(format!("failed to lock repo state: {error}"))
            })?;
            let count = counts.entry(key.to_owned()).or_insert(0);
            *count += 1;
            Ok(AttemptInfo {
                attempt_count: *count,
                window_started_at: Utc::now(),
            })
        }

        async fn cleanup_expired(&self, _before: DateTime<Utc>) -> AppResult<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn requests_within_the_limit_pass() {
        let service = RateLimitService::new(Arc::new(TestRateLimitRepo::default()));
        let rule = RateLimitRule::new("otp_send", 3, 60);

        for _ in 0..3 {
            assert!(service.check_rate_limit(&rule, "key").await.is_ok());
        }
    }

    #[tokio::test]
    async fn exceeding_the_limit_reports_retry_guidance() {
        let service = RateLimitService::new(Arc::new(TestRateLimitRepo::default()));
        let rule = RateLimitRule::new("otp_send", 2, 60);

        for _ in 0..2 {
            assert!(service.check_rate_limit(&rule, "key").await.is_ok());
        }

        let rejected = service.check_rate_limit(&rule, "key").await;
        assert!(matches!(
            rejected,
            Err(AppError::RateLimited {
                retry_after_seconds
            }) if retry_after_seconds >= 1
        ));
    }

    #[tokio::test]
    async fn distinct_keys_do_not_share_windows() {
        let service = RateLimitService::new(Arc::new(TestRateLimitRepo::default()));
        let rule = RateLimitRule::new("otp_send", 1, 60);

        assert!(service.check_rate_limit(&rule, "first").await.is_ok());
        assert!(service.check_rate_limit(&rule, "second").await.is_ok());
    }

    #[test]
    fn throttle_key_includes_every_dimension() {
        let key = RateLimitService::throttle_key(
            Some("203.0.113.9"),
            "dhaka-model-school",
            LoginScope::Teacher,
            "+8801712345678",
        );
        assert_eq!(
            key,
            "203.0.113.9:dhaka-model-school:teacher:+8801712345678"
        );
    }

    #[test]
    fn missing_client_ip_shares_one_bucket() {
        let key = RateLimitService::throttle_key(
            None,
            "dhaka-model-school",
            LoginScope::Student,
            "+8801712345678",
        );
        assert!(key.starts_with("unknown:"));
    }
}
