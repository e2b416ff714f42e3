//! Rate limiter guarding the confirmation code exchange

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::info;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed per window
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,        // 5 minutes
            ban_duration_seconds: 3600, // 1 hour
        }
    }
}

#[derive(Debug)]
struct RateLimiterEntry {
    attempts: u32,
    window_start: Instant,
    ban_expires: Option<Instant>,
}

/// Per-key attempt counter with temporary bans
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    entries: Arc<Mutex<HashMap<String, RateLimiterEntry>>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Whether `key` may attempt now; drops entries that no longer matter
    pub async fn is_allowed(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let window = Duration::from_secs(self.config.window_seconds);

        entries.retain(|_, entry| match entry.ban_expires {
            Some(ban_expires) => now < ban_expires,
            None => now.duration_since(entry.window_start) < window,
        });

        !entries.get(key).is_some_and(|entry| entry.ban_expires.is_some())
    }

    /// Count a failed attempt for `key`, banning it once the window is used up
    pub async fn record_failure(&self, key: &str) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        let entry = entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            window_start: now,
            ban_expires: None,
        });

        if now.duration_since(entry.window_start) >= Duration::from_secs(self.config.window_seconds)
        {
            entry.attempts = 0;
            entry.window_start = now;
        }

        entry.attempts += 1;
        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            info!(
                "Banned key {} for {} seconds",
                key, self.config.ban_duration_seconds
            );
        }
    }

    /// Forget every attempt recorded for `key`
    pub async fn reset(&self, key: &str) {
        self.entries.lock().await.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_attempts: u32, window_seconds: u64, ban_duration_seconds: u64) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig {
            max_attempts,
            window_seconds,
            ban_duration_seconds,
        })
    }

    async fn tracked(limiter: &RateLimiter) -> usize {
        limiter.entries.lock().await.len()
    }

    async fn fail(limiter: &RateLimiter, key: &str, times: u32) {
        for _ in 0..times {
            limiter.record_failure(key).await;
        }
    }

    #[tokio::test]
    async fn test_bans_after_max_failures() {
        let limiter = limiter(3, 300, 3600);

        fail(&limiter, "alice", 2).await;
        assert!(limiter.is_allowed("alice").await);

        fail(&limiter, "alice", 1).await;
        assert!(!limiter.is_allowed("alice").await);
    }

    #[tokio::test]
    async fn test_checking_does_not_count() {
        let limiter = limiter(1, 300, 3600);

        for _ in 0..10 {
            assert!(limiter.is_allowed("alice").await);
        }
        assert_eq!(tracked(&limiter).await, 0);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let limiter = limiter(1, 300, 3600);

        fail(&limiter, "alice", 1).await;
        assert!(!limiter.is_allowed("alice").await);
        assert!(limiter.is_allowed("bob").await);
    }

    #[tokio::test]
    async fn test_reset_clears_attempts() {
        let limiter = limiter(2, 300, 3600);

        fail(&limiter, "alice", 1).await;
        limiter.reset("alice").await;
        fail(&limiter, "alice", 1).await;
        assert!(limiter.is_allowed("alice").await);
    }

    #[tokio::test]
    async fn test_ban_expires() {
        let limiter = limiter(1, 300, 0);

        fail(&limiter, "alice", 1).await;
        // A zero-length ban is over by the next check
        assert!(limiter.is_allowed("alice").await);
    }

    #[tokio::test]
    async fn test_window_expires() {
        let limiter = limiter(2, 0, 3600);

        fail(&limiter, "alice", 1).await;
        fail(&limiter, "alice", 1).await;
        assert!(limiter.is_allowed("alice").await);
    }

    #[tokio::test]
    async fn test_expired_entries_are_pruned() {
        let limiter = limiter(5, 0, 0);

        for i in 0..1000 {
            limiter.record_failure(&format!("nobody-{}", i)).await;
        }
        assert_eq!(tracked(&limiter).await, 1000);

        assert!(limiter.is_allowed("nobody-0").await);
        assert_eq!(tracked(&limiter).await, 0);
    }

    #[test]
    fn test_default_config() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.window_seconds, 300);
        assert_eq!(config.ban_duration_seconds, 3600);
    }
}
