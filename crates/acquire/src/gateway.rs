//! Rate-limited access to the platform API client.
//!
//! Every outbound API call goes through [`Gateway::acquire_access`], which
//! waits for a token bucket permit (one per interval, burst 1) and then for a
//! randomized cooldown. The upstream service penalizes both bursts and a
//! perfectly regular cadence, so both stages are needed.

use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use rand::RngExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::TransferError;

/// Configuration for the API throttle.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// One permit is granted per interval.
    pub interval: Duration,
    /// Extra delay applied after each permit, drawn uniformly from this range.
    pub jitter: RangeInclusive<Duration>,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            jitter: Duration::from_secs(1)..=Duration::from_secs(3),
        }
    }
}

impl ThrottleConfig {
    /// No waiting at all. Useful for tests and offline tooling.
    pub fn disabled() -> Self {
        Self {
            interval: Duration::ZERO,
            jitter: Duration::ZERO..=Duration::ZERO,
        }
    }

    fn jitter_delay(&self) -> Duration {
        let (low, high) = (*self.jitter.start(), *self.jitter.end());
        if high <= low {
            return low;
        }
        let low_ms = u64::try_from(low.as_millis()).unwrap_or(u64::MAX);
        let high_ms = u64::try_from(high.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(rand::rng().random_range(low_ms..=high_ms))
    }
}

/// Token bucket rate limiter with a burst capacity of one.
#[derive(Debug)]
pub struct RateLimiter {
    /// Current number of tokens.
    tokens: f64,
    /// Tokens added per second. Zero or infinite means unlimited.
    refill_rate: f64,
    /// Last refill time.
    last_refill: Instant,
}

impl RateLimiter {
    const MAX_TOKENS: f64 = 1.0;

    pub fn new(interval: Duration) -> Self {
        let refill_rate = if interval.is_zero() {
            f64::INFINITY
        } else {
            1.0 / interval.as_secs_f64()
        };
        Self {
            tokens: Self::MAX_TOKENS,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    /// Try to acquire a token.
    ///
    /// Returns `true` if a token was acquired, `false` if rate limited.
    pub fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Get the time until the next token is available.
    pub fn time_until_available(&mut self) -> Duration {
        self.refill();

        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            let tokens_needed = 1.0 - self.tokens;
            Duration::from_secs_f64(tokens_needed / self.refill_rate)
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        if self.refill_rate.is_infinite() {
            self.tokens = Self::MAX_TOKENS;
        } else {
            let elapsed = now.duration_since(self.last_refill);
            let new_tokens = elapsed.as_secs_f64() * self.refill_rate;
            self.tokens = (self.tokens + new_tokens).min(Self::MAX_TOKENS);
        }
        self.last_refill = now;
    }
}

/// Owner of the platform client and the only path to it.
#[derive(Debug)]
pub struct Gateway<C> {
    client: C,
    limiter: Mutex<RateLimiter>,
    config: ThrottleConfig,
}

impl<C> Gateway<C> {
    pub fn new(client: C, config: ThrottleConfig) -> Self {
        Self {
            client,
            limiter: Mutex::new(RateLimiter::new(config.interval)),
            config,
        }
    }

    /// Wait for a permit plus the jitter delay, then hand out the client.
    ///
    /// # Cancel Safety
    ///
    /// The limiter lock is never held across a sleep. If `token` fires first
    /// the call returns [`TransferError::Cancelled`] and no request is made.
    pub async fn acquire_access(&self, token: &CancellationToken) -> Result<&C, TransferError> {
        loop {
            if token.is_cancelled() {
                return Err(TransferError::Cancelled);
            }

            let wait = {
                let mut limiter = self.limiter.lock().await;
                if limiter.try_acquire() {
                    break;
                }
                limiter.time_until_available()
            };

            trace!(wait = ?wait, "rate limited");
            tokio::select! {
                _ = token.cancelled() => return Err(TransferError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }

        let cooldown = self.config.jitter_delay();
        if !cooldown.is_zero() {
            tokio::select! {
                _ = token.cancelled() => return Err(TransferError::Cancelled),
                _ = tokio::time::sleep(cooldown) => {}
            }
        }

        Ok(&self.client)
    }
}
