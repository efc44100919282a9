// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Per-visitor token-bucket rate limiting.
//!
//! One bucket per remote address. The configured limit is requests per
//! minute; the burst is the bucket capacity. Visitors idle past the expiry
//! window are swept out on a background minute tick so the table does not
//! grow without bound.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Limiter settings, from configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Allowed sustained requests per minute per address. Zero disables the
    /// limiter.
    pub limit: f64,
    /// Bucket capacity.
    pub burst: u32,
    /// How long an idle visitor's bucket is kept.
    pub expiry: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> RateLimitConfig {
        RateLimitConfig {
            limit: 1.0,
            burst: 4,
            expiry: Duration::from_secs(180),
        }
    }
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    capacity: f64,
    rate_per_sec: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, rate_per_sec: f64) -> TokenBucket {
        TokenBucket {
            tokens: capacity,
            capacity,
            rate_per_sec,
            last_update: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate_per_sec).min(self.capacity);
        self.last_update = now;
    }

    fn try_consume(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug)]
struct Visitor {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// The visitor table.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    visitors: Mutex<HashMap<IpAddr, Visitor>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> RateLimiter {
        RateLimiter {
            config,
            visitors: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a request from `ip` is admitted right now.
    pub fn check(&self, ip: IpAddr) -> bool {
        if self.config.limit <= 0.0 {
            return true;
        }
        let mut visitors = self.visitors.lock().expect("poisoned");
        let visitor = visitors.entry(ip).or_insert_with(|| Visitor {
            bucket: TokenBucket::new(
                f64::from(self.config.burst.max(1)),
                self.config.limit / 60.0,
            ),
            last_seen: Instant::now(),
        });
        visitor.last_seen = Instant::now();
        visitor.bucket.try_consume()
    }

    /// Drops visitors idle past the expiry window.
    pub fn sweep(&self) {
        let mut visitors = self.visitors.lock().expect("poisoned");
        let expiry = self.config.expiry;
        visitors.retain(|_, visitor| visitor.last_seen.elapsed() <= expiry);
    }

    #[cfg(test)]
    fn visitor_count(&self) -> usize {
        self.visitors.lock().expect("poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn burst_bounds_a_second_of_traffic() {
        let limiter = RateLimiter::new(RateLimitConfig {
            limit: 1.0,
            burst: 4,
            expiry: Duration::from_secs(180),
        });
        let allowed = (0..200).filter(|_| limiter.check(ip("203.0.113.1"))).count();
        assert_eq!(allowed, 4);
    }

    #[test]
    fn visitors_are_independent() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        for _ in 0..4 {
            assert!(limiter.check(ip("203.0.113.1")));
        }
        assert!(!limiter.check(ip("203.0.113.1")));
        assert!(limiter.check(ip("203.0.113.2")));
    }

    #[test]
    fn zero_limit_disables() {
        let limiter = RateLimiter::new(RateLimitConfig {
            limit: 0.0,
            burst: 0,
            expiry: Duration::from_secs(180),
        });
        assert!((0..1000).all(|_| limiter.check(ip("203.0.113.1"))));
        assert_eq!(limiter.visitor_count(), 0);
    }

    #[test]
    fn bucket_refills_over_time() {
        let mut bucket = TokenBucket::new(1.0, 10.0);
        assert!(bucket.try_consume());
        assert!(!bucket.try_consume());
        // Backdate the last refill instead of sleeping.
        bucket.last_update -= Duration::from_secs(1);
        assert!(bucket.try_consume());
    }

    #[test]
    fn sweep_drops_idle_visitors() {
        let limiter = RateLimiter::new(RateLimitConfig::default());
        limiter.check(ip("203.0.113.1"));
        limiter.check(ip("203.0.113.2"));
        assert_eq!(limiter.visitor_count(), 2);

        limiter
            .visitors
            .lock()
            .unwrap()
            .get_mut(&ip("203.0.113.1"))
            .unwrap()
            .last_seen -= Duration::from_secs(600);
        limiter.sweep();
        assert_eq!(limiter.visitor_count(), 1);
    }
}
