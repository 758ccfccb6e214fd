//! Sliding-window rate limiter for the repository crawl.
//!
//! The window admits at most `max_requests` per `interval`. `reserve` is
//! pure in the supplied `Instant` so throttling behavior is testable without
//! wall-clock sleeps; `acquire` is the blocking entry point used by the
//! crawl loop.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    max_requests: usize,
    interval: Duration,
    // Admission times of requests inside the current window, oldest first
    stamps: VecDeque<Instant>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `interval`.
    pub fn new(max_requests: usize, interval: Duration) -> Self {
        assert!(max_requests > 0, "rate limiter needs at least one slot");
        Self {
            max_requests,
            interval,
            stamps: VecDeque::with_capacity(max_requests),
        }
    }

    /// Reserve a slot as of `now`, returning how long the caller must wait
    /// before issuing the request. `Duration::ZERO` means go immediately.
    pub fn reserve(&mut self, now: Instant) -> Duration {
        while let Some(&oldest) = self.stamps.front() {
            if now.duration_since(oldest) >= self.interval {
                self.stamps.pop_front();
            } else {
                break;
            }
        }

        if self.stamps.len() < self.max_requests {
            self.stamps.push_back(now);
            return Duration::ZERO;
        }

        // Window full: the slot opens when the oldest admission expires
        let oldest = *self.stamps.front().expect("window full implies non-empty");
        let ready_at = oldest + self.interval;
        self.stamps.pop_front();
        self.stamps.push_back(ready_at);
        ready_at.duration_since(now)
    }

    /// Block until a request may be issued.
    pub fn acquire(&mut self) {
        let wait = self.reserve(Instant::now());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}
