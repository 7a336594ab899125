// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-client submission limiter for the quote form.
//!
//! Each client key gets a window that opens on its first submission. Up to
//! `max_submissions` are admitted inside the window; once the window has
//! elapsed the next submission opens a fresh one.
//!
//! Memory is bounded two ways: a periodic [`RateLimiter::cleanup`] sweep of
//! expired windows, and a hard cap on tracked keys that evicts the oldest
//! window when a new key arrives at capacity. Windows are queued in the order
//! they opened, so eviction pops the queue front instead of scanning the
//! table. A flood of fresh keys larger than the cap can push out a live
//! window and reset it; each such eviction is logged.

use crate::config::RateLimitConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.offset_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Submission is admitted
    Allowed {
        /// Remaining submissions in current window
        remaining: u32,
        /// Time until window resets
        reset_in: Duration,
    },
    /// Submission is rejected
    Limited {
        /// Time until the current window expires
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Submission counter for one client key.
#[derive(Debug, Clone, Copy)]
struct WindowRecord {
    count: u32,
    window_start: Instant,
}

/// Windows by key, plus the order in which they opened.
///
/// `order` may hold stale entries for keys whose window has since reset or
/// been removed; an entry is live only while its start matches the record.
#[derive(Debug, Default)]
struct WindowTable {
    records: HashMap<String, WindowRecord>,
    order: VecDeque<(String, Instant)>,
}

impl WindowTable {
    fn open(&mut self, key: &str, now: Instant) {
        self.records.insert(
            key.to_string(),
            WindowRecord {
                count: 1,
                window_start: now,
            },
        );
        self.order.push_back((key.to_string(), now));
    }

    fn is_live(&self, key: &str, start: Instant) -> bool {
        self.records
            .get(key)
            .is_some_and(|r| r.window_start == start)
    }

    /// Drop windows from the front of the queue until one slot is free.
    fn evict_oldest(&mut self, capacity: usize, now: Instant, window: Duration) {
        while self.records.len() >= capacity {
            let Some((key, start)) = self.order.pop_front() else {
                break;
            };
            if !self.is_live(&key, start) {
                continue;
            }
            if now.saturating_duration_since(start) <= window {
                warn!(client = %key, "Rate limiter at capacity, evicting oldest window");
            }
            self.records.remove(&key);
        }
    }

    fn sweep(&mut self, now: Instant, window: Duration) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, r| now.saturating_duration_since(r.window_start) <= window);
        let records = &self.records;
        self.order.retain(|(key, start)| {
            records.get(key).is_some_and(|r| r.window_start == *start)
        });
        before - self.records.len()
    }
}

/// Thread-safe fixed-window rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    table: RwLock<WindowTable>,
}

impl RateLimiter {
    /// Create a new rate limiter on the wall clock.
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            table: RwLock::new(WindowTable::default()),
        }
    }

    /// Admit or reject one submission from `key`.
    pub async fn admit(&self, key: &str) -> bool {
        self.check(key).await.is_allowed()
    }

    /// Check and count one submission from `key`.
    ///
    /// The whole read-compare-increment runs under the write lock, so
    /// concurrent submissions from one key cannot both take the last slot.
    pub async fn check(&self, key: &str) -> RateLimitResult {
        let now = self.clock.now();
        let window = self.config.window_duration();
        let ceiling = self.config.max_submissions.max(1);

        let mut guard = self.table.write().await;
        let table = &mut *guard;

        if let Some(record) = table.records.get_mut(key) {
            let elapsed = now.saturating_duration_since(record.window_start);

            if elapsed > window {
                record.count = 1;
                record.window_start = now;
                table.order.push_back((key.to_string(), now));
                return RateLimitResult::Allowed {
                    remaining: ceiling - 1,
                    reset_in: window,
                };
            }

            if record.count < ceiling {
                record.count += 1;
                return RateLimitResult::Allowed {
                    remaining: ceiling - record.count,
                    reset_in: window.saturating_sub(elapsed),
                };
            }

            let retry_after = window.saturating_sub(elapsed);
            debug!(client = %key, ?retry_after, "Submission limit exceeded");
            return RateLimitResult::Limited { retry_after };
        }

        let capacity = self.config.max_tracked_keys.max(1);
        if table.records.len() >= capacity {
            table.evict_oldest(capacity, now, window);
        }
        table.open(key, now);

        RateLimitResult::Allowed {
            remaining: ceiling - 1,
            reset_in: window,
        }
    }

    /// Remove records whose window has expired. Returns the number removed.
    pub async fn cleanup(&self) -> usize {
        let now = self.clock.now();
        let window = self.config.window_duration();

        let mut table = self.table.write().await;
        let removed = table.sweep(now, window);

        if removed > 0 {
            debug!(removed, remaining = table.records.len(), "Swept expired rate limit windows");
        }
        removed
    }

    /// Number of client keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.table.read().await.records.len()
    }
}
