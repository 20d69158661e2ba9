//! Millisecond time source shared by trackers and the orchestrator.
//!
//! Every timestamp in the core is a `u64` of milliseconds. Production code
//! uses wall-clock time; tests drive a [`ManualClock`] so rate limits, TTLs
//! and retention windows can be exercised without sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time in milliseconds since the Unix epoch.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    current_ms: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::at_ms(0)
    }

    pub fn at_ms(start_ms: u64) -> Self {
        Self {
            current_ms: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Move forward by `ms`. Returns the new time.
    pub fn advance_ms(&self, ms: u64) -> u64 {
        self.current_ms.fetch_add(ms, Ordering::SeqCst).saturating_add(ms)
    }

    /// Jump to an absolute time. Time never moves backwards; earlier targets are ignored.
    pub fn set_ms(&self, target_ms: u64) -> u64 {
        self.current_ms.fetch_max(target_ms, Ordering::SeqCst).max(target_ms)
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.load(Ordering::SeqCst)
    }
}

/// Render a millisecond timestamp for payloads and logs.
pub fn to_datetime(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .unwrap_or(DateTime::UNIX_EPOCH)
}
