//! Per-lock counters that keep the outcomes sharing the boolean return channel apart.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEvent {
    Acquired,
    TimedOut,
    /// Backend failed while acquiring
    AcquireError,
    /// Backend failed while releasing
    ReleaseError,
    /// Critical section returned `false` or an error
    SectionFailure,
    /// Release found a value that was not ours and left it alone
    ForeignRelease,
    /// Basic lock reclaimed an expired entry
    Takeover,
    /// Basic lock swapped in its token but another racer had swapped first
    TakeoverCollision,
}

#[derive(Debug, Default)]
pub struct LockMetrics {
    acquired: AtomicU64,
    timed_out: AtomicU64,
    acquire_errors: AtomicU64,
    release_errors: AtomicU64,
    section_failures: AtomicU64,
    foreign_releases: AtomicU64,
    takeovers: AtomicU64,
    takeover_collisions: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub acquired: u64,
    pub timed_out: u64,
    pub acquire_errors: u64,
    pub release_errors: u64,
    pub section_failures: u64,
    pub foreign_releases: u64,
    pub takeovers: u64,
    pub takeover_collisions: u64,
}

impl LockMetrics {
    pub fn record(&self, event: LockEvent) {
        let counter = match event {
            LockEvent::Acquired => &self.acquired,
            LockEvent::TimedOut => &self.timed_out,
            LockEvent::AcquireError => &self.acquire_errors,
            LockEvent::ReleaseError => &self.release_errors,
            LockEvent::SectionFailure => &self.section_failures,
            LockEvent::ForeignRelease => &self.foreign_releases,
            LockEvent::Takeover => &self.takeovers,
            LockEvent::TakeoverCollision => &self.takeover_collisions,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            acquired: self.acquired.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            acquire_errors: self.acquire_errors.load(Ordering::Relaxed),
            release_errors: self.release_errors.load(Ordering::Relaxed),
            section_failures: self.section_failures.load(Ordering::Relaxed),
            foreign_releases: self.foreign_releases.load(Ordering::Relaxed),
            takeovers: self.takeovers.load(Ordering::Relaxed),
            takeover_collisions: self.takeover_collisions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_land_in_their_own_counter() {
        let metrics = LockMetrics::default();
        metrics.record(LockEvent::Acquired);
        metrics.record(LockEvent::Acquired);
        metrics.record(LockEvent::ReleaseError);
        metrics.record(LockEvent::TakeoverCollision);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.acquired, 2);
        assert_eq!(snapshot.release_errors, 1);
        assert_eq!(snapshot.takeover_collisions, 1);
        assert_eq!(snapshot.acquire_errors, 0);
        assert_eq!(snapshot.timed_out, 0);
    }
}
