/*
 * Copyright (c) Huawei Technologies Co., Ltd. 2025. All rights reserved.
 * Global Trust Authority is licensed under the Mulan PSL v2.
 * You can use this software according to the terms and conditions of the Mulan PSL v2.
 * You may obtain a copy of Mulan PSL v2 at:
 *     http://license.coscl.org.cn/MulanPSL2
 * THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY KIND, EITHER EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR
 * PURPOSE.
 * See the Mulan PSL v2 for more details.
 */

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cache::CacheBackend;
use log::{debug, error, info, warn};

use super::clock::{Clock, SystemClock};
use super::config::{check_request, LockConfig};
use super::error::{DistributedLockError, Result};
use super::guard::{note_missed_release, run_section, LockGuard, Unlock};
use super::metrics::{LockEvent, LockMetrics, MetricsSnapshot};
use super::retry::{acquire_with_retry, Acquisition};
use super::token::robust_token;

/// Lock built on the backend's atomic primitives.
///
/// Acquisition is a single `SET key token NX PX lease`, so the entry and its lease come
/// into existence together. Release is a server side compare-and-delete on the token,
/// which can not remove an entry that expired and was re-acquired by someone else.
///
/// Exclusivity holds as long as the critical section finishes within the lease.
pub struct RobustLock {
    backend: Arc<dyn CacheBackend>,
    config: LockConfig,
    clock: Arc<dyn Clock>,
    metrics: LockMetrics,
}

impl RobustLock {
    /// Create a lock with the default robust settings
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self::with_config(backend, LockConfig::robust())
    }

    pub fn with_config(backend: Arc<dyn CacheBackend>, config: LockConfig) -> Self {
        Self { backend, config, clock: Arc::new(SystemClock), metrics: LockMetrics::default() }
    }

    /// Clock used for the expiry embedded in tokens
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// A fresh ownership token for the configured lease
    pub fn new_token(&self) -> String {
        robust_token(self.clock.now_millis(), self.config.lease)
    }

    /// Run `section` while holding `key`, with the configured lease and timeout.
    ///
    /// # Returns
    ///
    /// * `Ok(result)` - the section's own result, after the lock was released
    /// * `Ok(false)` - the lock could not be acquired; the section did not run
    /// * `Err(e)` - the section's error, after the lock was released
    pub fn lock<F, E>(&self, key: &str, section: F) -> std::result::Result<bool, E>
    where
        F: FnOnce() -> std::result::Result<bool, E>,
    {
        self.lock_with(key, self.config.lease, self.config.timeout, section)
    }

    /// Same as [`lock`](Self::lock) with an explicit lease and acquisition timeout.
    pub fn lock_with<F, E>(&self, key: &str, lease: Duration, timeout: Duration, section: F) -> std::result::Result<bool, E>
    where
        F: FnOnce() -> std::result::Result<bool, E>,
    {
        match self.acquire_with(key, lease, timeout) {
            Ok(guard) => run_section(guard, &self.metrics, section),
            Err(_) => Ok(false),
        }
    }

    /// Acquire `key` with the configured lease and timeout and hold it until the guard drops.
    pub fn acquire(&self, key: &str) -> Result<LockGuard<'_>> {
        self.acquire_with(key, self.config.lease, self.config.timeout)
    }

    /// Acquire `key`, retrying until `timeout`.
    ///
    /// # Errors
    ///
    /// * `DistributedLockError::AcquireTimeout` - another holder kept the key for the whole budget
    /// * `DistributedLockError::CacheError` - the backend failed; no retry is made
    /// * `DistributedLockError::InvalidArgument` - empty key or zero lease
    pub fn acquire_with(&self, key: &str, lease: Duration, timeout: Duration) -> Result<LockGuard<'_>> {
        if let Err(e) = check_request(key, lease) {
            warn!("Rejected lock request for {:?}: {}", key, e);
            return Err(e);
        }
        let full_key = self.config.key(key);
        let token = robust_token(self.clock.now_millis(), lease);
        let policy = self.config.retry_policy(timeout);

        match acquire_with_retry(&policy, || self.backend.set_nx_px(&full_key, &token, lease)) {
            Acquisition::Acquired { attempts, elapsed } => {
                self.metrics.record(LockEvent::Acquired);
                debug!("Acquired lock {} after {} attempts in {:?}", full_key, attempts, elapsed);
                Ok(LockGuard::new(self, full_key, token))
            }
            Acquisition::TimedOut { attempts, elapsed } => {
                self.metrics.record(LockEvent::TimedOut);
                info!("Lock {} not acquired within {:?} ({} attempts)", full_key, elapsed, attempts);
                Err(DistributedLockError::AcquireTimeout)
            }
            Acquisition::Failed(e) => {
                self.metrics.record(LockEvent::AcquireError);
                error!("Failed to acquire lock {}: {}", full_key, e);
                Err(e.into())
            }
        }
    }

    /// One acquisition attempt with a caller managed token, no retry.
    ///
    /// Backend errors count as not acquired.
    pub fn try_acquire(&self, key: &str, token: &str) -> bool {
        if check_request(key, self.config.lease).is_err() {
            return false;
        }
        let full_key = self.config.key(key);
        match self.backend.set_nx_px(&full_key, token, self.config.lease) {
            Ok(acquired) => {
                if acquired {
                    self.metrics.record(LockEvent::Acquired);
                }
                acquired
            }
            Err(e) => {
                self.metrics.record(LockEvent::AcquireError);
                error!("Failed to try lock {}: {}", full_key, e);
                false
            }
        }
    }

    /// Release a lock taken with [`try_acquire`](Self::try_acquire).
    ///
    /// Only removes the entry if it still holds `token`; releasing twice is harmless.
    pub fn release(&self, key: &str, token: &str) -> bool {
        let full_key = self.config.key(key);
        match self.backend.compare_and_delete(&full_key, token) {
            Ok(true) => true,
            Ok(false) => {
                note_missed_release(self, &full_key, token);
                false
            }
            Err(e) => {
                self.metrics.record(LockEvent::ReleaseError);
                error!("Failed to release lock {}: {}", full_key, e);
                false
            }
        }
    }

    /// Push the expiry of a held lock out to `lease` from now, only if `token` still owns it.
    pub fn extend(&self, key: &str, token: &str, lease: Duration) -> bool {
        let full_key = self.config.key(key);
        match self.backend.compare_and_expire(&full_key, token, lease) {
            Ok(extended) => extended,
            Err(e) => {
                error!("Failed to extend lock {}: {}", full_key, e);
                false
            }
        }
    }

    /// Extend the lease of a lock held through a guard from this lock.
    ///
    /// # Errors
    ///
    /// * `DistributedLockError::InvalidArgument` - the guard was acquired through another lock
    /// * `DistributedLockError::InvalidLockOwner` - the entry no longer carries the guard's token
    pub fn extend_guard(&self, guard: &LockGuard<'_>, lease: Duration) -> Result<()> {
        if !guard.is_from(self) {
            warn!("Refused to extend lock {} through a lock that did not issue its guard", guard.key());
            return Err(DistributedLockError::InvalidArgument("guard belongs to another lock".to_string()));
        }
        if self.backend.compare_and_expire(guard.key(), guard.token(), lease)? {
            Ok(())
        } else {
            Err(DistributedLockError::InvalidLockOwner)
        }
    }
}

impl fmt::Debug for RobustLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RobustLock")
            .field("config", &self.config)
            .field("clock", &self.clock)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl Unlock for RobustLock {
    fn unlock(&self, full_key: &str, token: &str) -> cache::Result<bool> {
        self.backend.compare_and_delete(full_key, token)
    }

    fn holder(&self, full_key: &str) -> cache::Result<Option<String>> {
        self.backend.get(full_key)
    }

    fn metrics(&self) -> &LockMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache::MemoryCache;
    use std::convert::Infallible;

    fn robust(cache: &Arc<MemoryCache>) -> RobustLock {
        RobustLock::new(cache.clone())
    }

    #[test]
    fn test_lock_runs_section_and_releases() {
        let cache = Arc::new(MemoryCache::new());
        let lock = robust(&cache);
        let mut seen = None;

        let result = lock.lock("seckill", || {
            seen = cache.get("cache:lock:dist:seckill").unwrap();
            Ok::<_, Infallible>(true)
        });

        assert_eq!(result, Ok(true));
        assert!(seen.is_some());
        assert!(cache.is_empty());
        assert_eq!(lock.metrics().acquired, 1);
    }

    #[test]
    fn test_entry_carries_lease() {
        let cache = Arc::new(MemoryCache::new());
        let lock = robust(&cache);
        let guard = lock.acquire("seckill").unwrap();
        let ttl = cache.ttl(guard.key()).unwrap();
        assert!(ttl <= Duration::from_millis(300) && ttl > Duration::ZERO);
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let cache = Arc::new(MemoryCache::new());
        let lock = robust(&cache);
        assert!(matches!(lock.acquire(""), Err(DistributedLockError::InvalidArgument(_))));
        assert_eq!(lock.lock("", || Ok::<_, Infallible>(true)), Ok(false));
        assert!(!lock.try_acquire("", "token"));
    }

    #[test]
    fn test_extend_requires_owner() {
        let cache = Arc::new(MemoryCache::new());
        let lock = robust(&cache);
        let token = lock.new_token();
        assert!(lock.try_acquire("k", &token));
        assert!(!lock.extend("k", "someone-else", Duration::from_secs(5)));
        assert!(lock.extend("k", &token, Duration::from_secs(5)));
        assert!(cache.ttl("cache:lock:dist:k").unwrap() > Duration::from_secs(1));
    }

    #[test]
    fn test_extend_guard_after_loss_reports_owner_error() {
        let cache = Arc::new(MemoryCache::new());
        let lock = robust(&cache);
        let guard = lock.acquire("k").unwrap();
        assert!(lock.extend_guard(&guard, Duration::from_secs(1)).is_ok());
        cache.set(guard.key(), "intruder", None).unwrap();
        assert!(matches!(
            lock.extend_guard(&guard, Duration::from_secs(1)),
            Err(DistributedLockError::InvalidLockOwner)
        ));
        drop(guard);
        assert_eq!(cache.get("cache:lock:dist:k").unwrap().as_deref(), Some("intruder"));
        assert_eq!(lock.metrics().foreign_releases, 1);
    }

    #[test]
    fn test_repeated_release_is_not_foreign() {
        let cache = Arc::new(MemoryCache::new());
        let lock = robust(&cache);
        let token = lock.new_token();
        assert!(lock.try_acquire("k", &token));
        assert!(lock.release("k", &token));
        assert!(!lock.release("k", &token));
        assert!(!lock.release("never-taken", &token));
        assert_eq!(lock.metrics().foreign_releases, 0);

        assert!(lock.try_acquire("k", &token));
        assert!(!lock.release("k", "someone-else"));
        assert_eq!(lock.metrics().foreign_releases, 1);
        assert!(cache.get("cache:lock:dist:k").unwrap().is_some());
    }

    #[test]
    fn test_guard_outliving_lease_is_not_foreign() {
        let cache = Arc::new(MemoryCache::new());
        let lock = robust(&cache);
        let guard = lock.acquire("k").unwrap();
        cache.del(guard.key()).unwrap();
        assert!(!guard.release());
        assert_eq!(lock.metrics().foreign_releases, 0);
    }

    #[test]
    fn test_extend_guard_rejects_guard_of_other_lock() {
        let cache = Arc::new(MemoryCache::new());
        let lock = robust(&cache);
        let other = robust(&cache);
        let guard = other.acquire("k").unwrap();
        cache.set(guard.key(), guard.token(), None).unwrap();

        assert!(matches!(
            lock.extend_guard(&guard, Duration::from_secs(5)),
            Err(DistributedLockError::InvalidArgument(_))
        ));
        assert_eq!(cache.ttl(guard.key()), None);
        assert!(other.extend_guard(&guard, Duration::from_secs(5)).is_ok());
    }
}
