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

use log::{debug, error, info, warn};

use super::metrics::{LockEvent, LockMetrics};

/// Variant specific release of a held key.
pub(crate) trait Unlock {
    /// Removes `full_key` if it still holds `token`; `Ok(false)` when it did not.
    fn unlock(&self, full_key: &str, token: &str) -> cache::Result<bool>;

    /// Current value stored under `full_key`
    fn holder(&self, full_key: &str) -> cache::Result<Option<String>>;

    fn metrics(&self) -> &LockMetrics;
}

/// Accounts for a release that removed nothing.
///
/// Only a key now held under another token counts as a foreign release; a key that is
/// already gone was released before or lapsed with its lease.
pub(crate) fn note_missed_release(lock: &dyn Unlock, full_key: &str, token: &str) {
    match lock.holder(full_key) {
        Ok(Some(_)) => {
            warn!("Lock {} is no longer held by token {}, nothing released", full_key, token);
            lock.metrics().record(LockEvent::ForeignRelease);
        }
        Ok(None) => debug!("Lock {} already released or expired", full_key),
        Err(e) => debug!("Could not inspect lock {} after a missed release: {}", full_key, e),
    }
}

/// A held lock. Dropping the guard releases it, including while unwinding from a panic.
///
/// Release failures are logged and swallowed; the lease is what eventually frees the key.
pub struct LockGuard<'a> {
    lock: &'a dyn Unlock,
    key: String,
    token: String,
    released: bool,
}

impl<'a> LockGuard<'a> {
    pub(crate) fn new(lock: &'a dyn Unlock, key: String, token: String) -> Self {
        Self { lock, key, token, released: false }
    }

    /// Full backend key, prefix included
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether this guard was handed out by `lock`
    pub(crate) fn is_from(&self, lock: &dyn Unlock) -> bool {
        std::ptr::eq(self.lock as *const dyn Unlock as *const u8, lock as *const dyn Unlock as *const u8)
    }

    /// Releases now instead of on drop.
    ///
    /// # Returns
    ///
    /// `true` if this holder's entry was removed.
    pub fn release(mut self) -> bool {
        self.release_once()
    }

    fn release_once(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        match self.lock.unlock(&self.key, &self.token) {
            Ok(true) => {
                debug!("Released lock {}", self.key);
                true
            }
            Ok(false) => {
                note_missed_release(self.lock, &self.key, &self.token);
                false
            }
            Err(e) => {
                error!("Failed to release lock {}: {}", self.key, e);
                self.lock.metrics().record(LockEvent::ReleaseError);
                false
            }
        }
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if !self.released && std::thread::panicking() {
            info!("Releasing lock {} while unwinding", self.key);
        }
        self.release_once();
    }
}

impl fmt::Debug for LockGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key)
            .field("token", &self.token)
            .field("released", &self.released)
            .finish()
    }
}

/// Runs the critical section while `guard` is held and releases afterwards.
///
/// The section's result is returned unchanged, after the release has been attempted.
pub(crate) fn run_section<F, E>(guard: LockGuard<'_>, metrics: &LockMetrics, section: F) -> std::result::Result<bool, E>
where
    F: FnOnce() -> std::result::Result<bool, E>,
{
    let result = section();
    match &result {
        Ok(true) => {}
        Ok(false) => {
            info!("Critical section under lock {} reported failure", guard.key());
            metrics.record(LockEvent::SectionFailure);
        }
        Err(_) => {
            warn!("Critical section under lock {} returned an error", guard.key());
            metrics.record(LockEvent::SectionFailure);
        }
    }
    drop(guard);
    result
}
