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

use std::time::Duration;

use cache::RedisClient;
use config_manager::types::context::{DistLockConfig, LockSettings};
use config_manager::types::CONFIG;

use super::error::{DistributedLockError, Result};
use super::retry::{Backoff, RetryPolicy};

/// Runtime settings of one lock variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockConfig {
    /// Namespace prepended to every lock key
    pub key_prefix: String,
    /// Lock expiration time
    pub lease: Duration,
    /// Lock acquisition timeout
    pub timeout: Duration,
    /// Pause between acquisition attempts
    pub backoff: Backoff,
}

impl LockConfig {
    /// Lease 300ms, timeout 100ms, prefix `cache:lock:dist:`
    pub fn robust() -> Self {
        Self::from(&LockSettings::robust_defaults())
    }

    /// Lease 300ms, timeout 200ms, prefix `cache:lock:basic:`
    pub fn basic() -> Self {
        Self::from(&LockSettings::basic_defaults())
    }

    /// Loads both variants from the global [`CONFIG`], which must have been initialized.
    pub fn from_global() -> Result<(LockConfig, LockConfig)> {
        let config: &DistLockConfig = CONFIG.get_instance().map_err(DistributedLockError::InvalidConfig)?;
        Ok((LockConfig::from(&config.robust_lock), LockConfig::from(&config.basic_lock)))
    }

    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Full backend key for a caller supplied lock name
    pub fn key(&self, lock_key: &str) -> String {
        format!("{}{}", self.key_prefix, lock_key)
    }

    pub(crate) fn retry_policy(&self, timeout: Duration) -> RetryPolicy {
        RetryPolicy { timeout, backoff: self.backoff }
    }
}

impl From<&LockSettings> for LockConfig {
    fn from(settings: &LockSettings) -> Self {
        let backoff = if settings.backoff_initial_millis == 0 {
            Backoff::none()
        } else {
            Backoff::exponential(
                Duration::from_millis(settings.backoff_initial_millis),
                Duration::from_millis(settings.backoff_max_millis),
            )
        };
        Self {
            key_prefix: settings.key_prefix.clone(),
            lease: Duration::from_millis(settings.lease_millis),
            timeout: Duration::from_millis(settings.timeout_millis),
            backoff,
        }
    }
}

/// Shared Redis client. REDIS_URL wins over `cache.redis_url` of the global [`CONFIG`],
/// which is only consulted when it has been initialized.
pub fn redis_backend() -> Result<RedisClient> {
    let configured = CONFIG.get_instance().ok().and_then(|config| config.cache.redis_url.as_deref());
    Ok(RedisClient::get_instance_or(configured)?)
}

/// Rejects arguments no acquisition could succeed with
pub(crate) fn check_request(key: &str, lease: Duration) -> Result<()> {
    if key.is_empty() {
        return Err(DistributedLockError::InvalidArgument("lock key must not be empty".to_string()));
    }
    if lease.is_zero() {
        return Err(DistributedLockError::InvalidArgument("lease must be greater than zero".to_string()));
    }
    Ok(())
}
